use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{API_VERSION, USER_AGENT};

/// A GitHub organization team as returned by the REST API.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RemoteTeam {
    pub id: u64,
    #[serde(default)]
    pub node_id: Option<String>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privacy: Option<String>,
}

/// Body for team create and edit requests.
///
/// Absent optional fields are omitted from the JSON body. On edit, GitHub
/// leaves omitted fields unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewTeam {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
}

/// Classified failure of a GitHub API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("GitHub resource not found")]
    NotFound,

    #[error("GitHub auth error: token expired or invalid")]
    Unauthorized,

    #[error("GitHub rate limit exceeded (X-RateLimit-Remaining: {remaining})")]
    RateLimited { remaining: u64 },

    #[error("GitHub API error: {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("GitHub request failed")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to parse GitHub response")]
    Decode(#[source] reqwest::Error),
}

/// The slice of the GitHub Teams API a team adapter needs.
///
/// Teams are addressed by organization and slug.
#[async_trait]
pub trait TeamsApi: Send + Sync {
    async fn get_team_by_slug(&self, org: &str, slug: &str) -> Result<RemoteTeam, ApiError>;

    async fn create_team(&self, org: &str, team: &NewTeam) -> Result<RemoteTeam, ApiError>;

    async fn edit_team_by_slug(
        &self,
        org: &str,
        slug: &str,
        team: &NewTeam,
    ) -> Result<RemoteTeam, ApiError>;

    async fn delete_team_by_slug(&self, org: &str, slug: &str) -> Result<(), ApiError>;
}

/// HTTP client for the GitHub REST API.
///
/// Authenticates with a Bearer token when one is configured and sets the
/// User-Agent and API version headers GitHub requires.
pub struct GitHubClient {
    access_token: Option<String>,
    http_client: Client,
    base_url: String,
}

impl GitHubClient {
    /// Create a client against `base_url` (GitHub.com, GHES, or a mock server).
    pub fn new(access_token: Option<String>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            access_token,
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Path segments are percent-encoded so `?`, `#` or `/` in a name
    /// cannot address a different resource.
    fn teams_url(&self, org: &str) -> String {
        format!("{}/orgs/{}/teams", self.base_url, urlencoding::encode(org))
    }

    fn team_url(&self, org: &str, slug: &str) -> String {
        format!("{}/{}", self.teams_url(org), urlencoding::encode(slug))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http_client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_for_team(&self, request: reqwest::RequestBuilder) -> Result<RemoteTeam, ApiError> {
        let response = request.send().await.map_err(ApiError::Transport)?;
        let response = check_response_status(response).await?;
        response.json::<RemoteTeam>().await.map_err(ApiError::Decode)
    }
}

#[async_trait]
impl TeamsApi for GitHubClient {
    async fn get_team_by_slug(&self, org: &str, slug: &str) -> Result<RemoteTeam, ApiError> {
        let url = self.team_url(org, slug);
        self.send_for_team(self.request(reqwest::Method::GET, &url))
            .await
    }

    async fn create_team(&self, org: &str, team: &NewTeam) -> Result<RemoteTeam, ApiError> {
        let url = self.teams_url(org);
        self.send_for_team(self.request(reqwest::Method::POST, &url).json(team))
            .await
    }

    async fn edit_team_by_slug(
        &self,
        org: &str,
        slug: &str,
        team: &NewTeam,
    ) -> Result<RemoteTeam, ApiError> {
        let url = self.team_url(org, slug);
        self.send_for_team(self.request(reqwest::Method::PATCH, &url).json(team))
            .await
    }

    async fn delete_team_by_slug(&self, org: &str, slug: &str) -> Result<(), ApiError> {
        let url = self.team_url(org, slug);
        let response = self
            .request(reqwest::Method::DELETE, &url)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        check_response_status(response).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Check the response status and map known error codes to typed errors.
///
/// - 404 → not found
/// - 401 → auth error (token expired or invalid)
/// - 403 with `X-RateLimit-Remaining: 0` → rate limit, otherwise a plain status error
/// - Other non-2xx → status error carrying GitHub's `message`
async fn check_response_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
        StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            let remaining = response
                .headers()
                .get("X-RateLimit-Remaining")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            if remaining == Some(0) || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ApiError::RateLimited {
                    remaining: remaining.unwrap_or(0),
                });
            }
        }
        _ => {}
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);
    Err(ApiError::Status { status, message })
}

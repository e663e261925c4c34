//! In-memory Teams API used by unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use team_provider::resource::{ObjectMeta, Team, TeamParameters};

use crate::connectors::github::api::{ApiError, NewTeam, RemoteTeam, TeamsApi};
use crate::connectors::github::config::ClientResolver;

/// A call received by [`FakeTeams`].
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Get { org: String, slug: String },
    Create { org: String, team: NewTeam },
    Edit { org: String, slug: String, team: NewTeam },
    Delete { org: String, slug: String },
}

/// Failure to inject into the next call.
#[derive(Clone, Copy, Debug)]
pub enum Failure {
    NotFound,
    Unauthorized,
    RateLimited,
    /// Never completes (until the caller gives up).
    Hang,
}

/// Teams API backed by a map of `(org, slug)` → team.
#[derive(Default)]
pub struct FakeTeams {
    teams: Mutex<HashMap<(String, String), RemoteTeam>>,
    calls: Mutex<Vec<Call>>,
    failure: Mutex<Option<Failure>>,
    next_id: Mutex<u64>,
}

impl FakeTeams {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, org: &str, slug: &str, description: Option<&str>, privacy: Option<&str>) {
        let id = self.allocate_id();
        self.teams.lock().unwrap().insert(
            (org.to_string(), slug.to_string()),
            RemoteTeam {
                id,
                node_id: Some(format!("T_{}", id)),
                name: slug.to_string(),
                slug: slug.to_string(),
                description: description.map(str::to_string),
                privacy: privacy.map(str::to_string),
            },
        );
    }

    pub fn get(&self, org: &str, slug: &str) -> Option<RemoteTeam> {
        self.teams
            .lock()
            .unwrap()
            .get(&(org.to_string(), slug.to_string()))
            .cloned()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Makes every following call fail until cleared.
    pub fn fail_with(&self, failure: Option<Failure>) {
        *self.failure.lock().unwrap() = failure;
    }

    fn allocate_id(&self) -> u64 {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        *next
    }

    async fn record(&self, call: Call) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        let failure = *self.failure.lock().unwrap();
        match failure {
            None => Ok(()),
            Some(Failure::NotFound) => Err(ApiError::NotFound),
            Some(Failure::Unauthorized) => Err(ApiError::Unauthorized),
            Some(Failure::RateLimited) => Err(ApiError::RateLimited { remaining: 0 }),
            Some(Failure::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    fn apply(&self, org: &str, slug: &str, team: &NewTeam) -> RemoteTeam {
        let previous = self.get(org, slug);
        let id = match &previous {
            Some(p) => p.id,
            None => self.allocate_id(),
        };
        let key = (org.to_string(), slug.to_string());
        let mut teams = self.teams.lock().unwrap();
        // Omitted fields keep their current value, as GitHub's PATCH does.
        let remote = RemoteTeam {
            id,
            node_id: Some(format!("T_{}", id)),
            name: team.name.clone(),
            slug: team.name.clone(),
            description: team
                .description
                .clone()
                .or_else(|| previous.as_ref().and_then(|p| p.description.clone())),
            privacy: team
                .privacy
                .clone()
                .or_else(|| previous.as_ref().and_then(|p| p.privacy.clone())),
        };
        teams.insert(key, remote.clone());
        remote
    }
}

#[async_trait]
impl TeamsApi for FakeTeams {
    async fn get_team_by_slug(&self, org: &str, slug: &str) -> Result<RemoteTeam, ApiError> {
        self.record(Call::Get {
            org: org.to_string(),
            slug: slug.to_string(),
        })
        .await?;
        self.get(org, slug).ok_or(ApiError::NotFound)
    }

    async fn create_team(&self, org: &str, team: &NewTeam) -> Result<RemoteTeam, ApiError> {
        self.record(Call::Create {
            org: org.to_string(),
            team: team.clone(),
        })
        .await?;
        if self.get(org, &team.name).is_some() {
            return Err(ApiError::Status {
                status: reqwest::StatusCode::UNPROCESSABLE_ENTITY,
                message: "Name must be unique for this org".to_string(),
            });
        }
        Ok(self.apply(org, &team.name, team))
    }

    async fn edit_team_by_slug(
        &self,
        org: &str,
        slug: &str,
        team: &NewTeam,
    ) -> Result<RemoteTeam, ApiError> {
        self.record(Call::Edit {
            org: org.to_string(),
            slug: slug.to_string(),
            team: team.clone(),
        })
        .await?;
        if self.get(org, slug).is_none() {
            return Err(ApiError::NotFound);
        }
        Ok(self.apply(org, slug, team))
    }

    async fn delete_team_by_slug(&self, org: &str, slug: &str) -> Result<(), ApiError> {
        self.record(Call::Delete {
            org: org.to_string(),
            slug: slug.to_string(),
        })
        .await?;
        self.teams
            .lock()
            .unwrap()
            .remove(&(org.to_string(), slug.to_string()))
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }
}

/// Resolver handing out one shared fake.
pub struct StaticResolver(pub Arc<FakeTeams>);

impl ClientResolver for StaticResolver {
    fn resolve(&self, _meta: &ObjectMeta) -> anyhow::Result<Arc<dyn TeamsApi>> {
        Ok(Arc::clone(&self.0) as Arc<dyn TeamsApi>)
    }
}

/// Resolver that always fails, as with missing credentials.
pub struct FailingResolver;

impl ClientResolver for FailingResolver {
    fn resolve(&self, meta: &ObjectMeta) -> anyhow::Result<Arc<dyn TeamsApi>> {
        anyhow::bail!("GITHUB_TOKEN not set for provider config '{}'", meta.provider_config_ref)
    }
}

/// `{externalName:"platform", org:"acme", description:"Platform team", privacy:"secret"}`
pub fn platform_team() -> Team {
    Team::new(
        "platform",
        TeamParameters {
            org: "acme".to_string(),
            description: Some("Platform team".to_string()),
            privacy: Some("secret".to_string()),
        },
    )
    .with_external_name("platform")
}

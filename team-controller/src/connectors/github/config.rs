use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use team_provider::config::{CredentialsSource, ProviderConfig};
use team_provider::credentials::{CredentialStore, Credentials};
use team_provider::resource::ObjectMeta;

use super::api::{GitHubClient, TeamsApi};

/// Provider name used as the credential store key.
pub const PROVIDER: &str = "github";
pub const USER_AGENT: &str = "team-controller/0.1";
pub const API_VERSION: &str = "2022-11-28";

/// Produces an authenticated Teams API handle for a managed resource.
///
/// This is the only place credentials are looked up. It never talks to GitHub.
pub trait ClientResolver: Send + Sync {
    fn resolve(&self, meta: &ObjectMeta) -> Result<Arc<dyn TeamsApi>>;
}

/// Resolves clients from named provider configs.
pub struct ProviderConfigResolver {
    provider_configs: Vec<ProviderConfig>,
    credential_store: Option<Arc<CredentialStore>>,
}

impl ProviderConfigResolver {
    pub fn new(
        provider_configs: Vec<ProviderConfig>,
        credential_store: Option<Arc<CredentialStore>>,
    ) -> Self {
        Self {
            provider_configs,
            credential_store,
        }
    }

    fn provider_config(&self, name: &str) -> Result<&ProviderConfig> {
        self.provider_configs
            .iter()
            .find(|pc| pc.name == name)
            .ok_or_else(|| anyhow!("Provider config '{}' not found", name))
    }

    fn credentials(&self, pc: &ProviderConfig) -> Result<Option<Credentials>> {
        let credentials = match &pc.credentials {
            CredentialsSource::None => return Ok(None),
            CredentialsSource::Env { env } => std::env::var(env)
                .map(Credentials::token)
                .with_context(|| format!("{} not set for provider config '{}'", env, pc.name))?,
            CredentialsSource::Store => {
                let store = self.credential_store.as_ref().with_context(|| {
                    format!(
                        "Provider config '{}' reads the credential store, but no store is configured",
                        pc.name
                    )
                })?;
                store
                    .get(&pc.name, PROVIDER)?
                    .with_context(|| format!("No credentials stored for provider config '{}'", pc.name))?
            }
        };

        if credentials.is_expired() {
            bail!("Credentials for provider config '{}' have expired", pc.name);
        }
        Ok(Some(credentials))
    }
}

impl ClientResolver for ProviderConfigResolver {
    fn resolve(&self, meta: &ObjectMeta) -> Result<Arc<dyn TeamsApi>> {
        let pc = self.provider_config(&meta.provider_config_ref)?;
        let token = self.credentials(pc)?.map(|c| c.access_token);
        let client = GitHubClient::new(token, pc.base_url.clone())?;
        Ok(Arc::new(client))
    }
}

//! Controller configuration loaded from TOML.
//!
//! ```toml
//! [reconcile]
//! poll_interval_seconds = 60
//!
//! [[provider_configs]]
//! name = "default"
//! credentials = { source = "env", env = "GITHUB_TOKEN" }
//!
//! [[resources]]
//! kind = "Team"
//! metadata = { name = "platform" }
//! spec = { org = "acme", description = "Platform team", privacy = "secret" }
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::resource::ManagedResource;

/// Default GitHub REST API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Complete controller configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub provider_configs: Vec<ProviderConfig>,
    #[serde(default)]
    pub resources: Vec<ManagedResource>,
}

/// Reconcile loop timing
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Delay between passes once a resource is in sync
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// First delay after a failed pass
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_seconds: u64,
    /// Upper bound for the exponential backoff
    #[serde(default = "default_max_backoff")]
    pub max_backoff_seconds: u64,
    /// Deadline applied to each pass
    #[serde(default = "default_call_timeout")]
    pub call_timeout_seconds: u64,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_initial_backoff() -> u64 {
    1
}

fn default_max_backoff() -> u64 {
    300
}

fn default_call_timeout() -> u64 {
    30
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            initial_backoff_seconds: default_initial_backoff(),
            max_backoff_seconds: default_max_backoff(),
            call_timeout_seconds: default_call_timeout(),
        }
    }
}

impl ReconcileConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_seconds)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_seconds)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }

    /// Overrides fields from `TEAM_CONTROLLER_*` env vars when they parse.
    pub fn apply_env(&mut self) {
        let read = |name: &str| {
            let value = std::env::var(name).ok()?;
            match value.parse::<u64>() {
                Ok(v) => {
                    info!(var = name, value = v, "Reconcile setting overridden from environment");
                    Some(v)
                }
                Err(_) => {
                    warn!(var = name, value = %value, "Ignoring non-numeric override");
                    None
                }
            }
        };

        if let Some(v) = read("TEAM_CONTROLLER_POLL_INTERVAL_SECONDS") {
            self.poll_interval_seconds = v;
        }
        if let Some(v) = read("TEAM_CONTROLLER_MAX_BACKOFF_SECONDS") {
            self.max_backoff_seconds = v;
        }
        if let Some(v) = read("TEAM_CONTROLLER_CALL_TIMEOUT_SECONDS") {
            self.call_timeout_seconds = v;
        }
    }
}

/// Where a provider config gets its token from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CredentialsSource {
    /// Read the token from an environment variable.
    Env {
        #[serde(default = "default_token_env")]
        env: String,
    },
    /// Read the token from the encrypted credential store.
    Store,
    /// Unauthenticated requests.
    None,
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for CredentialsSource {
    fn default() -> Self {
        CredentialsSource::Env {
            env: default_token_env(),
        }
    }
}

/// Named connection settings referenced by managed resources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub credentials: CredentialsSource,
}

fn default_base_url() -> String {
    GITHUB_API_URL.to_string()
}

impl ControllerConfig {
    pub fn provider_config(&self, name: &str) -> Option<&ProviderConfig> {
        self.provider_configs.iter().find(|pc| pc.name == name)
    }

    /// Checks cross-references that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for pc in &self.provider_configs {
            if !names.insert(pc.name.as_str()) {
                bail!("Duplicate provider config '{}'", pc.name);
            }
        }

        let mut keys = HashSet::new();
        for resource in &self.resources {
            let key = resource.key();
            if resource.meta().name.is_empty() {
                bail!("{} resource with empty metadata.name", resource.kind());
            }
            let pc = &resource.meta().provider_config_ref;
            if !names.contains(pc.as_str()) {
                bail!("Resource {} references unknown provider config '{}'", key, pc);
            }
            if !keys.insert(key.clone()) {
                bail!("Duplicate resource {}", key);
            }
        }

        Ok(())
    }
}

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ControllerConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ControllerConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

//! Provider credentials and provider-config usage tracking.
//!
//! Credentials for a provider config are either read from the environment or
//! kept in an encrypted SQLite store. Usage rows record which managed
//! resources depend on which provider config.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       CredentialStore                    │
//! │  - keyed by (provider_config, provider)  │
//! │  - transparent seal/open                 │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!       (seal)               (open)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       Cipher (AES-256-GCM)               │
//! │  - fresh nonce per token                 │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SQLite Database                    │
//! │  - credentials                           │
//! │  - provider_config_usages                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use team_provider::credentials::{CredentialStore, Credentials};
//!
//! # fn main() -> anyhow::Result<()> {
//! let encryption_key = std::env::var("TEAM_CONTROLLER_ENCRYPTION_KEY")?;
//! let store = CredentialStore::new("credentials.db", &encryption_key)?;
//!
//! store.store("default", "github", &Credentials::token("ghp_example"))?;
//!
//! if let Some(creds) = store.get("default", "github")? {
//!     println!("token expires: {:?}", creds.expires_at);
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

mod encryption;
mod storage;
mod usage;

pub use encryption::{Cipher, Sealed};
pub use storage::CredentialStore;
pub use usage::{MemoryUsageTracker, ProviderConfigUsage, SqliteUsageTracker, UsageTracker};

/// Credentials for authenticating against a provider API.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token (personal access token or installation token)
    pub access_token: String,

    /// When the token stops being valid (UTC), if known
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Non-expiring token credentials.
    pub fn token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

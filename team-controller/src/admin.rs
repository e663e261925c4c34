//! Credential administration behind the binary's token subcommands.
//!
//! Tokens for `credentials = { source = "store" }` provider configs are written
//! here. Removing a token is refused while a managed resource still uses its
//! provider config.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use std::io::BufRead;
use team_provider::credentials::{CredentialStore, Credentials, UsageTracker};
use tracing::{info, warn};

use crate::connectors::github::config::PROVIDER;

/// Reads a token from the first line of `reader`, trimmed.
pub fn read_token<R: BufRead>(mut reader: R) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read token from stdin")?;
    let token = line.trim();
    if token.is_empty() {
        bail!("No token given on stdin");
    }
    Ok(token.to_string())
}

/// Stores `token` for `provider_config`, replacing any previous one.
pub fn store_token(
    store: &CredentialStore,
    provider_config: &str,
    token: String,
    expires_in_seconds: Option<i64>,
) -> Result<()> {
    let credentials = Credentials {
        access_token: token,
        expires_at: expires_in_seconds.map(|secs| Utc::now() + Duration::seconds(secs)),
    };
    store
        .store(provider_config, PROVIDER, &credentials)
        .with_context(|| format!("Failed to store token for provider config '{}'", provider_config))?;

    info!(
        provider_config = %provider_config,
        expires_at = ?credentials.expires_at,
        "Token stored"
    );
    Ok(())
}

/// Deletes the token for `provider_config`. Returns false if none was stored.
///
/// Fails while resources are recorded as using the provider config, unless `force`.
pub fn delete_token(
    store: &CredentialStore,
    usage: &dyn UsageTracker,
    provider_config: &str,
    force: bool,
) -> Result<bool> {
    let users = usage.users_of(provider_config)?;
    if !users.is_empty() {
        if !force {
            bail!(
                "Provider config '{}' is still used by {}",
                provider_config,
                describe_users(&users)
            );
        }
        warn!(
            provider_config = %provider_config,
            users = users.len(),
            "Deleting token of a provider config still in use"
        );
    }

    let deleted = store.delete(provider_config, PROVIDER)?;
    info!(provider_config = %provider_config, deleted = deleted, "Token delete");
    Ok(deleted)
}

/// `Kind/name` of each user, comma separated.
pub fn describe_users(users: &[(team_provider::ResourceKind, String)]) -> String {
    users
        .iter()
        .map(|(kind, name)| format!("{}/{}", kind, name))
        .collect::<Vec<_>>()
        .join(", ")
}

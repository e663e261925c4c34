//! Provider-config usage tracking.
//!
//! Before a controller talks to the provider on behalf of a resource it records
//! that the resource uses its provider config, so a provider config still in
//! use can be identified before it is removed.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::resource::{ManagedResource, ResourceKind};

/// One resource → provider config reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfigUsage {
    pub resource_kind: ResourceKind,
    pub resource_name: String,
    pub provider_config: String,
}

impl ProviderConfigUsage {
    pub fn for_resource(resource: &ManagedResource) -> Self {
        let meta = resource.meta();
        Self {
            resource_kind: resource.kind(),
            resource_name: meta.name.clone(),
            provider_config: meta.provider_config_ref.clone(),
        }
    }
}

/// Marks provider configs as in use.
pub trait UsageTracker: Send + Sync {
    /// Records (or refreshes) a usage. Idempotent.
    fn track(&self, usage: &ProviderConfigUsage) -> Result<()>;

    /// Resources currently recorded against `provider_config`.
    fn users_of(&self, provider_config: &str) -> Result<Vec<(ResourceKind, String)>>;
}

/// Usage tracker persisted in SQLite.
pub struct SqliteUsageTracker {
    conn: Mutex<Connection>,
}

impl SqliteUsageTracker {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open database")?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS provider_config_usages (
                resource_kind TEXT NOT NULL,
                resource_name TEXT NOT NULL,
                provider_config TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (resource_kind, resource_name)
            )
            "#,
            [],
        )
        .context("Failed to create provider_config_usages table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_kind(kind: &str) -> rusqlite::Result<ResourceKind> {
    match kind {
        "Team" => Ok(ResourceKind::Team),
        "Membership" => Ok(ResourceKind::Membership),
        other => Err(rusqlite::Error::InvalidColumnType(
            0,
            format!("resource_kind={}", other),
            rusqlite::types::Type::Text,
        )),
    }
}

impl UsageTracker for SqliteUsageTracker {
    fn track(&self, usage: &ProviderConfigUsage) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .lock()
            .map_err(|_| anyhow!("Usage tracker connection lock poisoned"))?
            .execute(
                r#"
                INSERT INTO provider_config_usages (
                    resource_kind, resource_name, provider_config, updated_at
                )
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(resource_kind, resource_name) DO UPDATE SET
                    provider_config = excluded.provider_config,
                    updated_at = excluded.updated_at
                "#,
                params![
                    usage.resource_kind.as_str(),
                    usage.resource_name,
                    usage.provider_config,
                    now,
                ],
            )
            .context("Failed to track provider config usage")?;
        debug!(
            resource_kind = %usage.resource_kind,
            resource_name = %usage.resource_name,
            provider_config = %usage.provider_config,
            "Tracked provider config usage"
        );
        Ok(())
    }

    fn users_of(&self, provider_config: &str) -> Result<Vec<(ResourceKind, String)>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("Usage tracker connection lock poisoned"))?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT resource_kind, resource_name
                FROM provider_config_usages
                WHERE provider_config = ?1
                ORDER BY resource_kind, resource_name
                "#,
            )
            .context("Failed to prepare query")?;

        let users = stmt
            .query_map(params![provider_config], |row| {
                let kind: String = row.get(0)?;
                Ok((parse_kind(&kind)?, row.get(1)?))
            })
            .context("Failed to execute query")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read results")?;

        Ok(users)
    }
}

/// In-process usage tracker, used when no database is configured.
#[derive(Default)]
pub struct MemoryUsageTracker {
    usages: Mutex<HashMap<(ResourceKind, String), (String, DateTime<Utc>)>>,
}

impl MemoryUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsageTracker for MemoryUsageTracker {
    fn track(&self, usage: &ProviderConfigUsage) -> Result<()> {
        self.usages
            .lock()
            .map_err(|_| anyhow!("Usage tracker lock poisoned"))?
            .insert(
                (usage.resource_kind, usage.resource_name.clone()),
                (usage.provider_config.clone(), Utc::now()),
            );
        Ok(())
    }

    fn users_of(&self, provider_config: &str) -> Result<Vec<(ResourceKind, String)>> {
        let usages = self
            .usages
            .lock()
            .map_err(|_| anyhow!("Usage tracker lock poisoned"))?;
        let mut users: Vec<(ResourceKind, String)> = usages
            .iter()
            .filter(|(_, (pc, _))| pc == provider_config)
            .map(|((kind, name), _)| (*kind, name.clone()))
            .collect();
        users.sort_by(|a, b| (a.0.as_str(), &a.1).cmp(&(b.0.as_str(), &b.1)));
        Ok(users)
    }
}

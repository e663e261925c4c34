//! Encrypted credential storage using SQLite.
//!
//! Holds one token per (provider config, provider) pair. Tokens are sealed
//! with AES-256-GCM before they touch disk.

use super::{Cipher, Credentials, Sealed};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Encrypted credential storage backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE credentials (
///     provider_config TEXT NOT NULL,
///     provider TEXT NOT NULL,
///     access_token TEXT NOT NULL,       -- Sealed
///     access_token_nonce TEXT NOT NULL,
///     expires_at TEXT,                  -- RFC 3339 (optional)
///     updated_at TEXT NOT NULL,
///     PRIMARY KEY (provider_config, provider)
/// );
/// ```
pub struct CredentialStore {
    conn: Mutex<Connection>,
    cipher: Cipher,
}

impl CredentialStore {
    /// Creates or opens a credential store.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (`:memory:` for tests)
    /// * `encryption_key` - Base64-encoded 32-byte master key
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: &str) -> Result<Self> {
        let cipher = Cipher::from_base64_key(encryption_key).context("Invalid encryption key")?;
        let conn = Connection::open(db_path).context("Failed to open database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                provider_config TEXT NOT NULL,
                provider TEXT NOT NULL,
                access_token TEXT NOT NULL,
                access_token_nonce TEXT NOT NULL,
                expires_at TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (provider_config, provider)
            )
            "#,
            [],
        )
        .context("Failed to create credentials table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Credential store connection lock poisoned"))
    }

    /// Stores credentials, replacing any existing entry for the pair.
    pub fn store(&self, provider_config: &str, provider: &str, credentials: &Credentials) -> Result<()> {
        let sealed = self
            .cipher
            .seal(&credentials.access_token)
            .context("Failed to encrypt access token")?;
        let expires_at = credentials.expires_at.map(|dt| dt.to_rfc3339());
        let now = Utc::now().to_rfc3339();

        self.conn()?
            .execute(
                r#"
                INSERT INTO credentials (
                    provider_config, provider,
                    access_token, access_token_nonce,
                    expires_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(provider_config, provider) DO UPDATE SET
                    access_token = excluded.access_token,
                    access_token_nonce = excluded.access_token_nonce,
                    expires_at = excluded.expires_at,
                    updated_at = excluded.updated_at
                "#,
                params![
                    provider_config,
                    provider,
                    sealed.ciphertext,
                    sealed.nonce,
                    expires_at,
                    now,
                ],
            )
            .context("Failed to store credentials")?;

        Ok(())
    }

    /// Retrieves and decrypts credentials for the pair.
    ///
    /// # Returns
    /// * `Ok(None)` - Nothing stored for this pair
    pub fn get(&self, provider_config: &str, provider: &str) -> Result<Option<Credentials>> {
        let row = self
            .conn()?
            .query_row(
                r#"
                SELECT access_token, access_token_nonce, expires_at
                FROM credentials
                WHERE provider_config = ?1 AND provider = ?2
                "#,
                params![provider_config, provider],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query credentials")?;

        let Some((ciphertext, nonce, expires_at)) = row else {
            return Ok(None);
        };

        let access_token = self
            .cipher
            .open(&Sealed { ciphertext, nonce })
            .context("Failed to decrypt access token")?;

        let expires_at = expires_at
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
            .transpose()
            .context("Failed to parse expires_at timestamp")?;

        Ok(Some(Credentials {
            access_token,
            expires_at,
        }))
    }

    /// Deletes credentials. Returns false if nothing was stored.
    pub fn delete(&self, provider_config: &str, provider: &str) -> Result<bool> {
        let rows_affected = self
            .conn()?
            .execute(
                "DELETE FROM credentials WHERE provider_config = ?1 AND provider = ?2",
                params![provider_config, provider],
            )
            .context("Failed to delete credentials")?;

        Ok(rows_affected > 0)
    }

    /// Lists all stored (provider_config, provider) pairs.
    pub fn list_all(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT provider_config, provider FROM credentials ORDER BY provider_config, provider")
            .context("Failed to prepare query")?;

        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("Failed to execute query")?
            .collect::<Result<Vec<(String, String)>, _>>()
            .context("Failed to read results")?;

        Ok(pairs)
    }
}

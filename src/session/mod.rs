//! Refresh-token registry.
//!
//! Entries are keyed by the SHA-256 digest of the refresh token, never the
//! token itself, and carry the request metadata the token was issued to.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SessionEntry {
    pub user_id: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Hex SHA-256 of a refresh token.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn put(&self, digest: String, entry: SessionEntry) -> Result<(), SessionError>;

    /// Live entry for `digest`; expired entries read as absent.
    async fn get(&self, digest: &str) -> Result<Option<SessionEntry>, SessionError>;

    async fn expire(&self, digest: &str) -> Result<(), SessionError>;

    /// Drop every expired entry and return how many went.
    async fn purge_expired(&self) -> Result<u64, SessionError>;
}

/// Process-local registry. Entries vanish on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, digest: String, entry: SessionEntry) -> Result<(), SessionError> {
        self.entries.write().await.insert(digest, entry);
        Ok(())
    }

    async fn get(&self, digest: &str) -> Result<Option<SessionEntry>, SessionError> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(digest) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired_at(now) => return Ok(Some(entry.clone())),
                Some(_) => {}
            }
        }

        self.entries.write().await.remove(digest);
        Ok(None)
    }

    async fn expire(&self, digest: &str) -> Result<(), SessionError> {
        self.entries.write().await.remove(digest);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, SessionError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok((before - entries.len()) as u64)
    }
}

/// Registry kept in the `sessions` table so it survives restarts and is
/// shared between instances.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, digest: String, entry: SessionEntry) -> Result<(), SessionError> {
        sqlx::query(
            "INSERT INTO sessions (token_digest, user_id, ip, user_agent, issued_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (token_digest) DO UPDATE
             SET user_id = EXCLUDED.user_id, ip = EXCLUDED.ip, user_agent = EXCLUDED.user_agent,
                 issued_at = EXCLUDED.issued_at, expires_at = EXCLUDED.expires_at",
        )
        .bind(&digest)
        .bind(entry.user_id)
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(entry.issued_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, digest: &str) -> Result<Option<SessionEntry>, SessionError> {
        let entry = sqlx::query_as::<_, SessionEntry>(
            "SELECT user_id, ip, user_agent, issued_at, expires_at
             FROM sessions
             WHERE token_digest = $1 AND expires_at > NOW()",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn expire(&self, digest: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
            .bind(digest)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

//! Session cache
//!
//! Tracks issued sessions and revoked token ids with a TTL. Two backends:
//! Redis for shared deployments and an in-process map for single-instance
//! development and tests. Both are reached through [`SessionStore`], so
//! nothing above this module knows which one is running.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use ruu_core::{SessionBackend, SessionConfig};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Session store timed out after {0} ms")]
    Timeout(u64),
}

/// Revocation-aware session cache
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record an issued session under its token id
    ///
    /// Bookkeeping only: validation consults the revocation set, never this record.
    async fn register(&self, jti: &str, user_id: Uuid, ttl_secs: u64) -> Result<(), SessionError>;

    /// Mark a token id revoked; repeated calls are harmless
    ///
    /// Returns `true` only for the call that actually revoked it. The check and
    /// the write are one atomic step, so concurrent callers see exactly one `true`.
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<bool, SessionError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, SessionError>;
}

/// Build the store selected by configuration
pub async fn connect(config: &SessionConfig) -> Result<Arc<dyn SessionStore>, SessionError> {
    match config.backend {
        SessionBackend::Redis => {
            let store = RedisSessionStore::connect(config).await?;
            info!(prefix = %config.key_prefix, "Session cache using Redis");
            Ok(Arc::new(store))
        }
        SessionBackend::Memory => {
            info!("Session cache using in-process memory");
            Ok(Arc::new(MemorySessionStore::new()))
        }
    }
}

// ============================================================================
// Redis
// ============================================================================

/// Redis-backed session cache
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    timeout: Duration,
}

impl RedisSessionStore {
    pub async fn connect(config: &SessionConfig) -> Result<Self, SessionError> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let timeout = Duration::from_millis(config.timeout_ms);

        let conn = tokio::time::timeout(timeout * 10, ConnectionManager::new(client))
            .await
            .map_err(|_| SessionError::Timeout(config.timeout_ms * 10))??;

        Ok(Self {
            conn,
            prefix: config.key_prefix.clone(),
            timeout,
        })
    }

    fn session_key(&self, jti: &str) -> String {
        format!("{}:session:{jti}", self.prefix)
    }

    fn revoked_key(&self, jti: &str) -> String {
        format!("{}:revoked:{jti}", self.prefix)
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| SessionError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(SessionError::from)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn register(&self, jti: &str, user_id: Uuid, ttl_secs: u64) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let key = self.session_key(jti);
        self.bounded(conn.set_ex::<_, _, ()>(&key, user_id.to_string(), ttl_secs.max(1)))
            .await?;

        debug!(jti = %jti, ttl_secs, "Session registered");
        Ok(())
    }

    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<bool, SessionError> {
        let mut conn = self.conn.clone();
        let revoked = self.revoked_key(jti);
        let session = self.session_key(jti);

        // SET NX replies nil when the key already exists
        let mut set = redis::cmd("SET");
        set.arg(&revoked).arg(1).arg("NX").arg("EX").arg(ttl_secs.max(1));
        let first = self
            .bounded(set.query_async::<_, Option<String>>(&mut conn))
            .await?
            .is_some();
        self.bounded(conn.del::<_, ()>(&session)).await?;

        debug!(jti = %jti, ttl_secs, first, "Token revoked");
        Ok(first)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, SessionError> {
        let mut conn = self.conn.clone();
        let key = self.revoked_key(jti);
        self.bounded(conn.exists::<_, bool>(&key)).await
    }
}

// ============================================================================
// In-process
// ============================================================================

/// In-process session cache with lazy expiry
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, (Uuid, Instant)>>,
    revoked: RwLock<HashMap<String, Instant>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live registered sessions
    pub async fn active_sessions(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }
}

fn expiry(ttl_secs: u64) -> Instant {
    Instant::now() + Duration::from_secs(ttl_secs.max(1))
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn register(&self, jti: &str, user_id: Uuid, ttl_secs: u64) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, (_, expires)| *expires > now);
        sessions.insert(jti.to_string(), (user_id, expiry(ttl_secs)));
        Ok(())
    }

    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<bool, SessionError> {
        let mut revoked = self.revoked.write().await;
        let now = Instant::now();
        revoked.retain(|_, expires| *expires > now);
        let first = !revoked.contains_key(jti);
        if first {
            revoked.insert(jti.to_string(), expiry(ttl_secs));
        }
        drop(revoked);

        self.sessions.write().await.remove(jti);
        Ok(first)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, SessionError> {
        let revoked = self.revoked.read().await;
        Ok(revoked
            .get(jti)
            .is_some_and(|expires| *expires > Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_revocation() {
        let store = MemorySessionStore::new();
        let user_id = Uuid::new_v4();

        store.register("nonce-a", user_id, 60).await.unwrap();
        assert_eq!(store.active_sessions().await, 1);
        assert!(!store.is_revoked("nonce-a").await.unwrap());

        assert!(store.revoke("nonce-a", 60).await.unwrap());
        assert!(!store.revoke("nonce-a", 60).await.unwrap());

        assert!(store.is_revoked("nonce-a").await.unwrap());
        assert!(!store.is_revoked("nonce-b").await.unwrap());
        assert_eq!(store.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_memory_store_concurrent_revoke_has_one_winner() {
        let store = Arc::new(MemorySessionStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.revoke("shared", 60).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = SessionConfig {
            backend: SessionBackend::Memory,
            ..Default::default()
        };

        let store = connect(&config).await.unwrap();
        assert!(store.revoke("x", 1).await.unwrap());
        assert!(store.is_revoked("x").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires redis"]
    async fn test_redis_store_revocation() {
        let config = SessionConfig {
            key_prefix: format!("ruu:test:{}", Uuid::new_v4()),
            ..Default::default()
        };
        let store = RedisSessionStore::connect(&config).await.unwrap();

        store.register("n1", Uuid::new_v4(), 30).await.unwrap();
        assert!(!store.is_revoked("n1").await.unwrap());
        assert!(store.revoke("n1", 30).await.unwrap());
        assert!(!store.revoke("n1", 30).await.unwrap());
        assert!(store.is_revoked("n1").await.unwrap());
    }
}

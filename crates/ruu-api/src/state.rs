//! Application state management
//!
//! Everything here is built once in `main` (or by tests) and shared
//! read-only through `Arc<AppState>`.
//!
//! Author: alfredo.tarigan@gmail.com

use ruu_core::config::AppConfig;
use ruu_core::{ClientRepository, FeatureRepository, PgStore, PropertyRepository, UserRepository};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::jwt::JwtConfig;
use crate::auth::password::PasswordConfig;
use crate::auth::service::AuthService;
use crate::auth::session::SessionStore;
use crate::auth::tokens::TokenService;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    pub users: Arc<dyn UserRepository>,
    pub clients: Arc<dyn ClientRepository>,
    pub features: Arc<dyn FeatureRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub tokens: TokenService,
    pub auth: AuthService,
}

/// Repository handles backing an [`AppState`]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub clients: Arc<dyn ClientRepository>,
    pub features: Arc<dyn FeatureRepository>,
    pub properties: Arc<dyn PropertyRepository>,
}

impl Repositories {
    /// All repositories served by one PostgreSQL store
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            clients: store.clone(),
            features: store.clone(),
            properties: store,
        }
    }

    /// All repositories served by one in-memory store
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Self {
        Self::memory(Arc::new(ruu_core::repository::memory::MemoryStore::new()))
    }

    /// All repositories served by a caller-held in-memory store
    #[cfg(any(test, feature = "test-utils"))]
    pub fn memory(store: Arc<ruu_core::repository::memory::MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            clients: store.clone(),
            features: store.clone(),
            properties: store,
        }
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repositories: Repositories,
        sessions: Arc<dyn SessionStore>,
        password_config: PasswordConfig,
    ) -> Self {
        let tokens = TokenService::new(JwtConfig::from(&config.auth), sessions);
        let auth = AuthService::new(repositories.users.clone(), tokens.clone(), password_config);

        Self {
            config,
            start_time: Instant::now(),
            users: repositories.users,
            clients: repositories.clients,
            features: repositories.features,
            properties: repositories.properties,
            tokens,
            auth,
        }
    }

    /// In-memory state with fast password hashing and a scratch upload directory
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        let mut config = AppConfig::default();
        config.server.upload_dir = std::env::temp_dir().join("ruu-test-uploads");

        Self::new(
            config,
            Repositories::in_memory(),
            Arc::new(crate::auth::session::MemorySessionStore::new()),
            PasswordConfig::fast(),
        )
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

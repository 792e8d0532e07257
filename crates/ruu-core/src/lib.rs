//! RUU Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the RUU backend:
//! - Business entities (users, clients, features, properties)
//! - Common error types
//! - The generic list query engine (pagination, allow-listed sort and search)
//! - Repository traits and their PostgreSQL implementations
//! - Configuration management

pub mod config;
pub mod models;
pub mod query;
pub mod repository;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, SessionBackend, SessionConfig};
pub use models::{
    Client, ClientChanges, Feature, NewClient, NewFeature, NewProperty, NewUser, Property, User,
    UserRole,
};
pub use query::{ListQuery, Listable, PaginationMeta, ResolvedQuery, SortOrder};
pub use repository::{
    ClientRepository, FeatureRepository, PgStore, PropertyRepository, UserRepository,
};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for RUU operations
///
/// Repositories and services return these tagged kinds; the HTTP layer maps
/// each kind to a status code in one place.
#[derive(Error, Debug)]
pub enum RuuError {
    #[error("{message}")]
    ValidationError {
        message: String,
        /// Per-field details, serialized into the error envelope
        errors: Option<serde_json::Value>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RuuError {
    /// Validation failure without per-field details
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            errors: None,
        }
    }
}

impl From<ConfigError> for RuuError {
    fn from(err: ConfigError) -> Self {
        RuuError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RuuError>;

//! Security audit logging for authentication events
//!
//! Every event is emitted at INFO level on the `audit` target, so it can be
//! routed separately from application logs, e.g.
//! `RUST_LOG=info,audit=info` with a dedicated subscriber layer.
//!
//! ```ignore
//! use ruu_api::audit::{audit_log, AuditContext, AuditEvent};
//!
//! audit_log(
//!     &AuditEvent::LoginSuccess { user_id: user.uuid, email: user.email.clone() },
//!     &AuditContext::from_headers(&headers),
//! );
//! ```
//!
//! Author: alfredo.tarigan@gmail.com

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess {
        user_id: Uuid,
        email: String,
    },

    /// Failed login; `reason` separates unknown accounts from bad passwords
    LoginFailure {
        email: String,
        reason: String,
    },

    Logout {
        user_id: Uuid,
        refresh_revoked: bool,
    },

    TokenRefresh {
        user_id: Uuid,
    },

    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        role: String,
    },

    RegistrationFailure {
        email: String,
        reason: String,
    },

    /// Authenticated user lacks the role a route requires
    AccessDenied {
        user_id: Uuid,
        resource: String,
        required_role: String,
    },

    /// Missing, malformed, expired or revoked token
    InvalidToken {
        reason: String,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::InvalidToken { .. } => "Invalid token",
        }
    }
}

/// Request metadata attached to every audit record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Log a security audit event with structured fields
///
/// The event itself is serialized to JSON in the `event` field; with the
/// JSON subscriber enabled a record looks like:
///
/// ```json
/// {
///   "target": "audit",
///   "fields": {
///     "message": "Login failed",
///     "event": "{\"event_type\":\"login_failure\",\"email\":\"a@x.com\",\"reason\":\"invalid_password\"}",
///     "ip_address": "Some(\"203.0.113.1\")"
///   }
/// }
/// ```
pub fn audit_log(event: &AuditEvent, context: &AuditContext) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        event = %event_json,
        ip_address = ?context.ip_address,
        user_agent = ?context.user_agent,
        "{}",
        event.summary()
    );
}

/// Client IP from `X-Forwarded-For` (first hop) or `X-Real-IP`
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|xff| xff.to_str().ok())
        .and_then(|xff| xff.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|ip| ip.to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

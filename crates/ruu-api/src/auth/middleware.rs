//! Authentication middleware for protecting routes
//!
//! Validates the bearer token on every request, loads the account it refers
//! to and stores a [`CurrentUser`] in the request extensions. Handlers take
//! `CurrentUser` as an extractor.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use ruu_core::{User, UserRole};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::tokens::TokenError;
use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;

/// Identity of the caller, resolved from a validated access token
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub uuid: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Token id of the presented access token
    pub jti: String,
    /// Raw access token, kept for logout
    #[serde(skip)]
    pub token: String,
}

impl CurrentUser {
    pub fn from_user(user: &User, jti: String, token: String) -> Self {
        Self {
            uuid: user.uuid,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            jti,
            token,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            tracing::error!(path = %parts.uri.path(), "CurrentUser requested on a route without auth middleware");
            AppError::Unauthorized("Authentication required".to_string())
        })
    }
}

/// Bearer token from the Authorization header
fn bearer_token(request: &Request<Body>) -> Result<&str, AppError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header format".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".to_string()))
}

/// Authentication middleware that requires a valid access token
///
/// 1. Extracts `Authorization: Bearer <token>`
/// 2. Validates signature, expiry and revocation
/// 3. Loads the (non-deleted) account named by the token
/// 4. Adds [`CurrentUser`] to request extensions
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
///
/// let protected = Router::new()
///     .route("/users/me", get(me))
///     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let context = AuditContext::from_headers(request.headers());

    let token = match bearer_token(&request) {
        Ok(token) => token.to_string(),
        Err(e) => {
            audit_log(
                &AuditEvent::InvalidToken {
                    reason: "missing or malformed Authorization header".to_string(),
                },
                &context,
            );
            return Err(e);
        }
    };

    let claims = match state.tokens.validate_token(&token).await {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(
                &AuditEvent::InvalidToken {
                    reason: e.to_string(),
                },
                &context,
            );
            return Err(e.into());
        }
    };

    let user_id = claims
        .user_id()
        .map_err(|_| AppError::from(TokenError::InvalidToken))?;

    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        audit_log(
            &AuditEvent::InvalidToken {
                reason: format!("token subject {user_id} has no live account"),
            },
            &context,
        );
        AppError::Unauthorized("User not found".to_string())
    })?;

    request
        .extensions_mut()
        .insert(CurrentUser::from_user(&user, claims.jti, token));

    Ok(next.run(request).await)
}

/// Reject authenticated callers that are not administrators
///
/// Must be layered inside [`auth_middleware`].
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    if !user.is_admin() {
        audit_log(
            &AuditEvent::AccessDenied {
                user_id: user.uuid,
                resource: request.uri().path().to_string(),
                required_role: UserRole::Admin.to_string(),
            },
            &AuditContext::from_headers(request.headers()),
        );
        return Err(AppError::Forbidden(
            "Admin role required for this resource".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

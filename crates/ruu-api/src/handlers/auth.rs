//! Authentication API handlers
//!
//! Login, logout and token refresh. Registration lives in `handlers::users`
//! because it is a multipart form under `/user/register`.
//!
//! Author: alfredo.tarigan@gmail.com

use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::auth::{
    CurrentUser, LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, TokenPair,
};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

/// Login with email and password
///
/// Unknown emails and wrong passwords get the same 401 response; the audit
/// log records which one it was.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::response::LoginEnvelope),
        (status = 400, description = "Invalid request body", body = crate::error::ApiError),
        (status = 401, description = "Invalid email or password", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let context = AuditContext::from_headers(&headers);

    match state.auth.login(&request).await {
        Ok((user, response)) => {
            audit_log(
                &AuditEvent::LoginSuccess {
                    user_id: user.uuid,
                    email: user.email,
                },
                &context,
            );
            Ok(ApiResponse::ok("Login successful", response))
        }
        Err(e) => {
            audit_log(
                &AuditEvent::LoginFailure {
                    email: request.email.clone(),
                    reason: e.audit_reason(),
                },
                &context,
            );
            Err(e.into())
        }
    }
}

/// Exchange a refresh token for a new token pair
///
/// The presented refresh token is revoked, so each one works once.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = crate::response::TokenEnvelope),
        (status = 400, description = "Invalid request body", body = crate::error::ApiError),
        (status = 401, description = "Invalid, expired or revoked refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<ApiResponse<TokenPair>, AppError> {
    let (user, pair) = state.auth.refresh(&request.refresh_token).await?;

    audit_log(
        &AuditEvent::TokenRefresh { user_id: user.uuid },
        &AuditContext::from_headers(&headers),
    );

    Ok(ApiResponse::ok("Token refreshed successfully", pair))
}

/// Logout the current session
///
/// Revokes the presented access token and, when the body names one, a
/// refresh token belonging to the same user. The body may be omitted.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    request_body(content = LogoutRequest, description = "Refresh token to revoke (optional)"),
    responses(
        (status = 200, description = "Logout successful", body = crate::response::MessageResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    headers: HeaderMap,
    body: Option<Json<LogoutRequest>>,
) -> Result<ApiResponse<()>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let refresh_revoked = state
        .auth
        .logout(user.uuid, &user.token, request.refresh_token.as_deref())
        .await?;

    audit_log(
        &AuditEvent::Logout {
            user_id: user.uuid,
            refresh_revoked,
        },
        &AuditContext::from_headers(&headers),
    );

    Ok(ApiResponse::message("Logout successful"))
}

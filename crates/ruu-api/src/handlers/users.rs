//! User account handlers
//!
//! Author: alfredo.tarigan@gmail.com

use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::auth::{CurrentUser, RegisterRequest};
use crate::error::AppError;
use crate::response::{ApiResponse, PaginatedResponse};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Query, State},
    http::HeaderMap,
};
use ruu_core::{ListQuery, User};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Multipart fields accepted by registration
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct RegisterForm {
    #[schema(example = "Sari Wulandari")]
    name: String,
    #[schema(example = "sari@ruu.co.id")]
    email: String,
    password: String,
    confirmation_password: String,
    #[schema(example = "+628111234567")]
    phone_number: String,
    #[schema(example = "user")]
    role: Option<String>,
    /// Profile photo
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<Vec<u8>>,
}

/// Uploaded file held in memory until the form is known to be valid
struct Upload {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/v1/user/register",
    tag = "users",
    request_body(content = RegisterForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "User registered successfully", body = crate::response::MessageResponse),
        (status = 400, description = "Invalid form", body = crate::error::ApiError),
        (status = 409, description = "Email or phone number already registered", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<ApiResponse<()>, AppError> {
    let mut request = RegisterRequest::default();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                upload = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "name" => request.name = value,
            "email" => request.email = value,
            "password" => request.password = value,
            "confirmation_password" => request.confirmation_password = value,
            "phone_number" => request.phone_number = value,
            "role" if !value.trim().is_empty() => request.role = Some(value.trim().parse()?),
            _ => {}
        }
    }

    let context = AuditContext::from_headers(&headers);
    let email = request.email.clone();

    if let Err(e) = request.validate() {
        audit_log(
            &AuditEvent::RegistrationFailure {
                email,
                reason: "validation_failed".to_string(),
            },
            &context,
        );
        return Err(e.into());
    }

    let stored = match upload {
        Some(upload) => Some(save_upload(&state.config.server.upload_dir, upload).await?),
        None => None,
    };
    request.image = stored.as_ref().map(|path| path.display().to_string());

    match state.auth.register(request).await {
        Ok(user) => {
            audit_log(
                &AuditEvent::RegistrationSuccess {
                    user_id: user.uuid,
                    email: user.email,
                    role: user.role.to_string(),
                },
                &context,
            );
            Ok(ApiResponse::message("User registered successfully"))
        }
        Err(e) => {
            if let Some(path) = stored {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove orphaned upload");
                }
            }
            audit_log(
                &AuditEvent::RegistrationFailure {
                    email,
                    reason: e.to_string(),
                },
                &context,
            );
            Err(e.into())
        }
    }
}

/// Unique stored name: `<unix seconds>_<uuid><original extension>`
fn upload_file_name(original: Option<&str>) -> String {
    let ext = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    format!("{}_{}{}", chrono::Utc::now().timestamp(), Uuid::new_v4(), ext)
}

async fn save_upload(dir: &Path, upload: Upload) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {e}")))?;

    let path = dir.join(upload_file_name(upload.file_name.as_deref()));
    tokio::fs::write(&path, &upload.bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to save file: {e}")))?;

    tracing::debug!(path = %path.display(), size = upload.bytes.len(), "Stored profile image");
    Ok(path)
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user", body = crate::response::UserEnvelope),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<ApiResponse<User>, AppError> {
    let user = state.auth.current_user(user.uuid).await?;
    Ok(ApiResponse::ok("Successfully fetched user", user))
}

/// List user accounts (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of users", body = crate::response::UserPage),
        (status = 400, description = "Invalid list parameters", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<PaginatedResponse<User>, AppError> {
    query.validate::<User>()?;
    let page = state.users.list(&query.resolve::<User>()).await?;
    Ok(PaginatedResponse::new("Successfully fetched users", page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_file_name_keeps_extension() {
        let name = upload_file_name(Some("avatar.photo.png"));
        assert!(name.ends_with(".png"));
        let (timestamp, rest) = name.split_once('_').unwrap();
        assert!(timestamp.parse::<i64>().is_ok());
        assert!(Uuid::parse_str(rest.trim_end_matches(".png")).is_ok());
    }

    #[test]
    fn test_upload_file_name_without_extension() {
        let name = upload_file_name(Some("avatar"));
        assert!(!name.contains('.'));
        assert!(!upload_file_name(None).contains('.'));
    }

    #[tokio::test]
    async fn test_save_upload_writes_file() {
        let dir = std::env::temp_dir().join(format!("ruu-uploads-{}", Uuid::new_v4()));
        let path = save_upload(
            &dir,
            Upload {
                file_name: Some("face.jpg".to_string()),
                bytes: vec![0xFF, 0xD8, 0xFF],
            },
        )
        .await
        .unwrap();

        assert!(path.starts_with(&dir));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![0xFF, 0xD8, 0xFF]);
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}

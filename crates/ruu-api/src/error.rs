//! API error handling
//!
//! `AppError` is the single place where failures become HTTP responses.
//! Internal details are logged and never sent to clients.
//!
//! Author: alfredo.tarigan@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ruu_core::RuuError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationErrors;

const INTERNAL_MESSAGE: &str = "Something went wrong, please try again later";

/// Error envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Always `false`
    pub success: bool,
    /// Human-readable message
    pub message: String,
    /// Stable error code
    #[schema(example = "NOT_FOUND")]
    pub code: String,
    /// Per-field validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.into(),
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: Option<serde_json::Value>) -> Self {
        self.errors = errors;
        self
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Input failed validation; `errors` carries per-field messages
    Validation {
        message: String,
        errors: Option<serde_json::Value>,
    },
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    InvalidToken,
    ExpiredToken,
    RevokedToken,
    Forbidden(String),
    Internal(String),
    Database(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_)
            | AppError::InvalidToken
            | AppError::ExpiredToken
            | AppError::RevokedToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::ExpiredToken => "EXPIRED_TOKEN",
            AppError::RevokedToken => "REVOKED_TOKEN",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Internal(_) | AppError::Database(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let error = match self {
            AppError::Validation { message, errors } => {
                ApiError::new(code, message).with_errors(errors)
            }
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => ApiError::new(code, msg),
            AppError::InvalidToken => ApiError::new(code, "Invalid token"),
            AppError::ExpiredToken => ApiError::new(code, "Token has expired"),
            AppError::RevokedToken => ApiError::new(code, "Token has been revoked"),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                ApiError::new(code, INTERNAL_MESSAGE)
            }
            AppError::Database(detail) => {
                tracing::error!(error = %detail, "Database error");
                ApiError::new(code, INTERNAL_MESSAGE)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<RuuError> for AppError {
    fn from(err: RuuError) -> Self {
        match err {
            RuuError::ValidationError { message, errors } => AppError::Validation { message, errors },
            RuuError::NotFound(msg) => AppError::NotFound(msg),
            RuuError::Conflict(msg) => AppError::Conflict(msg),
            RuuError::DatabaseError(msg) => AppError::Database(msg),
            RuuError::ConfigError(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            RuuError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = serde_json::Map::new();
        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid ({})", e.code),
                })
                .collect();
            fields.insert(field.to_string(), serde_json::json!(messages));
        }

        AppError::Validation {
            message: "Validation failed".to_string(),
            errors: Some(serde_json::Value::Object(fields)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "Invalid email format"))]
        email: String,
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(RuuError::NotFound("client not found".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(RuuError::Conflict("dup".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(RuuError::validation("bad")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::RevokedToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("no".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Database("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response =
            AppError::Database("relation \"clients\" does not exist".into()).into_response();
        let json = body_json(response).await;

        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert!(!json["message"].as_str().unwrap().contains("relation"));
    }

    #[tokio::test]
    async fn test_validation_errors_are_per_field() {
        let errors = Sample {
            email: "not-an-email".to_string(),
        }
        .validate()
        .unwrap_err();

        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["errors"]["email"][0], "Invalid email format");
    }
}

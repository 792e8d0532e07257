//! Authentication request and response bodies

use ruu_core::UserRole;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Login credentials
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "owner@ruu.co.id")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Successful login payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[schema(example = 3600)]
    pub expires_in: u64,
    pub access_token: String,
    pub refresh_token: String,
    pub email: String,
    pub uuid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Logout body; the access token comes from the Authorization header
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct LogoutRequest {
    /// Also revoke this refresh token
    pub refresh_token: Option<String>,
}

/// Registration fields, assembled from the multipart form
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirmation_password: String,

    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone_number: String,

    /// `user` (default) or `admin`
    #[schema(value_type = Option<String>, example = "user")]
    pub role: Option<UserRole>,

    /// Stored path of the uploaded profile image
    #[serde(skip)]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_registration() -> RegisterRequest {
        RegisterRequest {
            name: "Sari".to_string(),
            email: "sari@example.com".to_string(),
            password: "rahasia".to_string(),
            confirmation_password: "rahasia".to_string(),
            phone_number: "+628111".to_string(),
            role: None,
            image: None,
        }
    }

    #[test]
    fn test_registration_validation() {
        assert!(valid_registration().validate().is_ok());

        let short = RegisterRequest {
            password: "12345".to_string(),
            confirmation_password: "12345".to_string(),
            ..valid_registration()
        };
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let mismatch = RegisterRequest {
            confirmation_password: "different".to_string(),
            ..valid_registration()
        };
        let errors = mismatch.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirmation_password"));
    }

    #[test]
    fn test_login_validation() {
        let request = LoginRequest {
            email: "not-an-email".to_string(),
            password: String::new(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}

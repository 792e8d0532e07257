//! Authentication service layer
//!
//! Login, registration, token refresh and logout on top of the user
//! repository and the token service. Argon2 work runs on the blocking pool.

use ruu_core::{NewUser, RuuError, User, UserRepository};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::models::{LoginRequest, LoginResponse, RegisterRequest};
use super::password::{hash_password_with_config, verify_password, PasswordConfig, PasswordError};
use super::tokens::{generate_nonce, TokenError, TokenPair, TokenService};
use crate::error::AppError;

/// Authentication failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No account for this email")]
    UserNotFound,

    #[error("Password does not match")]
    InvalidCredentials,

    /// Token subject no longer resolves to a live account
    #[error("Account is no longer available")]
    AccountUnavailable,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Repository(#[from] RuuError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AuthError {
    /// Reason recorded in the audit log
    pub fn audit_reason(&self) -> String {
        match self {
            AuthError::UserNotFound => "unknown_email".to_string(),
            AuthError::InvalidCredentials => "invalid_password".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => AppError::InvalidToken,
            TokenError::ExpiredToken => AppError::ExpiredToken,
            TokenError::RevokedToken => AppError::RevokedToken,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserNotFound | AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::AccountUnavailable => AppError::Unauthorized("User not found".to_string()),
            AuthError::Token(e) => e.into(),
            AuthError::Validation(e) => e.into(),
            AuthError::Repository(e) => e.into(),
            AuthError::Password(e) => AppError::Internal(e.to_string()),
            AuthError::Task(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    password_config: PasswordConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            password_config,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Verify credentials and issue a token pair
    pub async fn login(&self, request: &LoginRequest) -> Result<(User, LoginResponse), AuthError> {
        request.validate()?;

        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let password = request.password.clone();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await??;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let nonce = generate_nonce();
        let pair = self.tokens.generate_token(user.uuid, user.role, &nonce).await?;

        let response = LoginResponse {
            token_type: pair.token_type,
            expires_in: pair.expires_in,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            email: user.email.clone(),
            uuid: user.uuid,
            name: user.name.clone(),
        };

        Ok((user, response))
    }

    /// Create an account; email and phone must be unused, deleted accounts included
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        request.validate()?;

        let config = self.password_config.clone();
        let password = request.password;
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
                .await??;

        let user = self
            .users
            .create(NewUser {
                email: request.email,
                password_hash,
                name: request.name,
                phone_number: request.phone_number,
                image: request.image,
                role: request.role.unwrap_or_default(),
            })
            .await?;

        Ok(user)
    }

    /// Exchange a refresh token for a new pair, revoking the old refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair), AuthError> {
        let claims = self.tokens.validate_refresh_token(refresh_token).await?;
        let user_id = claims.user_id().map_err(TokenError::from)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::AccountUnavailable)?;

        // Only the caller that revokes the old token gets a new pair
        if !self.tokens.revoke(refresh_token).await? {
            return Err(TokenError::RevokedToken.into());
        }

        let pair = self
            .tokens
            .generate_token(user.uuid, user.role, &generate_nonce())
            .await?;

        Ok((user, pair))
    }

    /// Revoke the access token and, when given, a refresh token of the same user
    ///
    /// Returns whether a refresh token was revoked.
    pub async fn logout(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<bool, AuthError> {
        self.tokens.revoke(access_token).await?;

        let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
            return Ok(false);
        };

        if self.tokens.user_id_from_token(refresh_token)? != user_id {
            return Err(TokenError::InvalidToken.into());
        }
        self.tokens.revoke(refresh_token).await?;

        Ok(true)
    }

    /// Live account for an authenticated user id
    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::AccountUnavailable)
    }
}

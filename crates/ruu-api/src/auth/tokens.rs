//! Token service
//!
//! Issues access/refresh pairs, validates them against the session cache and
//! revokes them. The access token's `jti` is the login nonce; the refresh
//! token's `jti` is `<nonce>.refresh`.

use rand::distributions::Alphanumeric;
use rand::Rng;
use ruu_core::UserRole;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::jwt::{decode_token, encode_token, Claims, JwtConfig, JwtError, TokenType};
use super::session::{SessionError, SessionStore};

pub const NONCE_LEN: usize = 32;
const REFRESH_SUFFIX: &str = ".refresh";

/// Token service errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Encoding(JwtError),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::ExpiredToken => TokenError::ExpiredToken,
            JwtError::InvalidToken | JwtError::InvalidSignature => TokenError::InvalidToken,
            other => TokenError::Encoding(other),
        }
    }
}

/// Access/refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds
    #[schema(example = 3600)]
    pub expires_in: u64,
}

/// Random alphanumeric session nonce
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct TokenService {
    config: JwtConfig,
    sessions: Arc<dyn SessionStore>,
}

impl TokenService {
    pub fn new(config: JwtConfig, sessions: Arc<dyn SessionStore>) -> Self {
        Self { config, sessions }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Mint an access/refresh pair and register the access session
    ///
    /// Session registration is best-effort; a cache failure is logged and the
    /// pair is still returned.
    pub async fn generate_token(
        &self,
        user_id: Uuid,
        role: UserRole,
        nonce: &str,
    ) -> Result<TokenPair, TokenError> {
        let (access_token, _) =
            encode_token(&self.config, user_id, role, nonce, TokenType::Access)
                .map_err(TokenError::Encoding)?;

        let refresh_jti = format!("{nonce}{REFRESH_SUFFIX}");
        let (refresh_token, _) =
            encode_token(&self.config, user_id, role, &refresh_jti, TokenType::Refresh)
                .map_err(TokenError::Encoding)?;

        if let Err(e) = self
            .sessions
            .register(nonce, user_id, self.config.access_expiration_secs)
            .await
        {
            warn!(error = %e, jti = %nonce, "Session registration failed");
        }

        debug!(user_id = %user_id, jti = %nonce, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_expiration_secs,
        })
    }

    /// Validate an access token: signature, issuer, type, expiry and revocation
    pub async fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_typed(token, TokenType::Access).await
    }

    /// Same checks as [`Self::validate_token`] for a refresh token
    pub async fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_typed(token, TokenType::Refresh).await
    }

    async fn validate_typed(&self, token: &str, typ: TokenType) -> Result<Claims, TokenError> {
        let claims = decode_token(&self.config, token, true)?;
        if claims.typ != typ {
            return Err(TokenError::InvalidToken);
        }

        if self.jti_revoked(&claims.jti).await {
            return Err(TokenError::RevokedToken);
        }

        Ok(claims)
    }

    /// Revoke a token for the rest of its lifetime
    ///
    /// The signature must verify; an expired token may still be revoked.
    /// Returns `false` when the token was already revoked.
    pub async fn revoke(&self, token: &str) -> Result<bool, TokenError> {
        let claims = decode_token(&self.config, token, false)?;
        let ttl = claims.remaining_secs().max(1);

        Ok(self.sessions.revoke(&claims.jti, ttl).await?)
    }

    /// Expiry check without touching the session cache; malformed tokens count as expired
    pub fn is_token_expired(&self, token: &str) -> bool {
        match decode_token(&self.config, token, false) {
            Ok(claims) => claims.remaining_secs() == 0,
            Err(_) => true,
        }
    }

    /// Revocation check; unverifiable tokens and store failures count as revoked
    pub async fn is_token_revoked(&self, token: &str) -> bool {
        match decode_token(&self.config, token, false) {
            Ok(claims) => self.jti_revoked(&claims.jti).await,
            Err(_) => true,
        }
    }

    async fn jti_revoked(&self, jti: &str) -> bool {
        match self.sessions.is_revoked(jti).await {
            Ok(revoked) => revoked,
            Err(e) => {
                error!(error = %e, jti = %jti, "Revocation check failed, rejecting token");
                true
            }
        }
    }

    /// User id from a correctly signed token, expired or not
    pub fn user_id_from_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = decode_token(&self.config, token, false)?;
        claims.user_id().map_err(TokenError::from)
    }

    /// Role from a correctly signed token, expired or not
    pub fn role_from_token(&self, token: &str) -> Result<UserRole, TokenError> {
        Ok(decode_token(&self.config, token, false)?.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::MemorySessionStore;
    use async_trait::async_trait;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    fn service() -> TokenService {
        TokenService::new(JwtConfig::default(), Arc::new(MemorySessionStore::new()))
    }

    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        async fn register(&self, _: &str, _: Uuid, _: u64) -> Result<(), SessionError> {
            Err(SessionError::Timeout(500))
        }

        async fn revoke(&self, _: &str, _: u64) -> Result<bool, SessionError> {
            Err(SessionError::Timeout(500))
        }

        async fn is_revoked(&self, _: &str) -> Result<bool, SessionError> {
            Err(SessionError::Timeout(500))
        }
    }

    fn expired_token(config: &JwtConfig) -> String {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            iss: config.issuer.clone(),
            sub: Uuid::new_v4().to_string(),
            jti: generate_nonce(),
            typ: TokenType::Access,
            role: UserRole::User,
            iat: now - 7200,
            exp: now - 3600,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_nonce_shape() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(nonce, generate_nonce());
    }

    #[tokio::test]
    async fn test_generate_and_validate() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let nonce = generate_nonce();

        let pair = tokens
            .generate_token(user_id, UserRole::Admin, &nonce)
            .await
            .unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);

        let claims = tokens.validate_token(&pair.access_token).await.unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.jti, nonce);

        let refresh = tokens
            .validate_refresh_token(&pair.refresh_token)
            .await
            .unwrap();
        assert_eq!(refresh.jti, format!("{nonce}.refresh"));

        assert_eq!(tokens.user_id_from_token(&pair.access_token).unwrap(), user_id);
        assert_eq!(
            tokens.role_from_token(&pair.refresh_token).unwrap(),
            UserRole::Admin
        );
    }

    #[tokio::test]
    async fn test_token_types_are_not_interchangeable() {
        let tokens = service();
        let pair = tokens
            .generate_token(Uuid::new_v4(), UserRole::User, &generate_nonce())
            .await
            .unwrap();

        assert!(matches!(
            tokens.validate_token(&pair.refresh_token).await,
            Err(TokenError::InvalidToken)
        ));
        assert!(matches!(
            tokens.validate_refresh_token(&pair.access_token).await,
            Err(TokenError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent_and_final() {
        let tokens = service();
        let pair = tokens
            .generate_token(Uuid::new_v4(), UserRole::User, &generate_nonce())
            .await
            .unwrap();

        assert!(!tokens.is_token_revoked(&pair.access_token).await);

        assert!(tokens.revoke(&pair.access_token).await.unwrap());
        assert!(!tokens.revoke(&pair.access_token).await.unwrap());

        assert!(tokens.is_token_revoked(&pair.access_token).await);
        assert!(matches!(
            tokens.validate_token(&pair.access_token).await,
            Err(TokenError::RevokedToken)
        ));

        // Revoking the access token leaves the refresh token usable
        assert!(tokens
            .validate_refresh_token(&pair.refresh_token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired_token() {
        let tokens = service();
        let token = expired_token(tokens.config());

        assert!(tokens.is_token_expired(&token));
        assert!(matches!(
            tokens.validate_token(&token).await,
            Err(TokenError::ExpiredToken)
        ));

        // Expired tokens can still be revoked
        tokens.revoke(&token).await.unwrap();
        assert!(tokens.is_token_revoked(&token).await);
    }

    #[tokio::test]
    async fn test_malformed_tokens() {
        let tokens = service();

        assert!(tokens.is_token_expired("not-a-jwt"));
        assert!(tokens.is_token_revoked("not-a-jwt").await);
        assert!(matches!(
            tokens.revoke("not-a-jwt").await,
            Err(TokenError::InvalidToken)
        ));
        assert!(matches!(
            tokens.user_id_from_token("not-a-jwt"),
            Err(TokenError::InvalidToken)
        ));

        let fresh = tokens
            .generate_token(Uuid::new_v4(), UserRole::User, &generate_nonce())
            .await
            .unwrap();
        assert!(!tokens.is_token_expired(&fresh.access_token));
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let healthy = service();
        let pair = healthy
            .generate_token(Uuid::new_v4(), UserRole::User, &generate_nonce())
            .await
            .unwrap();

        let broken = TokenService::new(JwtConfig::default(), Arc::new(BrokenStore));

        assert!(broken.is_token_revoked(&pair.access_token).await);
        assert!(matches!(
            broken.validate_token(&pair.access_token).await,
            Err(TokenError::RevokedToken)
        ));
        assert!(matches!(
            broken.revoke(&pair.access_token).await,
            Err(TokenError::Session(_))
        ));
    }

    #[tokio::test]
    async fn test_session_registration_failure_does_not_block_issuance() {
        let broken = TokenService::new(JwtConfig::default(), Arc::new(BrokenStore));

        let pair = broken
            .generate_token(Uuid::new_v4(), UserRole::User, &generate_nonce())
            .await
            .unwrap();
        assert!(!broken.is_token_expired(&pair.access_token));
    }
}

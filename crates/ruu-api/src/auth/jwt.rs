//! JWT encoding and decoding
//!
//! Tokens are HS256-signed. Each carries the user id, role, a `jti` used as
//! the session key for revocation, and a `typ` that keeps access and refresh
//! tokens from being used interchangeably.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ruu_core::{AuthConfig, UserRole};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// Token purpose
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims carried by both access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// JWT ID - session key in the session cache
    pub jti: String,
    pub typ: TokenType,
    pub role: UserRole,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidToken)
    }

    /// Seconds until expiry, zero once expired
    pub fn remaining_secs(&self) -> u64 {
        self.exp.saturating_sub(now_secs())
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Access token lifetime in seconds (default: 3600 = 1 hour)
    pub access_expiration_secs: u64,
    /// Refresh token lifetime in seconds (default: 7 days)
    pub refresh_expiration_secs: u64,
    /// Token issuer identifier
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_expiration_secs: config.access_expiration_secs,
            refresh_expiration_secs: config.refresh_expiration_secs,
            issuer: config.issuer.clone(),
        }
    }
}

impl JwtConfig {
    pub fn lifetime(&self, typ: TokenType) -> u64 {
        match typ {
            TokenType::Access => self.access_expiration_secs,
            TokenType::Refresh => self.refresh_expiration_secs,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Sign a token of the given type
///
/// Returns the encoded token together with its claims.
pub fn encode_token(
    config: &JwtConfig,
    user_id: Uuid,
    role: UserRole,
    jti: &str,
    typ: TokenType,
) -> Result<(String, Claims), JwtError> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    let claims = Claims {
        iss: config.issuer.clone(),
        sub: user_id.to_string(),
        jti: jti.to_string(),
        typ,
        role,
        iat: now,
        exp: now + config.lifetime(typ),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok((token, claims))
}

/// Verify signature and issuer, and optionally expiry, then return the claims
pub fn decode_token(config: &JwtConfig, token: &str, check_expiry: bool) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.leeway = 0;
    validation.validate_exp = check_expiry;
    if !check_expiry {
        validation.required_spec_claims.remove("exp");
    }

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired_token(config: &JwtConfig) -> String {
        let now = now_secs();

        // Expired one hour ago
        let claims = Claims {
            iss: config.issuer.clone(),
            sub: Uuid::new_v4().to_string(),
            jti: "expired-nonce".to_string(),
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
    fn test_encode_and_decode_token() {
        let config = JwtConfig::default();
        let user_id = Uuid::new_v4();

        let (token, issued) =
            encode_token(&config, user_id, UserRole::Admin, "nonce-1", TokenType::Access)
                .expect("Failed to generate token");

        let claims = decode_token(&config, &token, true).expect("Failed to validate token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.jti, "nonce-1");
        assert_eq!(claims.typ, TokenType::Access);
        assert_eq!(claims.iss, "ruu-api");
        assert_eq!(claims.exp, issued.exp);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_refresh_lifetime() {
        let config = JwtConfig::default();
        let (_, claims) = encode_token(
            &config,
            Uuid::new_v4(),
            UserRole::User,
            "n.refresh",
            TokenType::Refresh,
        )
        .unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_invalid_token() {
        let config = JwtConfig::default();
        let result = decode_token(&config, "invalid.token.here", true);
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig {
            secret: "secret1".to_string(),
            ..Default::default()
        };
        let config2 = JwtConfig {
            secret: "secret2".to_string(),
            ..Default::default()
        };

        let (token, _) = encode_token(
            &config1,
            Uuid::new_v4(),
            UserRole::User,
            "nonce",
            TokenType::Access,
        )
        .unwrap();

        let result = decode_token(&config2, &token, true);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_issuer() {
        let config = JwtConfig::default();
        let other = JwtConfig {
            issuer: "someone-else".to_string(),
            ..Default::default()
        };

        let (token, _) =
            encode_token(&other, Uuid::new_v4(), UserRole::User, "n", TokenType::Access).unwrap();
        assert!(matches!(
            decode_token(&config, &token, true),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let config = JwtConfig::default();
        let token = expired_token(&config);

        assert!(matches!(
            decode_token(&config, &token, true),
            Err(JwtError::ExpiredToken)
        ));

        // Signature still verifiable when expiry is ignored
        let claims = decode_token(&config, &token, false).unwrap();
        assert_eq!(claims.jti, "expired-nonce");
        assert_eq!(claims.remaining_secs(), 0);
    }
}

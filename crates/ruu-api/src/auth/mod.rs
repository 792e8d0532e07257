//! Authentication and authorization module
//!
//! JWT bearer authentication with the following components:
//! - Token signing and decoding (`jwt`)
//! - Session registration and revocation in Redis or memory (`session`)
//! - Token issuance, validation and revocation (`tokens`)
//! - Password hashing with Argon2 (`password`)
//! - Login, registration, refresh and logout (`service`)
//! - Request authentication and role checks (`middleware`)

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod session;
pub mod tokens;

pub use jwt::{Claims, JwtConfig, JwtError, TokenType};
pub use middleware::{auth_middleware, require_admin, CurrentUser};
pub use models::{LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RegisterRequest};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::{AuthError, AuthService};
pub use session::{MemorySessionStore, RedisSessionStore, SessionError, SessionStore};
pub use tokens::{generate_nonce, TokenError, TokenPair, TokenService};

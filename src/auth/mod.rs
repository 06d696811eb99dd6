//! Authentication primitives for Cardway
//!
//! Provides:
//! - JWT token generation and validation
//! - Persisted refresh token issue/refresh/revoke
//! - Password hashing with Argon2

pub mod jwt;
pub mod password;
pub mod tokens;

pub use jwt::{extract_token_from_header, Claims, JwtKeys, TokenKind};
pub use password::{hash_password, verify_password};
pub use tokens::{AuthTokens, TokenService};

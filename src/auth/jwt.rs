//! JWT issue and verification
//!
//! Access and refresh tokens share the claim shape but carry a `kind`
//! marker so a refresh token can never pass as an access credential.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CardwayError, Result};

/// What a token is good for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[default]
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Token id (persisted for refresh tokens)
    pub jti: String,
    /// Token kind
    #[serde(default)]
    pub kind: TokenKind,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// Issued at (seconds since epoch)
    pub iat: i64,
}

/// Signing/verification key pair derived from the shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for a user; returns the encoded token and its claims
    pub fn issue(
        &self,
        user_id: &str,
        name: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<(String, Claims)> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            name: name.to_string(),
            jti: Uuid::new_v4().to_string(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| CardwayError::Auth(format!("Failed to encode token: {e}")))?;

        Ok((token, claims))
    }

    /// Verify signature and expiry; `Unauthorized` on any failure
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| CardwayError::Unauthorized)
    }
}

/// Extract a bearer token from an `Authorization` header value
pub fn extract_token_from_header(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

//! Refresh token service
//!
//! Issues access/refresh token pairs and validates refresh tokens
//! against the persisted store. A refresh token is only usable while
//! its `jti` row exists and is unexpired; revocation deletes the row.

use std::sync::Arc;

use bson::doc;
use chrono::{Duration, TimeZone, Utc};
use tracing::debug;

use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::db::schemas::{RefreshTokenDoc, UserDoc};
use crate::db::store::Collection;
use crate::types::{CardwayError, Result};

/// Tokens returned by a successful login
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Token issue/refresh/revoke service
#[derive(Clone)]
pub struct TokenService {
    keys: JwtKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
    tokens: Arc<dyn Collection<RefreshTokenDoc>>,
}

impl TokenService {
    pub fn new(
        keys: JwtKeys,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
        tokens: Arc<dyn Collection<RefreshTokenDoc>>,
    ) -> Self {
        Self {
            keys,
            access_ttl: Duration::seconds(access_ttl_seconds),
            refresh_ttl: Duration::seconds(refresh_ttl_seconds),
            tokens,
        }
    }

    /// The verification keys, for wiring the access guard
    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Issue an access/refresh pair, persisting the refresh token
    pub async fn issue_pair(&self, user: &UserDoc) -> Result<AuthTokens> {
        let (access_token, _) =
            self.keys
                .issue(&user.id, &user.name, TokenKind::Access, self.access_ttl)?;
        let (refresh_token, claims) =
            self.keys
                .issue(&user.id, &user.name, TokenKind::Refresh, self.refresh_ttl)?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(Utc::now);
        self.tokens
            .insert_one(RefreshTokenDoc::new(claims.jti, user.id.clone(), expires_at))
            .await?;

        Ok(AuthTokens {
            user_id: user.id.clone(),
            access_token,
            refresh_token,
        })
    }

    /// Exchange a live refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let claims = self.keys.verify(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(CardwayError::Unauthorized);
        }

        let stored = self
            .tokens
            .find_by_id(&claims.jti)
            .await?
            .filter(RefreshTokenDoc::is_valid)
            .ok_or(CardwayError::Unauthorized)?;

        let (access_token, _) =
            self.keys
                .issue(&stored.user_id, &claims.name, TokenKind::Access, self.access_ttl)?;
        Ok(access_token)
    }

    /// Revoke a refresh token; unknown or malformed tokens are ignored
    pub async fn revoke(&self, refresh_token: &str) -> Result<()> {
        let Ok(claims) = self.keys.verify(refresh_token) else {
            return Ok(());
        };

        let deleted = self.tokens.delete_one(doc! { "id": &claims.jti }).await?;
        debug!(jti = %claims.jti, deleted, "refresh token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryCollection;

    fn service() -> TokenService {
        TokenService::new(
            JwtKeys::new("test-secret"),
            900,
            86_400,
            Arc::new(MemoryCollection::new()),
        )
    }

    fn user() -> UserDoc {
        UserDoc::new("a@b.c".into(), "hash".into(), "Ann".into())
    }

    #[tokio::test]
    async fn test_issue_and_refresh() {
        let svc = service();
        let tokens = svc.issue_pair(&user()).await.unwrap();

        let access = svc.refresh(&tokens.refresh_token).await.unwrap();
        let claims = svc.keys().verify(&access).unwrap();
        assert_eq!(claims.sub, tokens.user_id);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let svc = service();
        let tokens = svc.issue_pair(&user()).await.unwrap();

        assert!(matches!(
            svc.refresh(&tokens.access_token).await,
            Err(CardwayError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_refresh() {
        let svc = service();
        let tokens = svc.issue_pair(&user()).await.unwrap();

        svc.revoke(&tokens.refresh_token).await.unwrap();
        assert!(matches!(
            svc.refresh(&tokens.refresh_token).await,
            Err(CardwayError::Unauthorized)
        ));

        // Revoking again is a no-op
        svc.revoke(&tokens.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_revoke_is_noop() {
        let svc = service();
        svc.revoke("not-a-token").await.unwrap();
    }
}

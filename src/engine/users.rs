//! Account operations: signup, login, token refresh, follow lists

use bson::doc;
use tracing::{debug, info};

use super::{validate_name, Engine};
use crate::auth::{hash_password, verify_password, AuthTokens};
use crate::db::schemas::UserDoc;
use crate::guard::Principal;
use crate::types::{CardwayError, Result};

impl Engine {
    /// Register a new user
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<UserDoc> {
        if email.trim().is_empty() {
            return Err(CardwayError::Validation("email is required".to_string()));
        }
        if password.is_empty() {
            return Err(CardwayError::Validation("password is required".to_string()));
        }
        validate_name(name)?;

        if self
            .store
            .users
            .find_one(doc! { "email": email })
            .await?
            .is_some()
        {
            return Err(CardwayError::Validation(
                "email already registered".to_string(),
            ));
        }

        let user = UserDoc::new(
            email.to_string(),
            hash_password(password)?,
            name.to_string(),
        );
        self.store.users.insert_one(user.clone()).await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verify credentials and issue an access/refresh token pair
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens> {
        let user = self
            .store
            .users
            .find_one(doc! { "email": email })
            .await?
            .ok_or(CardwayError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(CardwayError::Unauthorized);
        }

        debug!(user_id = %user.id, "login");
        self.tokens.issue_pair(&user).await
    }

    /// Exchange a live refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        self.tokens.refresh(refresh_token).await
    }

    /// Revoke a refresh token; idempotent
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.tokens.revoke(refresh_token).await
    }

    /// Follow another user
    pub async fn follow(&self, caller: &Principal, target_user_id: &str) -> Result<()> {
        if caller.user_id == target_user_id {
            return Err(CardwayError::Validation(
                "cannot follow yourself".to_string(),
            ));
        }

        let mut me = self.user_or_not_found(&caller.user_id).await?;
        let mut target = self.user_or_not_found(target_user_id).await?;

        if me.following.iter().any(|id| id == target_user_id) {
            return Ok(());
        }

        me.following.push(target.id.clone());
        target.followers.push(me.id.clone());

        self.store
            .users
            .update_one(
                doc! { "id": &me.id },
                doc! { "$set": { "following": &me.following } },
            )
            .await?;
        self.store
            .users
            .update_one(
                doc! { "id": &target.id },
                doc! { "$set": { "followers": &target.followers } },
            )
            .await?;
        Ok(())
    }

    /// Stop following another user; a no-op when not following
    pub async fn unfollow(&self, caller: &Principal, target_user_id: &str) -> Result<()> {
        let mut me = self.user_or_not_found(&caller.user_id).await?;
        let mut target = self.user_or_not_found(target_user_id).await?;

        me.following.retain(|id| id != target_user_id);
        target.followers.retain(|id| id != &caller.user_id);

        self.store
            .users
            .update_one(
                doc! { "id": &me.id },
                doc! { "$set": { "following": &me.following } },
            )
            .await?;
        self.store
            .users
            .update_one(
                doc! { "id": &target.id },
                doc! { "$set": { "followers": &target.followers } },
            )
            .await?;
        Ok(())
    }

    async fn user_or_not_found(&self, user_id: &str) -> Result<UserDoc> {
        self.store
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| CardwayError::not_found("user", user_id))
    }
}

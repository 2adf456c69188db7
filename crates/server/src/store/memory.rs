use std::collections::HashMap;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{NewRefreshToken, RefreshTokenRecord, StoreError, UserRecord};

#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    pub(super) users: HashMap<Uuid, UserRecord>,
    pub(super) refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

impl MemoryAuthStore {
    pub(super) fn find_user_by_email(&self, email: &str) -> Option<UserRecord> {
        self.users.values().find(|user| user.email == email).cloned()
    }

    fn email_taken_by_other(&self, email: &str, user_id: Option<Uuid>) -> bool {
        self.users.values().any(|user| user.email == email && Some(user.id) != user_id)
    }

    pub(super) fn create_user(
        &mut self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, StoreError> {
        if self.email_taken_by_other(email, None) {
            return Err(StoreError::EmailTaken);
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            hashed_password: hashed_password.to_owned(),
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub(super) fn update_user_credentials(
        &mut self,
        user_id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        if !self.users.contains_key(&user_id) {
            return Ok(None);
        }
        if self.email_taken_by_other(email, Some(user_id)) {
            return Err(StoreError::EmailTaken);
        }

        Ok(self.users.get_mut(&user_id).map(|user| {
            user.email = email.to_owned();
            user.hashed_password = hashed_password.to_owned();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    pub(super) fn set_chirpy_red(&mut self, user_id: Uuid) -> Option<UserRecord> {
        self.users.get_mut(&user_id).map(|user| {
            user.is_chirpy_red = true;
            user.updated_at = Utc::now();
            user.clone()
        })
    }

    pub(super) fn insert_refresh_token(&mut self, token: NewRefreshToken) -> Result<(), StoreError> {
        if !self.users.contains_key(&token.user_id) {
            return Err(anyhow!("refresh token references unknown user {}", token.user_id).into());
        }
        if self.refresh_tokens.contains_key(&token.token) {
            return Err(anyhow!("duplicate refresh token").into());
        }

        let record = RefreshTokenRecord {
            token: token.token.clone(),
            user_id: token.user_id,
            created_at: token.created_at,
            updated_at: token.created_at,
            expires_at: token.expires_at,
            revoked_at: None,
        };
        self.refresh_tokens.insert(token.token, record);
        Ok(())
    }

    pub(super) fn mark_refresh_token_revoked(
        &mut self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Option<RefreshTokenRecord> {
        self.refresh_tokens.get_mut(token).map(|record| {
            if record.revoked_at.is_none() {
                record.revoked_at = Some(revoked_at);
                record.updated_at = revoked_at;
            }
            record.clone()
        })
    }
}

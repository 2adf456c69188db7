// Opaque, store-backed refresh tokens.
//
// Tokens are not rotated: resolving one leaves it usable until it expires or
// is revoked.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

use crate::store::{AuthStore, NewRefreshToken, StoreError};

pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;
const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum RefreshTokenError {
    #[error("refresh token not found")]
    NotFound,

    #[error("refresh token has been revoked or has expired")]
    RevokedOrExpired,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for RefreshTokenError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Internal(error) => Self::Internal(error),
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RefreshTokenStore {
    store: AuthStore,
    ttl: Duration,
}

impl RefreshTokenStore {
    pub fn new(store: AuthStore) -> Self {
        Self { store, ttl: Duration::days(REFRESH_TOKEN_TTL_DAYS) }
    }

    pub async fn issue(&self, user_id: Uuid) -> Result<IssuedRefreshToken, RefreshTokenError> {
        self.issue_at(user_id, Utc::now()).await
    }

    pub(crate) async fn issue_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<IssuedRefreshToken, RefreshTokenError> {
        let token = generate_refresh_token();
        let expires_at = now + self.ttl;

        self.store
            .insert_refresh_token(NewRefreshToken {
                token: token.clone(),
                user_id,
                created_at: now,
                expires_at,
            })
            .await?;

        tracing::debug!(%user_id, %expires_at, "refresh token issued");
        Ok(IssuedRefreshToken { token, expires_at })
    }

    /// Returns the owner of `token` if it is neither revoked nor expired.
    pub async fn resolve(&self, token: &str) -> Result<Uuid, RefreshTokenError> {
        self.resolve_at(token, Utc::now()).await
    }

    pub(crate) async fn resolve_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, RefreshTokenError> {
        let record =
            self.store.find_refresh_token(token).await?.ok_or(RefreshTokenError::NotFound)?;

        if !record.is_usable_at(now) {
            return Err(RefreshTokenError::RevokedOrExpired);
        }

        Ok(record.user_id)
    }

    /// Marks `token` unusable. Revoking an already revoked token succeeds and
    /// keeps the original revocation time.
    pub async fn revoke(&self, token: &str) -> Result<(), RefreshTokenError> {
        let record = self
            .store
            .mark_refresh_token_revoked(token, Utc::now())
            .await?
            .ok_or(RefreshTokenError::NotFound)?;

        tracing::debug!(user_id = %record.user_id, "refresh token revoked");
        Ok(())
    }
}

/// 32 bytes from the OS-seeded CSPRNG, lowercase hex encoded.
fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

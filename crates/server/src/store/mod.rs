// Persistence for users and refresh tokens.
//
// `AuthStore` dispatches to PostgreSQL in production and to an in-memory map
// for tests and database-less local runs. Every operation touches a single
// row, so no transaction spans more than one statement.

mod memory;
mod postgres;

use std::sync::Arc;

use chirpy_common::types::UserProfile;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

pub use memory::MemoryAuthStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email is already registered")]
    EmailTaken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            is_chirpy_red: self.is_chirpy_red,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Usable iff never revoked and `now` is strictly before expiry.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub enum AuthStore {
    Postgres(PgPool),
    Memory(Arc<RwLock<MemoryAuthStore>>),
}

impl AuthStore {
    pub fn memory() -> Self {
        Self::Memory(Arc::new(RwLock::new(MemoryAuthStore::default())))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::find_user_by_email_pg(pool, email).await,
            Self::Memory(store) => Ok(store.read().await.find_user_by_email(email)),
        }
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::find_user_by_id_pg(pool, user_id).await,
            Self::Memory(store) => Ok(store.read().await.users.get(&user_id).cloned()),
        }
    }

    pub async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::create_user_pg(pool, email, hashed_password).await,
            Self::Memory(store) => store.write().await.create_user(email, hashed_password),
        }
    }

    pub async fn update_user_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => {
                postgres::update_user_credentials_pg(pool, user_id, email, hashed_password).await
            }
            Self::Memory(store) => {
                store.write().await.update_user_credentials(user_id, email, hashed_password)
            }
        }
    }

    pub async fn set_chirpy_red(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::set_chirpy_red_pg(pool, user_id).await,
            Self::Memory(store) => Ok(store.write().await.set_chirpy_red(user_id)),
        }
    }

    pub async fn insert_refresh_token(&self, token: NewRefreshToken) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pool) => postgres::insert_refresh_token_pg(pool, &token).await,
            Self::Memory(store) => store.write().await.insert_refresh_token(token),
        }
    }

    pub async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => postgres::find_refresh_token_pg(pool, token).await,
            Self::Memory(store) => Ok(store.read().await.refresh_tokens.get(token).cloned()),
        }
    }

    /// Stamps `revoked_at` unless the row is already revoked, in which case
    /// the original timestamp is kept. Returns `None` for unknown tokens.
    pub async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        match self {
            Self::Postgres(pool) => {
                postgres::mark_refresh_token_revoked_pg(pool, token, revoked_at).await
            }
            Self::Memory(store) => {
                Ok(store.write().await.mark_refresh_token_revoked(token, revoked_at))
            }
        }
    }

    /// Deletes every user and, through the cascade, every refresh token.
    pub async fn reset(&self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pool) => postgres::reset_pg(pool).await,
            Self::Memory(store) => {
                let mut guard = store.write().await;
                guard.users.clear();
                guard.refresh_tokens.clear();
                Ok(())
            }
        }
    }
}

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewRefreshToken, RefreshTokenRecord, StoreError, UserRecord};

const UNIQUE_VIOLATION: &str = "23505";

pub(super) async fn find_user_by_email_pg(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>, StoreError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, hashed_password, is_chirpy_red, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)
}

pub(super) async fn find_user_by_id_pg(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserRecord>, StoreError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, hashed_password, is_chirpy_red, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)
}

pub(super) async fn create_user_pg(
    pool: &PgPool,
    email: &str,
    hashed_password: &str,
) -> Result<UserRecord, StoreError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        INSERT INTO users (email, hashed_password)
        VALUES ($1, $2)
        RETURNING id, email, hashed_password, is_chirpy_red, created_at, updated_at
        "#,
    )
    .bind(email)
    .bind(hashed_password)
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)
}

pub(super) async fn update_user_credentials_pg(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
    hashed_password: &str,
) -> Result<Option<UserRecord>, StoreError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        UPDATE users
        SET email = $2, hashed_password = $3, updated_at = now()
        WHERE id = $1
        RETURNING id, email, hashed_password, is_chirpy_red, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(hashed_password)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)
}

pub(super) async fn set_chirpy_red_pg(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserRecord>, StoreError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        UPDATE users
        SET is_chirpy_red = TRUE, updated_at = now()
        WHERE id = $1
        RETURNING id, email, hashed_password, is_chirpy_red, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)
}

pub(super) async fn insert_refresh_token_pg(
    pool: &PgPool,
    token: &NewRefreshToken,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (token, user_id, created_at, updated_at, expires_at, revoked_at)
        VALUES ($1, $2, $3, $3, $4, NULL)
        "#,
    )
    .bind(&token.token)
    .bind(token.user_id)
    .bind(token.created_at)
    .bind(token.expires_at)
    .execute(pool)
    .await
    .context("failed to insert refresh token")?;

    Ok(())
}

pub(super) async fn find_refresh_token_pg(
    pool: &PgPool,
    token: &str,
) -> Result<Option<RefreshTokenRecord>, StoreError> {
    sqlx::query_as::<_, RefreshTokenRecord>(
        r#"
        SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
        FROM refresh_tokens
        WHERE token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)
}

pub(super) async fn mark_refresh_token_revoked_pg(
    pool: &PgPool,
    token: &str,
    revoked_at: DateTime<Utc>,
) -> Result<Option<RefreshTokenRecord>, StoreError> {
    sqlx::query_as::<_, RefreshTokenRecord>(
        r#"
        UPDATE refresh_tokens
        SET revoked_at = COALESCE(revoked_at, $2),
            updated_at = CASE WHEN revoked_at IS NULL THEN $2 ELSE updated_at END
        WHERE token = $1
        RETURNING token, user_id, created_at, updated_at, expires_at, revoked_at
        "#,
    )
    .bind(token)
    .bind(revoked_at)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_error)
}

pub(super) async fn reset_pg(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM users")
        .execute(pool)
        .await
        .context("failed to reset users table")?;

    Ok(())
}

fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::EmailTaken;
        }
    }

    StoreError::Internal(error.into())
}

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chirpy_common::types::{CredentialsRequest, UserProfile};

use super::ApiState;
use crate::{auth::middleware::AuthenticatedUser, error::ChirpyError, validation::ValidatedJson};

pub async fn create_user(
    State(state): State<ApiState>,
    ValidatedJson(payload): ValidatedJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ChirpyError> {
    let profile = state.sessions.register(&payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Replaces the caller's email and password. Requires a bearer access token.
pub async fn update_user(
    State(state): State<ApiState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(payload): ValidatedJson<CredentialsRequest>,
) -> Result<Json<UserProfile>, ChirpyError> {
    let profile = state
        .sessions
        .update_credentials(user.user_id, &payload.email, &payload.password)
        .await?;
    Ok(Json(profile))
}

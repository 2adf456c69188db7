use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chirpy_common::types::{LoginRequest, LoginResponse, RefreshResponse};

use super::ApiState;
use crate::{error::ChirpyError, validation::ValidatedJson};

pub async fn login(
    State(state): State<ApiState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ChirpyError> {
    let outcome =
        state.sessions.login(&payload.email, &payload.password, payload.expires_in_seconds).await?;

    Ok(Json(LoginResponse {
        user: outcome.user,
        token: outcome.access_token,
        refresh_token: outcome.refresh_token,
    }))
}

pub async fn refresh(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ChirpyError> {
    let grant = state.sessions.refresh(&headers).await?;
    Ok(Json(RefreshResponse { token: grant.token }))
}

pub async fn revoke(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<StatusCode, ChirpyError> {
    state.sessions.revoke(&headers).await?;
    Ok(StatusCode::NO_CONTENT)
}

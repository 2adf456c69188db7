use axum::{extract::State, http::StatusCode};

use super::ApiState;
use crate::{
    config::Platform,
    error::{ChirpyError, ErrorCode},
};

/// Deletes every user and refresh token. Refused outside the dev platform.
pub async fn reset(State(state): State<ApiState>) -> Result<StatusCode, ChirpyError> {
    if state.platform != Platform::Dev {
        tracing::warn!("reset refused outside the dev platform");
        return Err(ChirpyError::new(
            ErrorCode::AuthForbidden,
            "reset is only allowed on the dev platform",
        ));
    }

    state.sessions.reset().await?;
    Ok(StatusCode::OK)
}

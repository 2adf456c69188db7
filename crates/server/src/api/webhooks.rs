// Payment provider ("Polka") callbacks.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chirpy_common::types::WebhookRequest;

use super::ApiState;
use crate::{
    auth::headers::{api_key_matches, extract_api_key},
    error::{ChirpyError, ErrorCode},
    validation::ValidatedJson,
};

/// Rejects webhook calls that do not carry the configured API key: 401 when
/// the key is absent, 403 when it does not match.
pub async fn require_api_key(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let presented = match extract_api_key(request.headers()) {
        Ok(key) => key,
        Err(error) => {
            tracing::debug!(%error, "webhook rejected");
            return ChirpyError::new(ErrorCode::AuthInvalidToken, "missing API key").into_response();
        }
    };

    let authorized = state
        .polka_key
        .as_deref()
        .is_some_and(|expected| api_key_matches(presented, expected));
    if !authorized {
        tracing::warn!("webhook rejected: API key mismatch");
        return ChirpyError::from_code(ErrorCode::AuthForbidden).into_response();
    }

    next.run(request).await
}

/// Acknowledges every well-formed event; only `user.upgraded` has an effect.
pub async fn polka_webhook(
    State(state): State<ApiState>,
    ValidatedJson(payload): ValidatedJson<WebhookRequest>,
) -> Result<StatusCode, ChirpyError> {
    if !payload.is_user_upgraded() {
        tracing::debug!(event = %payload.event, "ignoring webhook event");
        return Ok(StatusCode::NO_CONTENT);
    }

    state.sessions.upgrade_user(payload.data.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

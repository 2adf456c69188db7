pub mod admin;
pub mod session;
pub mod users;
pub mod webhooks;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{post, put},
    Router,
};

use crate::{
    auth::{middleware::require_bearer_auth, session::SessionError, session::SessionService},
    config::Platform,
    error::{ChirpyError, ErrorCode},
};

#[derive(Clone)]
pub struct ApiState {
    pub sessions: Arc<SessionService>,
    /// Shared secret expected in `X-Api-Key` on webhook calls. `None` refuses
    /// every webhook.
    pub polka_key: Option<Arc<str>>,
    pub platform: Platform,
}

impl ApiState {
    pub fn new(sessions: Arc<SessionService>, polka_key: Option<String>, platform: Platform) -> Self {
        Self { sessions, polka_key: polka_key.map(Arc::from), platform }
    }
}

pub fn router(state: ApiState) -> Router {
    let bearer_layer = middleware::from_fn_with_state(state.sessions.clone(), require_bearer_auth);
    let api_key_layer = middleware::from_fn_with_state(state.clone(), webhooks::require_api_key);

    Router::new()
        .route("/api/users", post(users::create_user))
        .route("/api/users", put(users::update_user).route_layer(bearer_layer))
        .route("/api/login", post(session::login))
        .route("/api/refresh", post(session::refresh))
        .route("/api/revoke", post(session::revoke))
        .route("/api/polka/webhooks", post(webhooks::polka_webhook).route_layer(api_key_layer))
        .route("/admin/reset", post(admin::reset))
        .with_state(state)
}

impl From<SessionError> for ChirpyError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::InvalidCredentials => Self::from_code(ErrorCode::AuthInvalidCredentials),
            SessionError::Unauthorized => Self::from_code(ErrorCode::AuthInvalidToken),
            SessionError::RefreshTokenNotFound => {
                Self::new(ErrorCode::NotFound, "refresh token not found")
            }
            SessionError::EmailTaken => Self::new(ErrorCode::Conflict, "email is already registered"),
            SessionError::UserNotFound => Self::new(ErrorCode::NotFound, "user not found"),
            SessionError::Validation(message) => Self::new(ErrorCode::ValidationFailed, message),
            SessionError::Internal(error) => {
                tracing::error!(error = ?error, "session api internal error");
                Self::from_code(ErrorCode::InternalError)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{router, ApiState};
    use crate::{
        auth::{
            headers::API_KEY_HEADER,
            session::tests::{test_service, test_service_with_store},
        },
        config::Platform,
        store::AuthStore,
    };

    pub(crate) const POLKA_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

    pub(crate) fn test_app(platform: Platform) -> Router {
        router(ApiState::new(Arc::new(test_service()), Some(POLKA_KEY.into()), platform))
    }

    pub(crate) fn test_app_with_store(store: AuthStore) -> Router {
        let sessions = Arc::new(test_service_with_store(store));
        router(ApiState::new(sessions, Some(POLKA_KEY.into()), Platform::Production))
    }

    pub(crate) struct Call<'a> {
        pub method: &'a str,
        pub uri: &'a str,
        pub bearer: Option<&'a str>,
        pub api_key: Option<&'a str>,
        pub body: Option<Value>,
    }

    impl<'a> Call<'a> {
        pub(crate) fn new(method: &'a str, uri: &'a str) -> Self {
            Self { method, uri, bearer: None, api_key: None, body: None }
        }

        pub(crate) fn bearer(mut self, token: &'a str) -> Self {
            self.bearer = Some(token);
            self
        }

        pub(crate) fn api_key(mut self, key: &'a str) -> Self {
            self.api_key = Some(key);
            self
        }

        pub(crate) fn json(mut self, body: Value) -> Self {
            self.body = Some(body);
            self
        }
    }

    /// Sends one request and returns the status with the raw body bytes.
    pub(crate) async fn send_raw(app: &Router, call: Call<'_>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(call.method).uri(call.uri);
        if let Some(token) = call.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(key) = call.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let body = match call.body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).expect("request should build"))
            .await
            .expect("request should return a response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        (status, bytes.to_vec())
    }

    pub(crate) async fn send(app: &Router, call: Call<'_>) -> (StatusCode, Value) {
        let (status, bytes) = send_raw(app, call).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

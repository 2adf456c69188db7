use crate::{
    auth::session::SessionService,
    error::{ChirpyError, ErrorCode},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Identity resolved from a valid bearer access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: uuid::Uuid,
}

pub async fn require_bearer_auth(
    State(sessions): State<Arc<SessionService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match sessions.authenticate(request.headers()) {
        Ok(user_id) => user_id,
        Err(_) => return ChirpyError::from_code(ErrorCode::AuthInvalidToken).into_response(),
    };

    request.extensions_mut().insert(AuthenticatedUser { user_id });

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::{require_bearer_auth, AuthenticatedUser};
    use crate::auth::jwt::AccessTokenCodec;
    use crate::auth::session::tests::{test_service, TEST_SECRET};
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{header::AUTHORIZATION, Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use chrono::Utc;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn protected_app() -> Router {
        Router::new()
            .route(
                "/protected",
                get(|Extension(user): Extension<AuthenticatedUser>| async move {
                    user.user_id.to_string()
                }),
            )
            .layer(middleware::from_fn_with_state(Arc::new(test_service()), require_bearer_auth))
    }

    async fn call(authorization: Option<String>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }

        let response = protected_app()
            .oneshot(builder.body(Body::empty()).expect("request should build"))
            .await
            .expect("request should return a response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn rejects_requests_without_bearer_token() {
        let (status, _) = call(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_requests_with_invalid_bearer_token() {
        let (status, _) = call(Some("Bearer invalid-token".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn every_token_failure_produces_the_same_body() {
        let codec = AccessTokenCodec::new(TEST_SECRET).expect("codec should initialize");
        let expired = codec
            .issue_at(Uuid::new_v4(), 1, Utc::now().timestamp() - 100)
            .expect("token should be issued")
            .token;

        let (_, missing) = call(None).await;
        let (_, garbage) = call(Some("Bearer garbage".into())).await;
        let (_, lapsed) = call(Some(format!("Bearer {expired}"))).await;
        let (_, scheme) = call(Some("Token abc".into())).await;

        assert_eq!(missing, garbage);
        assert_eq!(missing, lapsed);
        assert_eq!(missing, scheme);
    }

    #[tokio::test]
    async fn injects_authenticated_user_for_valid_bearer_token() {
        let codec = AccessTokenCodec::new(TEST_SECRET).expect("codec should initialize");
        let user_id = Uuid::new_v4();
        let token = codec.issue(user_id, 3600).expect("token should be issued").token;

        let (status, body) = call(Some(format!("Bearer {token}"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user_id.to_string().into_bytes());
    }
}

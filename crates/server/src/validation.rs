// JSON body extraction with envelope-shaped rejections.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{ChirpyError, ErrorCode};

/// Maximum REST request body in bytes (64 KiB). Every body this server
/// accepts is a handful of short strings.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// A JSON body extractor that answers with `VALIDATION_FAILED` instead of
/// axum's plain-text rejections. Bodies over the size limit get
/// `PAYLOAD_TOO_LARGE`.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => {
                let (code, message, details) = classify_json_rejection(&rejection);
                Err(ChirpyError::new(code, message)
                    .with_details(details)
                    .into_response())
            }
        }
    }
}

fn classify_json_rejection(rejection: &JsonRejection) -> (ErrorCode, String, serde_json::Value) {
    if let JsonRejection::BytesRejection(e) = rejection {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return (
                ErrorCode::PayloadTooLarge,
                ErrorCode::PayloadTooLarge.default_message().to_string(),
                serde_json::json!({ "kind": "too_large" }),
            );
        }
    }

    let (message, details) = match rejection {
        JsonRejection::JsonDataError(e) => (
            format!("invalid JSON payload: {}", e.body_text()),
            serde_json::json!({ "kind": "data_error" }),
        ),
        JsonRejection::JsonSyntaxError(_) => (
            "malformed JSON".to_string(),
            serde_json::json!({ "kind": "syntax_error" }),
        ),
        JsonRejection::MissingJsonContentType(_) => (
            "expected Content-Type: application/json".to_string(),
            serde_json::json!({ "kind": "missing_content_type" }),
        ),
        JsonRejection::BytesRejection(_) => (
            "request body could not be read".to_string(),
            serde_json::json!({ "kind": "body_error" }),
        ),
        other => (
            format!("request body error: {other}"),
            serde_json::json!({ "kind": "unknown" }),
        ),
    };
    (ErrorCode::ValidationFailed, message, details)
}

#[cfg(test)]
mod tests {
    use super::ValidatedJson;
    use axum::{
        body::{to_bytes, Body},
        extract::DefaultBodyLimit,
        http::{header::CONTENT_TYPE, Request, StatusCode},
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Payload {
        email: String,
    }

    fn app() -> Router {
        Router::new().route(
            "/echo",
            post(|ValidatedJson(payload): ValidatedJson<Payload>| async move { payload.email }),
        )
    }

    async fn send(content_type: Option<&str>, body: &'static str) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri("/echo");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        let response = app()
            .oneshot(builder.body(Body::from(body)).expect("request should build"))
            .await
            .expect("request should return a response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn accepts_valid_json() {
        let (status, _) = send(Some("application/json"), r#"{"email":"a@b.com"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejections_use_the_error_envelope() {
        for (content_type, body, kind) in [
            (Some("application/json"), "{not json", "syntax_error"),
            (Some("application/json"), r#"{"password":"x"}"#, "data_error"),
            (None, r#"{"email":"a@b.com"}"#, "missing_content_type"),
        ] {
            let (status, body) = send(content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
            assert_eq!(body["error"]["details"]["kind"], kind);
        }
    }

    #[tokio::test]
    async fn oversized_json_is_payload_too_large() {
        let oversized = format!(r#"{{"email":"{}"}}"#, "a".repeat(64));
        let response = app()
            .layer(DefaultBodyLimit::max(16))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(oversized))
                    .expect("request should build"),
            )
            .await
            .expect("request should return a response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        let body: Value = serde_json::from_slice(&bytes).expect("body should be json");
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(body["error"]["details"]["kind"], "too_large");
    }
}

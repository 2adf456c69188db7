// Credential extraction from request headers.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Header the payment provider uses to authenticate webhook calls.
pub const API_KEY_HEADER: &str = "x-api-key";

const BEARER_SCHEME: &str = "Bearer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("credential header is missing")]
    MissingHeader,

    #[error("credential header is malformed")]
    MalformedHeader,
}

/// Returns the token from `Authorization: Bearer <token>`.
///
/// The value must split on a single space into exactly two parts, the first
/// being the literal `Bearer`. The token is returned verbatim.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, HeaderError> {
    let value = headers.get(AUTHORIZATION).ok_or(HeaderError::MissingHeader)?;
    let value = value.to_str().map_err(|_| HeaderError::MalformedHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(HeaderError::MalformedHeader),
    }
}

/// Returns the raw value of the webhook API key header.
pub fn extract_api_key(headers: &HeaderMap) -> Result<&str, HeaderError> {
    let value = headers.get(API_KEY_HEADER).ok_or(HeaderError::MissingHeader)?;
    let value = value.to_str().map_err(|_| HeaderError::MalformedHeader)?;
    if value.is_empty() {
        return Err(HeaderError::MissingHeader);
    }
    Ok(value)
}

/// Compares an API key against the configured secret without leaking how
/// many leading bytes matched. Both sides are reduced to SHA-256 digests
/// first, so the comparison always walks 32 bytes whatever the key lengths.
pub fn api_key_matches(presented: &str, expected: &str) -> bool {
    let presented: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
    let expected: [u8; 32] = Sha256::digest(expected.as_bytes()).into();
    presented.iter().zip(&expected).fold(0u8, |diff, (left, right)| diff | (left ^ right)) == 0
}

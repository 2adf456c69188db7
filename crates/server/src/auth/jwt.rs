use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use anyhow::{bail, Context};
use chrono::Utc;
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Issuer stamped into every access token. Tokens of any other class signed
/// with the same secret are refused.
pub const ACCESS_TOKEN_ISSUER: &str = "chirpy-access";

/// Access token lifetime ceiling when configuration does not override it.
pub const DEFAULT_ACCESS_TTL_CEILING_SECS: i64 = 60 * 60;

/// Lifetime of access tokens minted from a refresh token.
pub const REFRESHED_ACCESS_TTL_SECS: i64 = 60 * 60;

const MIN_SECRET_LEN: usize = 32;
const MICROS_PER_SEC: i64 = 1_000_000;

/// `iat` and `exp` are NumericDate values with microsecond fractions, so two
/// tokens for the same user issued within one second still differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccessTokenClaims {
    iss: String,
    sub: String,
    iat: f64,
    exp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessTokenError {
    #[error("access token signature is invalid")]
    InvalidSignature,

    #[error("access token claims are malformed")]
    MalformedClaims,

    #[error("access token was issued for a different token class")]
    WrongIssuer,

    #[error("access token has expired")]
    Expired,

    #[error("access token subject is not a user id")]
    MalformedSubject,
}

/// A freshly signed access token and the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedAccessToken {
    pub token: String,
    /// Unix seconds, rounded down.
    pub expires_at: i64,
}

/// Substitutes `ceiling` for absent, non-positive or oversized requests.
pub fn clamp_access_ttl(requested: Option<i64>, ceiling: i64) -> i64 {
    match requested {
        Some(ttl) if ttl > 0 && ttl <= ceiling => ttl,
        _ => ceiling,
    }
}

#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_ceiling_secs: i64,
    /// Last issue time handed out by `issue`, in Unix microseconds.
    last_issued_micros: Arc<AtomicI64>,
}

impl AccessTokenCodec {
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        Self::with_ttl_ceiling(secret, DEFAULT_ACCESS_TTL_CEILING_SECS)
    }

    /// Every token this codec issues lives at most `ttl_ceiling_secs`.
    pub fn with_ttl_ceiling(secret: &str, ttl_ceiling_secs: i64) -> anyhow::Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            bail!("jwt secret must be at least {MIN_SECRET_LEN} characters long");
        }
        if ttl_ceiling_secs <= 0 {
            bail!("access token ttl ceiling must be positive, got {ttl_ceiling_secs}");
        }

        // Issuer, expiry and subject are checked by hand after the signature
        // so each failure keeps its own error kind.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_ceiling_secs,
            last_issued_micros: Arc::new(AtomicI64::new(0)),
        })
    }

    pub fn ttl_ceiling_secs(&self) -> i64 {
        self.ttl_ceiling_secs
    }

    /// Signs a token for `user_id`. A `ttl_secs` that is not positive or
    /// exceeds the ceiling is replaced by the ceiling.
    pub fn issue(&self, user_id: Uuid, ttl_secs: i64) -> anyhow::Result<IssuedAccessToken> {
        self.sign(user_id, ttl_secs, self.next_issue_micros())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: Uuid,
        ttl_secs: i64,
        issued_at: i64,
    ) -> anyhow::Result<IssuedAccessToken> {
        self.sign(user_id, ttl_secs, issued_at.saturating_mul(MICROS_PER_SEC))
    }

    /// Wall-clock microseconds, bumped past the previous issue if the clock
    /// has not advanced.
    fn next_issue_micros(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .last_issued_micros
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        now.max(previous.saturating_add(1))
    }

    fn sign(
        &self,
        user_id: Uuid,
        ttl_secs: i64,
        issued_at_micros: i64,
    ) -> anyhow::Result<IssuedAccessToken> {
        let ttl_secs = clamp_access_ttl(Some(ttl_secs), self.ttl_ceiling_secs);
        let expires_at_micros =
            issued_at_micros.saturating_add(ttl_secs.saturating_mul(MICROS_PER_SEC));

        let claims = AccessTokenClaims {
            iss: ACCESS_TOKEN_ISSUER.to_owned(),
            sub: user_id.to_string(),
            iat: micros_to_numeric_date(issued_at_micros),
            exp: micros_to_numeric_date(expires_at_micros),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("failed to encode access token")?;

        Ok(IssuedAccessToken { token, expires_at: expires_at_micros.div_euclid(MICROS_PER_SEC) })
    }

    pub fn validate(&self, token: &str) -> Result<Uuid, AccessTokenError> {
        self.validate_at_micros(token, Utc::now().timestamp_micros())
    }

    pub(crate) fn validate_at(&self, token: &str, now: i64) -> Result<Uuid, AccessTokenError> {
        self.validate_at_micros(token, now.saturating_mul(MICROS_PER_SEC))
    }

    fn validate_at_micros(&self, token: &str, now_micros: i64) -> Result<Uuid, AccessTokenError> {
        // A header that does not parse means the token did not come from us.
        decode_header(token).map_err(|_| AccessTokenError::InvalidSignature)?;

        let claims = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|error| match error.kind() {
                ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
                    AccessTokenError::MalformedClaims
                }
                _ => AccessTokenError::InvalidSignature,
            })?
            .claims;

        if claims.iss != ACCESS_TOKEN_ISSUER {
            return Err(AccessTokenError::WrongIssuer);
        }
        if micros_to_numeric_date(now_micros) >= claims.exp {
            return Err(AccessTokenError::Expired);
        }

        Uuid::parse_str(&claims.sub).map_err(|_| AccessTokenError::MalformedSubject)
    }
}

fn micros_to_numeric_date(micros: i64) -> f64 {
    micros as f64 / MICROS_PER_SEC as f64
}

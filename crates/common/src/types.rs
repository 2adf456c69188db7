// Request and response bodies for the Chirpy account and session API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Webhook event that promotes a user to Chirpy Red.
pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

/// Public view of a user account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/users` and `PUT /api/users`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Requested access token lifetime. Absent, zero or oversized values
    /// fall back to the server ceiling.
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

/// Successful login: the profile flattened alongside both tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserProfile,
    pub token: String,
    pub refresh_token: String,
}

/// Body returned by `POST /api/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookData {
    pub user_id: Uuid,
}

/// Body of `POST /api/polka/webhooks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookRequest {
    pub event: String,
    pub data: WebhookData,
}

impl WebhookRequest {
    pub fn is_user_upgraded(&self) -> bool {
        self.event == USER_UPGRADED_EVENT
    }
}

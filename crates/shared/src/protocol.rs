use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{MessageId, UserId};

fn is_empty(value: &str) -> bool {
    value.is_empty()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub bio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by both login and register. The token becomes the
/// `Authorization: Token <token>` header for every protected call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
}

/// Profile shape shared by `/api/me/` and `/api/profiles/?search=`.
/// `user` is the owning account's numeric identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// One element of the bulk message feed. Every field is optional on the
/// wire: the feed is best-effort and shape validation happens at the
/// ingestion boundary, not during deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageWire {
    #[serde(default)]
    pub id: Option<MessageId>,
    #[serde(default)]
    pub sender: Option<i64>,
    #[serde(default)]
    pub receiver: Option<i64>,
    #[serde(default)]
    pub sender_username: Option<String>,
    #[serde(default)]
    pub receiver_username: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub receiver: UserId,
    pub text: String,
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth token issued by the tracking service.
///
/// This is the exact shape of the token endpoint response, so the record on disk
/// can be handed back to the API without translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds, counted from `created_at`
    pub expires_in: i64,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    /// Unix timestamp (seconds) at which the token was issued
    pub created_at: i64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Credential {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.created_at, 0)
            .map(|issued| issued + Duration::seconds(self.expires_in))
    }

    /// A credential with an unrepresentable expiry is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

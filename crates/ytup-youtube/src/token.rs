//! The OAuth token record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An OAuth token set as obtained from the token endpoint.
///
/// This is the record persisted by the token cache; all fields must
/// round-trip exactly through serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens, when the
    /// provider issued one.
    pub refresh_token: Option<String>,

    /// The token type, normally `Bearer`.
    pub token_type: String,

    /// When the access token expires. `None` means the provider gave no
    /// expiry and the token is assumed valid.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Creates a token from token-endpoint response data.
    ///
    /// The stored expiry is `expires_in` seconds from now minus a
    /// 60-second buffer so the token is renewed before it actually lapses.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        token_type: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let expires_at =
            expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(60));

        Self {
            access_token: access_token.into(),
            refresh_token,
            token_type: token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Replaces the access token after a refresh, keeping the refresh
    /// token.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at =
            expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(60));
    }
}

//! YouTube client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// OAuth 2.0 credentials for YouTube API access.
///
/// Users must provide their own OAuth client ID and secret from their
/// provider's developer console; there is no shared application identity.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Validates that both fields are present.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the YouTube client.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// The provider's authorization endpoint (sent to the browser).
    pub auth_url: String,

    /// The provider's token endpoint (code exchange and refresh).
    pub token_url: String,

    /// Base URL for Data API calls.
    pub api_base: String,

    /// Base URL for media uploads.
    pub upload_base: String,

    /// OAuth scopes to request. Order matters: the scope list is part
    /// of the token cache key.
    pub scopes: Vec<String>,

    /// Whether to cache the OAuth token on disk between runs.
    pub cache_token: bool,

    /// Override for the token cache directory.
    ///
    /// Defaults to the platform's per-user cache directory.
    pub cache_dir: Option<PathBuf>,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,
}

impl YouTubeConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default authorization endpoint.
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// Default token endpoint.
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Default Data API base URL.
    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/youtube/v3";

    /// Default upload base URL.
    pub const DEFAULT_UPLOAD_BASE: &'static str = "https://www.googleapis.com/upload/youtube/v3";

    /// Creates a new configuration with the given credentials and the
    /// default endpoints and scopes.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            auth_url: Self::DEFAULT_AUTH_URL.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            upload_base: Self::DEFAULT_UPLOAD_BASE.to_string(),
            scopes: Self::default_scopes(),
            cache_token: true,
            cache_dir: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("ytup/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// The full set of scopes the tool needs for uploads, deletes and
    /// playlist management.
    pub fn default_scopes() -> Vec<String> {
        vec![
            "https://www.googleapis.com/auth/youtube".to_string(),
            "https://www.googleapis.com/auth/youtubepartner".to_string(),
            "https://www.googleapis.com/auth/youtube.force-ssl".to_string(),
        ]
    }

    /// Sets the authorization endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Sets the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the Data API base URL.
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Sets the upload base URL.
    pub fn with_upload_base(mut self, url: impl Into<String>) -> Self {
        self.upload_base = url.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Enables or disables on-disk token caching.
    pub fn with_cache_token(mut self, enabled: bool) -> Self {
        self.cache_token = enabled;
        self
    }

    /// Overrides the token cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        Ok(())
    }
}

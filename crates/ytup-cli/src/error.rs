//! Client error types.

use std::fmt;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// OAuth credentials could not be resolved.
    Credentials(String),
    /// The YouTube library reported an error.
    YouTube(ytup_youtube::YouTubeError),
    /// Invalid command-line usage.
    Usage(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials(msg) => write!(f, "credentials error: {}", msg),
            Self::YouTube(err) => write!(f, "{}", err),
            Self::Usage(msg) => write!(f, "usage error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::YouTube(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ytup_youtube::YouTubeError> for ClientError {
    fn from(err: ytup_youtube::YouTubeError) -> Self {
        Self::YouTube(err)
    }
}

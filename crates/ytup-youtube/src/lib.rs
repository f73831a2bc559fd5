//! YouTube Data API access with cached OAuth authorization.
//!
//! This crate implements everything between a set of OAuth client
//! credentials and an authorized YouTube Data API client:
//!
//! - [`cache`]: on-disk token cache keyed by credentials and scopes
//! - [`oauth`]: interactive authorization-code flow over a loopback
//!   redirect, plus code exchange and refresh
//! - [`client`]: the Data API client (uploads, deletes, playlists)
//! - [`service`]: the composition of the three
//!
//! # Example
//!
//! ```no_run
//! use ytup_youtube::{OAuthCredentials, YouTubeConfig, YouTubeService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = YouTubeConfig::new(OAuthCredentials::new("client-id", "client-secret"));
//! let service = YouTubeService::connect(config).await?;
//! let playlists = service.client().list_my_playlists().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod service;
pub mod token;

pub use cache::{CacheError, TokenCache};
pub use client::{Playlist, PlaylistItem, Video, VideoMetadata, YouTubeClient};
pub use config::{OAuthCredentials, YouTubeConfig};
pub use error::{ErrorCode, YouTubeError, YouTubeResult};
pub use oauth::OAuthClient;
pub use service::YouTubeService;
pub use token::Token;

//! Authorized YouTube service.
//!
//! Ties the token cache, the OAuth flow, and the API client together:
//! a cached token is used when valid, refreshed when expired, and the
//! interactive browser flow runs only when neither works.

use tracing::{debug, info, warn};

use crate::cache::{CacheError, TokenCache};
use crate::client::YouTubeClient;
use crate::config::YouTubeConfig;
use crate::error::{YouTubeError, YouTubeResult};
use crate::oauth::OAuthClient;
use crate::token::Token;

/// An authorized YouTube service.
#[derive(Debug)]
pub struct YouTubeService {
    client: YouTubeClient,
}

impl YouTubeService {
    /// Obtains an authorized service, running the interactive flow if no
    /// cached or refreshable token is available.
    ///
    /// Cache misses of any kind (no file, caching disabled, unreadable
    /// file) degrade to interactive authorization; a cache write failure
    /// after authorization is logged and the token is still used.
    pub async fn connect(config: YouTubeConfig) -> YouTubeResult<Self> {
        config
            .validate()
            .map_err(YouTubeError::configuration)?;

        let cache = match config.cache_dir {
            Some(ref dir) => TokenCache::with_root(dir.clone(), config.cache_token),
            None => TokenCache::new(config.cache_token),
        };
        let oauth = OAuthClient::new(&config);

        let token = obtain_token(&config, &cache, &oauth).await?;
        let client = YouTubeClient::new(&config, token.access_token.clone());

        Ok(Self { client })
    }

    /// The underlying API client.
    pub fn client(&self) -> &YouTubeClient {
        &self.client
    }
}

/// Produces a usable token: cached, refreshed, or freshly authorized.
async fn obtain_token(
    config: &YouTubeConfig,
    cache: &TokenCache,
    oauth: &OAuthClient,
) -> YouTubeResult<Token> {
    match cache.load(&config.credentials, &config.scopes) {
        Ok(mut token) => {
            if !token.is_expired() {
                info!("using cached token");
                return Ok(token);
            }

            if let Some(refresh_token) = token.refresh_token.clone() {
                match oauth.refresh(&refresh_token).await {
                    Ok((access_token, expires_in)) => {
                        token.update_access_token(access_token, expires_in);
                        if let Err(e) = cache.save(&config.credentials, &config.scopes, &token)
                        {
                            warn!("failed to cache refreshed token: {}", e);
                        }
                        return Ok(token);
                    }
                    Err(e) => {
                        warn!(
                            "token refresh failed, falling back to interactive authorization: {}",
                            e
                        );
                    }
                }
            } else {
                debug!("cached token expired and has no refresh token");
            }
        }
        Err(CacheError::Disabled) => debug!("token caching disabled"),
        Err(CacheError::NotFound) => debug!("no cached token for these credentials"),
        Err(e) => warn!("ignoring unusable token cache: {}", e),
    }

    let token = oauth.authorize(&config.scopes).await?;
    if let Err(e) = cache.save(&config.credentials, &config.scopes, &token) {
        warn!("failed to cache token: {}", e);
    }
    Ok(token)
}

//! On-disk OAuth token cache.
//!
//! Tokens are cached per (client id, client secret, scope list) so that
//! switching credentials or scopes never reuses a stale grant. The cache
//! is a location discriminator, not a security boundary: the key only
//! needs to be deterministic and change-sensitive.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::OAuthCredentials;
use crate::token::Token;

/// Filename prefix for cached tokens.
const CACHE_FILE_PREFIX: &str = "ytup-token";

/// Errors from the token cache.
///
/// Every `load` failure is recoverable: callers fall through to the
/// interactive authorization flow. `Write` failures are logged and the
/// in-memory token is still used for the current run.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No cached token exists for these credentials.
    #[error("no cached token")]
    NotFound,

    /// Token caching has been disabled by configuration.
    #[error("token caching is disabled")]
    Disabled,

    /// The cache file exists but does not deserialize.
    #[error("cached token is corrupt")]
    Corrupt(#[source] serde_json::Error),

    /// The cache file could not be read or written.
    #[error("token cache I/O failed")]
    Io(#[source] io::Error),
}

/// File-backed token cache keyed by client identity and scopes.
#[derive(Debug)]
pub struct TokenCache {
    root: PathBuf,
    enabled: bool,
}

impl TokenCache {
    /// Creates a cache rooted at the platform's per-user cache directory.
    ///
    /// On platforms without a known cache directory the current working
    /// directory is used instead; degraded but functional.
    pub fn new(enabled: bool) -> Self {
        let root = match dirs::cache_dir() {
            Some(dir) => dir,
            None => {
                warn!("no user cache directory on this platform, caching tokens in .");
                PathBuf::from(".")
            }
        };
        Self { root, enabled }
    }

    /// Creates a cache rooted at an explicit directory.
    pub fn with_root(root: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            root: root.into(),
            enabled,
        }
    }

    /// Returns the cache file path for the given credentials and scopes.
    pub fn cache_file(&self, credentials: &OAuthCredentials, scopes: &[String]) -> PathBuf {
        let name = format!("{}{}", CACHE_FILE_PREFIX, cache_key(credentials, scopes));
        self.root.join(urlencoding::encode(&name).into_owned())
    }

    /// Loads the cached token for these credentials.
    ///
    /// Fails with [`CacheError::Disabled`] when caching is off,
    /// [`CacheError::NotFound`] when no file exists, and
    /// [`CacheError::Corrupt`] when the file does not parse. All of
    /// these mean the same thing to callers: authorize interactively.
    pub fn load(
        &self,
        credentials: &OAuthCredentials,
        scopes: &[String],
    ) -> Result<Token, CacheError> {
        if !self.enabled {
            return Err(CacheError::Disabled);
        }

        let path = self.cache_file(credentials, scopes);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CacheError::NotFound,
            _ => CacheError::Io(e),
        })?;

        // Deserialize from bytes so any garbage, valid UTF-8 or not,
        // classifies as Corrupt rather than Io.
        let token: Token = serde_json::from_slice(&bytes).map_err(CacheError::Corrupt)?;
        debug!(path = %path.display(), "loaded cached token");
        Ok(token)
    }

    /// Saves a token for these credentials.
    ///
    /// The file is written to a temporary sibling and renamed into place
    /// so a crash mid-write can only lose the new token, never leave a
    /// half-written record. No-op when caching is disabled.
    pub fn save(
        &self,
        credentials: &OAuthCredentials,
        scopes: &[String],
        token: &Token,
    ) -> Result<(), CacheError> {
        if !self.enabled {
            debug!("token caching disabled, not persisting token");
            return Ok(());
        }

        let path = self.cache_file(credentials, scopes);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(CacheError::Io)?;
        }

        let content = serde_json::to_string_pretty(token)
            .map_err(|e| CacheError::Io(io::Error::other(e)))?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content).map_err(CacheError::Io)?;
        fs::rename(&temp_path, &path).map_err(CacheError::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&path, perms);
        }

        debug!(path = %path.display(), "saved token to cache");
        Ok(())
    }
}

/// Computes the cache key for a credential set.
///
/// FNV-1a over client id, client secret, and the space-joined scope
/// list. Scope order is significant.
fn cache_key(credentials: &OAuthCredentials, scopes: &[String]) -> u32 {
    let mut hash = fnv1a(FNV_OFFSET, credentials.client_id.as_bytes());
    hash = fnv1a(hash, credentials.client_secret.as_bytes());
    fnv1a(hash, scopes.join(" ").as_bytes())
}

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a(mut hash: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> OAuthCredentials {
        OAuthCredentials::new("cid", "csec")
    }

    fn scopes() -> Vec<String> {
        vec!["scopeA".to_string(), "scopeB".to_string()]
    }

    fn sample_token() -> Token {
        Token::new("tok1", Some("ref1".to_string()), None, Some(3600))
    }

    #[test]
    fn cache_key_is_deterministic() {
        let a = cache_key(&creds(), &scopes());
        let b = cache_key(&creds(), &scopes());
        assert_eq!(a, b);

        // Stable across process restarts: pin the value.
        assert_eq!(cache_key(&creds(), &scopes()), {
            let mut h = fnv1a(FNV_OFFSET, b"cid");
            h = fnv1a(h, b"csec");
            fnv1a(h, b"scopeA scopeB")
        });
    }

    #[test]
    fn cache_key_sensitivity() {
        let base = cache_key(&creds(), &scopes());

        let other_id = cache_key(&OAuthCredentials::new("cid2", "csec"), &scopes());
        assert_ne!(base, other_id);

        let other_secret = cache_key(&OAuthCredentials::new("cid", "csec2"), &scopes());
        assert_ne!(base, other_secret);

        let fewer_scopes = cache_key(&creds(), &["scopeA".to_string()]);
        assert_ne!(base, fewer_scopes);

        let reordered = cache_key(&creds(), &["scopeB".to_string(), "scopeA".to_string()]);
        assert_ne!(base, reordered);
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::with_root(tmp.path(), true);
        let token = sample_token();

        cache.save(&creds(), &scopes(), &token).unwrap();

        // A second cache instance over the same root sees the same file,
        // like a fresh process would.
        let cache2 = TokenCache::with_root(tmp.path(), true);
        let loaded = cache2.load(&creds(), &scopes()).unwrap();
        assert_eq!(loaded, token);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::with_root(tmp.path(), true);
        assert!(matches!(
            cache.load(&creds(), &scopes()),
            Err(CacheError::NotFound)
        ));
    }

    #[test]
    fn disabled_cache_always_misses() {
        let tmp = tempfile::tempdir().unwrap();

        // Populate the file with an enabled cache first.
        TokenCache::with_root(tmp.path(), true)
            .save(&creds(), &scopes(), &sample_token())
            .unwrap();

        let disabled = TokenCache::with_root(tmp.path(), false);
        assert!(matches!(
            disabled.load(&creds(), &scopes()),
            Err(CacheError::Disabled)
        ));
    }

    #[test]
    fn disabled_cache_save_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::with_root(tmp.path(), false);
        cache.save(&creds(), &scopes(), &sample_token()).unwrap();
        assert!(!cache.cache_file(&creds(), &scopes()).exists());
    }

    #[test]
    fn corrupt_cache_file_is_reported_as_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::with_root(tmp.path(), true);
        let path = cache.cache_file(&creds(), &scopes());

        // Garbage that is not valid UTF-8.
        fs::write(&path, b"\x00garbage\xff").unwrap();
        assert!(matches!(
            cache.load(&creds(), &scopes()),
            Err(CacheError::Corrupt(_))
        ));

        // Garbage that is valid UTF-8 but not a token record.
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            cache.load(&creds(), &scopes()),
            Err(CacheError::Corrupt(_))
        ));
    }

    #[test]
    fn different_credentials_use_different_files() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::with_root(tmp.path(), true);

        let a = cache.cache_file(&creds(), &scopes());
        let b = cache.cache_file(&OAuthCredentials::new("other", "csec"), &scopes());
        assert_ne!(a, b);
    }
}

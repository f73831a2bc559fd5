//! OAuth credential resolution.
//!
//! Each credential comes from a command-line flag when given, otherwise
//! from a file next to the working directory (`clientid.dat` and
//! `clientsecret.dat` by default, matching the flag defaults).

use std::fs;
use std::path::Path;

use ytup_youtube::OAuthCredentials;

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};

/// Resolves the OAuth credentials from flags and fallback files.
pub fn resolve(cli: &Cli) -> ClientResult<OAuthCredentials> {
    let client_id = resolve_one("client ID", cli.client_id.as_deref(), &cli.client_id_file)?;
    let client_secret = resolve_one("client secret", cli.secret.as_deref(), &cli.secret_file)?;
    Ok(OAuthCredentials::new(client_id, client_secret))
}

/// Resolves a single credential: flag value first, file second.
fn resolve_one(what: &str, flag: Option<&str>, file: &Path) -> ClientResult<String> {
    if let Some(value) = flag {
        let value = value.trim();
        if value.is_empty() {
            return Err(ClientError::Credentials(format!("{} flag is empty", what)));
        }
        return Ok(value.to_string());
    }

    let content = fs::read_to_string(file).map_err(|e| {
        ClientError::Credentials(format!(
            "no {} flag given and {} is unreadable: {}",
            what,
            file.display(),
            e
        ))
    })?;

    let content = content.trim();
    if content.is_empty() {
        return Err(ClientError::Credentials(format!(
            "{} file {} is empty",
            what,
            file.display()
        )));
    }
    Ok(content.to_string())
}

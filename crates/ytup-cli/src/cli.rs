//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// ytup - Upload videos to YouTube from the command line
#[derive(Debug, Parser)]
#[command(name = "ytup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// OAuth client ID (overrides --client-id-file)
    #[arg(long, env = "YTUP_CLIENT_ID")]
    pub client_id: Option<String>,

    /// File containing the OAuth client ID
    #[arg(long, default_value = "clientid.dat")]
    pub client_id_file: PathBuf,

    /// OAuth client secret (overrides --secret-file)
    #[arg(long, env = "YTUP_SECRET")]
    pub secret: Option<String>,

    /// File containing the OAuth client secret
    #[arg(long, default_value = "clientsecret.dat")]
    pub secret_file: PathBuf,

    /// Cache the OAuth token on disk between runs
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub cache_token: bool,

    // --- Upload options ---
    /// Video file to upload
    #[arg(long)]
    pub filename: Option<PathBuf>,

    /// Video title
    #[arg(long, default_value = "Test Title")]
    pub title: String,

    /// Video description
    #[arg(long, default_value = "Test Description")]
    pub description: String,

    /// Numeric video category ID
    #[arg(long, default_value = "22")]
    pub category: String,

    /// Comma-separated list of video keywords
    #[arg(long, default_value = "")]
    pub keywords: String,

    /// Video privacy status
    #[arg(long, value_enum, default_value_t = Privacy::Public)]
    pub privacy: Privacy,

    /// Playlist to add the uploaded video to (created if missing)
    #[arg(long)]
    pub playlist: Option<String>,

    // --- Delete option ---
    /// Delete this video ID instead of uploading
    #[arg(long)]
    pub delete_id: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,
}

/// Privacy status of a video or playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Privacy {
    /// Visible to everyone.
    Public,
    /// Reachable only via direct link.
    Unlisted,
    /// Visible only to the owner.
    Private,
}

impl Privacy {
    /// The API value for this privacy status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_behavior() {
        let cli = Cli::parse_from(["ytup"]);
        assert!(cli.cache_token);
        assert_eq!(cli.title, "Test Title");
        assert_eq!(cli.description, "Test Description");
        assert_eq!(cli.category, "22");
        assert_eq!(cli.privacy, Privacy::Public);
        assert_eq!(cli.client_id_file, PathBuf::from("clientid.dat"));
        assert_eq!(cli.secret_file, PathBuf::from("clientsecret.dat"));
    }

    #[test]
    fn cache_token_can_be_disabled() {
        let cli = Cli::parse_from(["ytup", "--cache-token", "false"]);
        assert!(!cli.cache_token);
    }

    #[test]
    fn privacy_values() {
        let cli = Cli::parse_from(["ytup", "--privacy", "unlisted"]);
        assert_eq!(cli.privacy.as_str(), "unlisted");
    }
}

//! ytup CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use ytup_cli::cli::Cli;
use ytup_cli::error::{ClientError, ClientResult};
use ytup_cli::{actions, credentials};
use ytup_youtube::{YouTubeConfig, YouTubeService};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // Decide what to do before going through authorization.
    enum Action {
        Delete(String),
        Upload(std::path::PathBuf),
    }

    let action = match (&cli.delete_id, &cli.filename) {
        (Some(id), _) => Action::Delete(id.clone()),
        (None, Some(path)) => Action::Upload(path.clone()),
        (None, None) => {
            return Err(ClientError::Usage(
                "either --filename (upload) or --delete-id (delete) is required".to_string(),
            ));
        }
    };

    let credentials = credentials::resolve(&cli)?;
    let config = YouTubeConfig::new(credentials).with_cache_token(cli.cache_token);

    let service = YouTubeService::connect(config)
        .await
        .map_err(ClientError::YouTube)?;

    match action {
        Action::Delete(id) => {
            actions::delete(service.client(), &id, cli.playlist.as_deref()).await
        }
        Action::Upload(path) => actions::upload(service.client(), &cli, &path).await,
    }
}

//! The `ytup` command-line interface.
//!
//! Uploads a video file to YouTube, optionally filing it into a
//! playlist, or deletes a previously uploaded video.

pub mod actions;
pub mod cli;
pub mod credentials;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};

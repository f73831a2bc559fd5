//! Upload and delete orchestration.

use std::path::Path;

use tracing::info;
use ytup_youtube::client::Playlist;
use ytup_youtube::{VideoMetadata, YouTubeClient};

use crate::cli::Cli;
use crate::error::ClientResult;

/// Uploads the video described by the CLI flags and files it into the
/// requested playlist, if any.
pub async fn upload(client: &YouTubeClient, cli: &Cli, path: &Path) -> ClientResult<()> {
    let metadata = VideoMetadata {
        title: cli.title.clone(),
        description: cli.description.clone(),
        category_id: cli.category.clone(),
        tags: parse_keywords(&cli.keywords),
        privacy: cli.privacy.as_str().to_string(),
    };

    let video = client.upload_video(&metadata, path).await?;
    println!("Upload successful! Video ID: {}", video.id);

    if let Some(ref playlist_title) = cli.playlist {
        let playlist =
            find_or_create_playlist(client, playlist_title, cli.privacy.as_str()).await?;
        client.add_video_to_playlist(&playlist.id, &video.id).await?;
        println!("Video added to playlist '{}'", playlist_title);
    }

    Ok(())
}

/// Deletes a video. When a playlist title is given, the video is
/// detached from that playlist first so no dangling entry is left
/// behind.
pub async fn delete(
    client: &YouTubeClient,
    video_id: &str,
    playlist_title: Option<&str>,
) -> ClientResult<()> {
    if let Some(title) = playlist_title {
        let playlists = client.list_my_playlists().await?;
        match find_playlist_by_title(&playlists, title) {
            Some(playlist) => {
                for item in client.list_playlist_items(&playlist.id).await? {
                    if item.snippet.resource_id.video_id.as_deref() == Some(video_id) {
                        info!(
                            playlist = %playlist.snippet.title,
                            "removing video from playlist before delete"
                        );
                        client.delete_playlist_item(&item.id).await?;
                    }
                }
            }
            None => info!(title = %title, "playlist not found, nothing to detach"),
        }
    }

    client.delete_video(video_id).await?;
    println!("Video ID {} deleted", video_id);
    Ok(())
}

/// Finds a playlist by exact title, creating it when absent.
///
/// The lookup always runs against a freshly fetched playlist list.
async fn find_or_create_playlist(
    client: &YouTubeClient,
    title: &str,
    privacy: &str,
) -> ClientResult<Playlist> {
    let playlists = client.list_my_playlists().await?;
    if let Some(existing) = find_playlist_by_title(&playlists, title) {
        return Ok(existing.clone());
    }

    info!(title = %title, "playlist not found, creating it");
    Ok(client.create_playlist(title, privacy).await?)
}

/// Finds a playlist by exact title match.
fn find_playlist_by_title<'a>(playlists: &'a [Playlist], title: &str) -> Option<&'a Playlist> {
    playlists.iter().find(|p| p.snippet.title == title)
}

/// Splits the comma-separated keywords flag into tags.
fn parse_keywords(keywords: &str) -> Vec<String> {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytup_youtube::client::PlaylistSnippet;

    fn playlist(id: &str, title: &str) -> Playlist {
        Playlist {
            id: id.to_string(),
            snippet: PlaylistSnippet {
                title: title.to_string(),
                description: String::new(),
            },
            content_details: None,
        }
    }

    #[test]
    fn keywords_are_split_and_trimmed() {
        assert_eq!(
            parse_keywords("rust, video ,demo"),
            vec!["rust", "video", "demo"]
        );
    }

    #[test]
    fn empty_keywords_produce_no_tags() {
        assert!(parse_keywords("").is_empty());
        assert!(parse_keywords(" , ,").is_empty());
    }

    #[test]
    fn playlist_lookup_is_exact() {
        let playlists = vec![playlist("pl1", "Demos"), playlist("pl2", "demos")];

        assert_eq!(
            find_playlist_by_title(&playlists, "Demos").map(|p| p.id.as_str()),
            Some("pl1")
        );
        assert_eq!(
            find_playlist_by_title(&playlists, "demos").map(|p| p.id.as_str()),
            Some("pl2")
        );
        assert!(find_playlist_by_title(&playlists, "Missing").is_none());
    }
}

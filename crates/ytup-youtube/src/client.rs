//! YouTube Data API v3 client.
//!
//! This module provides a low-level HTTP client for the YouTube Data
//! API, handling authentication, request building, and response
//! parsing. Uploads use the resumable upload protocol: an initiation
//! request returns a session URI and the media bytes are sent to that
//! URI in a second request.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::YouTubeConfig;
use crate::error::{YouTubeError, YouTubeResult};

/// Page size for list requests.
const PAGE_SIZE: u32 = 50;

/// YouTube Data API client.
#[derive(Debug)]
pub struct YouTubeClient {
    http_client: reqwest::Client,
    access_token: String,
    api_base: String,
    upload_base: String,
}

impl YouTubeClient {
    /// Creates a new YouTube client with the given access token.
    pub fn new(config: &YouTubeConfig, access_token: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            access_token: access_token.into(),
            api_base: config.api_base.clone(),
            upload_base: config.upload_base.clone(),
        }
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Uploads a video file with the given metadata.
    ///
    /// Two round-trips: the initiation request carries the metadata and
    /// returns a session URI in the `Location` header, then the media
    /// bytes are PUT to that URI. The response to the PUT is the created
    /// video resource.
    pub async fn upload_video(
        &self,
        metadata: &VideoMetadata,
        path: &Path,
    ) -> YouTubeResult<Video> {
        let file_size = tokio::fs::metadata(path)
            .await
            .map_err(|e| {
                YouTubeError::bad_request(format!("cannot stat {}: {}", path.display(), e))
                    .with_source(e)
            })?
            .len();

        let session_uri = self.initiate_upload(metadata, file_size).await?;
        debug!("resumable upload session established");

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            YouTubeError::bad_request(format!("cannot read {}: {}", path.display(), e))
                .with_source(e)
        })?;

        let response = self
            .http_client
            .put(&session_uri)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "video/*")
            .body(bytes)
            .send()
            .await
            .map_err(map_request_error)?;

        let response = check_response(response, "video upload").await?;
        let video: Video = parse_body(response).await?;

        info!(video_id = %video.id, "video uploaded");
        Ok(video)
    }

    /// Starts a resumable upload session and returns the session URI.
    async fn initiate_upload(
        &self,
        metadata: &VideoMetadata,
        file_size: u64,
    ) -> YouTubeResult<String> {
        let url = format!(
            "{}/videos?uploadType=resumable&part=snippet,status",
            self.upload_base
        );

        let body = UploadRequest {
            snippet: UploadSnippet {
                title: &metadata.title,
                description: &metadata.description,
                category_id: &metadata.category_id,
                // An empty tag list is omitted from the request body.
                tags: (!metadata.tags.is_empty()).then_some(metadata.tags.as_slice()),
            },
            status: UploadStatus {
                privacy_status: &metadata.privacy,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", file_size)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        let response = check_response(response, "upload initiation").await?;

        response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                YouTubeError::invalid_response(
                    "no Location header in upload initiation response",
                )
            })
    }

    /// Deletes a video by ID.
    pub async fn delete_video(&self, video_id: &str) -> YouTubeResult<()> {
        let url = format!("{}/videos", self.api_base);

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .query(&[("id", video_id)])
            .send()
            .await
            .map_err(map_request_error)?;

        check_response(response, "video delete").await?;
        info!(video_id = %video_id, "video deleted");
        Ok(())
    }

    /// Lists all playlists owned by the authorized channel.
    ///
    /// Walks every page; each call starts from a fresh, empty result.
    pub async fn list_my_playlists(&self) -> YouTubeResult<Vec<Playlist>> {
        let url = format!("{}/playlists", self.api_base);
        let page_size = PAGE_SIZE.to_string();
        let mut playlists = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("part", "snippet,contentDetails"),
                    ("mine", "true"),
                    ("maxResults", page_size.as_str()),
                ]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(map_request_error)?;
            let response = check_response(response, "playlist list").await?;
            let page: PlaylistListResponse = parse_body(response).await?;

            playlists.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} playlists", playlists.len());
        Ok(playlists)
    }

    /// Creates a new playlist.
    pub async fn create_playlist(
        &self,
        title: &str,
        privacy: &str,
    ) -> YouTubeResult<Playlist> {
        let url = format!("{}/playlists?part=snippet,status", self.api_base);

        let body = serde_json::json!({
            "snippet": { "title": title },
            "status": { "privacyStatus": privacy },
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        let response = check_response(response, "playlist create").await?;
        let playlist: Playlist = parse_body(response).await?;

        info!(playlist_id = %playlist.id, title = %title, "playlist created");
        Ok(playlist)
    }

    /// Adds a video to a playlist.
    pub async fn add_video_to_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> YouTubeResult<PlaylistItem> {
        let url = format!("{}/playlistItems?part=snippet", self.api_base);

        let body = serde_json::json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id,
                },
            },
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        let response = check_response(response, "playlist item insert").await?;
        let item: PlaylistItem = parse_body(response).await?;

        info!(playlist_id = %playlist_id, video_id = %video_id, "video added to playlist");
        Ok(item)
    }

    /// Lists all items of a playlist, walking every page.
    pub async fn list_playlist_items(
        &self,
        playlist_id: &str,
    ) -> YouTubeResult<Vec<PlaylistItem>> {
        let url = format!("{}/playlistItems", self.api_base);
        let page_size = PAGE_SIZE.to_string();
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("part", "snippet"),
                    ("playlistId", playlist_id),
                    ("maxResults", page_size.as_str()),
                ]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(map_request_error)?;
            let response = check_response(response, "playlist item list").await?;
            let page: PlaylistItemListResponse = parse_body(response).await?;

            items.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(items)
    }

    /// Removes an item from a playlist.
    pub async fn delete_playlist_item(&self, item_id: &str) -> YouTubeResult<()> {
        let url = format!("{}/playlistItems", self.api_base);

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .query(&[("id", item_id)])
            .send()
            .await
            .map_err(map_request_error)?;

        check_response(response, "playlist item delete").await?;
        debug!(item_id = %item_id, "playlist item removed");
        Ok(())
    }
}

/// Maps a transport-level request failure.
fn map_request_error(e: reqwest::Error) -> YouTubeError {
    if e.is_timeout() {
        YouTubeError::network("request timeout")
    } else if e.is_connect() {
        YouTubeError::network(format!("connection failed: {}", e))
    } else {
        YouTubeError::network(format!("request failed: {}", e))
    }
}

/// Returns the response if it succeeded, otherwise a classified error.
async fn check_response(
    response: reqwest::Response,
    context: &str,
) -> YouTubeResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    Err(classify_status(status, retry_after, context, &body))
}

/// Maps an API error status to the error taxonomy.
fn classify_status(
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    context: &str,
    body: &str,
) -> YouTubeError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            YouTubeError::authentication("access token expired or invalid")
        }
        reqwest::StatusCode::FORBIDDEN => {
            YouTubeError::authorization(format!("{}: access denied: {}", context, body))
        }
        reqwest::StatusCode::NOT_FOUND => {
            YouTubeError::not_found(format!("{}: resource not found", context))
        }
        reqwest::StatusCode::BAD_REQUEST => {
            YouTubeError::bad_request(format!("{}: {}", context, body))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => YouTubeError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        s => YouTubeError::server(format!("{}: API error ({}): {}", context, s, body)),
    }
}

/// Reads and deserializes a response body.
async fn parse_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> YouTubeResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| YouTubeError::network(format!("failed to read response: {}", e)))?;

    serde_json::from_str(&body)
        .map_err(|e| YouTubeError::invalid_response(format!("failed to parse response: {}", e)))
}

/// Metadata for a video upload.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    /// Video title.
    pub title: String,
    /// Video description.
    pub description: String,
    /// Numeric YouTube category ID.
    pub category_id: String,
    /// Keyword tags.
    pub tags: Vec<String>,
    /// Privacy status: `public`, `unlisted`, or `private`.
    pub privacy: String,
}

/// Metadata body of the upload initiation request.
#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    snippet: UploadSnippet<'a>,
    status: UploadStatus<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadSnippet<'a> {
    title: &'a str,
    description: &'a str,
    category_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadStatus<'a> {
    privacy_status: &'a str,
}

/// A video resource as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// The video ID.
    pub id: String,
    /// The video snippet, when the response includes it.
    pub snippet: Option<VideoSnippet>,
}

/// Snippet of a video resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    /// The video title.
    pub title: String,
    /// The video description.
    #[serde(default)]
    pub description: String,
}

/// Response from the playlists.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistListResponse {
    #[serde(default)]
    items: Vec<Playlist>,
    next_page_token: Option<String>,
}

/// A playlist resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// The playlist ID.
    pub id: String,
    /// The playlist snippet.
    pub snippet: PlaylistSnippet,
    /// Item count and related details, when requested.
    pub content_details: Option<PlaylistContentDetails>,
}

/// Snippet of a playlist resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSnippet {
    /// The playlist title.
    pub title: String,
    /// The playlist description.
    #[serde(default)]
    pub description: String,
}

/// Content details of a playlist resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistContentDetails {
    /// Number of items in the playlist.
    #[serde(default)]
    pub item_count: u32,
}

/// Response from the playlistItems.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

/// A playlist item resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    /// The playlist item ID (distinct from the video ID).
    pub id: String,
    /// The playlist item snippet.
    pub snippet: PlaylistItemSnippet,
}

/// Snippet of a playlist item resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    /// The playlist this item belongs to.
    pub playlist_id: String,
    /// The resource the item points at.
    pub resource_id: ResourceId,
    /// The item title.
    #[serde(default)]
    pub title: String,
}

/// Reference to the resource inside a playlist item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    /// The resource kind, `youtube#video` for videos.
    pub kind: String,
    /// The video ID, when the item is a video.
    pub video_id: Option<String>,
}

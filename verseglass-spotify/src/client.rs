//! Remote playback client over the Spotify Web API.

use crate::credentials::CredentialHandle;
use crate::error::ApiError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use verseglass_core::{PlaybackState, TrackInfo};

/// Base URL for the Spotify Web API
const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Timeout for playback API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The remote playback interface the polling loop depends on.
#[async_trait]
pub trait PlaybackApi: Send + Sync {
    /// Fetch the current playback snapshot; `None` when nothing is active.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] classifying the failure for the caller's
    /// retry policy.
    async fn currently_playing(&self) -> Result<Option<PlaybackState>, ApiError>;

    /// Fetch the head of the play queue; `None` when the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] classifying the failure for the caller's
    /// retry policy.
    async fn queue_head(&self) -> Result<Option<TrackInfo>, ApiError>;
}

/// Concrete client reading the bearer token from the shared credential
/// handle on every request.
pub struct SpotifyClient {
    http: reqwest::Client,
    credentials: CredentialHandle,
    base_url: String,
}

impl SpotifyClient {
    /// Create a new client against the production API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(credentials: CredentialHandle) -> Result<Self, ApiError> {
        Self::with_base_url(credentials, API_BASE_URL)
    }

    /// Create a client against a custom base URL (tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_base_url(
        credentials: CredentialHandle,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            credentials,
            base_url: base_url.into(),
        })
    }

    /// Issue a GET and translate the status into the error taxonomy.
    /// Returns `None` for 204/empty responses.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        let token = {
            let guard = self.credentials.read().await;
            match guard.as_ref() {
                Some(credentials) => credentials.access_token.clone(),
                None => return Err(ApiError::Unauthorized),
            }
        };

        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
            return Err(ApiError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Ok(None);
        }
        let parsed = serde_json::from_str(&body).map_err(|e| {
            debug!("Unexpected playback response body: {e}");
            ApiError::Api {
                status: status.as_u16(),
            }
        })?;
        Ok(Some(parsed))
    }
}

#[async_trait]
impl PlaybackApi for SpotifyClient {
    async fn currently_playing(&self) -> Result<Option<PlaybackState>, ApiError> {
        let response: Option<CurrentlyPlayingResponse> =
            self.get_json("/me/player/currently-playing").await?;

        Ok(response.map(|playing| {
            let track = playing.item.map(PlayableItem::into_track_info);
            let progress = playing.progress_ms.map(Duration::from_millis);
            PlaybackState::new(track, progress, playing.is_playing)
        }))
    }

    async fn queue_head(&self) -> Result<Option<TrackInfo>, ApiError> {
        let response: Option<QueueResponse> = self.get_json("/me/player/queue").await?;

        Ok(response.and_then(|queue| {
            queue
                .queue
                .into_iter()
                .next()
                .map(PlayableItem::into_track_info)
        }))
    }
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlayingResponse {
    is_playing: bool,
    progress_ms: Option<u64>,
    item: Option<PlayableItem>,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    #[serde(default)]
    queue: Vec<PlayableItem>,
}

/// Track or episode object from the player endpoints.
#[derive(Debug, Deserialize)]
struct PlayableItem {
    id: Option<String>,
    name: String,
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<NamedObject>,
    album: Option<AlbumObject>,
    /// Present for podcast episodes instead of artists/album
    show: Option<NamedObject>,
}

#[derive(Debug, Deserialize)]
struct NamedObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    name: String,
    #[serde(default)]
    images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

impl PlayableItem {
    fn into_track_info(self) -> TrackInfo {
        let artists: Vec<String> = if self.artists.is_empty() {
            // Episode: credit the show
            self.show.map(|s| s.name).into_iter().collect()
        } else {
            self.artists.into_iter().map(|a| a.name).collect()
        };

        let (album, artwork) = match self.album {
            Some(album) => {
                let artwork = album.images.into_iter().next().map(|i| i.url);
                (album.name, artwork)
            }
            None => ("Podcast".to_string(), None),
        };

        let mut track = TrackInfo::new(
            self.id.unwrap_or_default(),
            self.name,
            artists,
            album,
            Duration::from_millis(self.duration_ms),
        );
        if let Some(url) = artwork {
            track = track.with_artwork_url(url);
        }
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_item_mapping() {
        let json = r#"{
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Song",
            "duration_ms": 213000,
            "artists": [{"name": "First"}, {"name": "Second"}],
            "album": {"name": "Album", "images": [{"url": "https://img/large"}, {"url": "https://img/small"}]}
        }"#;
        let item: PlayableItem = serde_json::from_str(json).unwrap();
        let track = item.into_track_info();

        assert_eq!(track.id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.artists, vec!["First", "Second"]);
        assert_eq!(track.album, "Album");
        assert_eq!(track.duration, Duration::from_millis(213_000));
        assert_eq!(track.artwork_url.as_deref(), Some("https://img/large"));
    }

    #[test]
    fn test_episode_item_mapping() {
        let json = r#"{
            "id": "ep1",
            "name": "Episode",
            "duration_ms": 1800000,
            "show": {"name": "The Show"}
        }"#;
        let item: PlayableItem = serde_json::from_str(json).unwrap();
        let track = item.into_track_info();

        assert_eq!(track.artists, vec!["The Show"]);
        assert_eq!(track.album, "Podcast");
        assert!(track.artwork_url.is_none());
    }

    #[test]
    fn test_currently_playing_without_item() {
        let json = r#"{"is_playing": false, "progress_ms": null, "item": null}"#;
        let playing: CurrentlyPlayingResponse = serde_json::from_str(json).unwrap();
        assert!(!playing.is_playing);
        assert!(playing.item.is_none());
        assert!(playing.progress_ms.is_none());
    }

    #[test]
    fn test_empty_queue() {
        let queue: QueueResponse = serde_json::from_str(r#"{"queue": []}"#).unwrap();
        assert!(queue.queue.is_empty());
    }
}

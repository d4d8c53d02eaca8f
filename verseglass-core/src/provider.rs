use crate::error::CoreError;
use crate::lyrics::LyricLine;
use async_trait::async_trait;

/// Query parameters for fetching lyrics
#[derive(Debug, Clone)]
pub struct LyricsQuery {
    /// Track name
    pub track_name: String,
    /// Artist name
    pub artist_name: String,
    /// Album name (optional)
    pub album_name: Option<String>,
    /// Track duration in seconds (for matching)
    pub duration_secs: Option<u32>,
}

impl LyricsQuery {
    /// Create a new lyrics query
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            album_name: None,
            duration_secs: None,
        }
    }

    /// Set album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album_name = Some(album.into());
        self
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

/// Trait for synced-lyrics providers.
///
/// A provider that finds no usable transcript returns an empty vec; errors
/// are reserved for lookup failures (network, bad responses).
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Fetch the synced transcript for a query.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup itself fails; "no lyrics" is the
    /// empty vec, not an error.
    async fn fetch(&self, query: &LyricsQuery) -> Result<Vec<LyricLine>, CoreError>;
}

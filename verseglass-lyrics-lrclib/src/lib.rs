//! LRCLIB.net lyrics provider.

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info};
use verseglass_core::{parse_synced, CoreError, LyricLine, LyricsProvider, LyricsQuery};

const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// LRCLIB.net lyrics provider
pub struct LrclibProvider {
    client: ClientWithMiddleware,
}

impl LrclibProvider {
    /// Create a new LRCLIB provider with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("Verseglass/0.1 (https://github.com/verseglass)")
            .build()?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client })
    }

    fn search_url(query: &LyricsQuery) -> String {
        let mut url = format!(
            "{}/search?artist_name={}&track_name={}",
            LRCLIB_API_URL,
            urlencoding::encode(&query.artist_name),
            urlencoding::encode(&query.track_name)
        );
        if let Some(ref album) = query.album_name {
            let _ = write!(url, "&album_name={}", urlencoding::encode(album));
        }
        url
    }
}

/// Search result from the LRCLIB API. The API returns additional fields
/// (trackName, albumName, duration) that we don't use; serde ignores
/// unknown fields by default.
#[derive(Debug, Deserialize)]
struct LrclibResult {
    id: i64,
    instrumental: bool,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

/// Parse the first result's synced transcript. Only the top-ranked result
/// is consulted; a first result without synced lyrics (or an instrumental)
/// means no lyrics for this query, later results are not a substitute.
fn lines_from_results(results: Vec<LrclibResult>) -> Vec<LyricLine> {
    let Some(first) = results.into_iter().next() else {
        return Vec::new();
    };
    if first.instrumental {
        debug!("First result id {} is instrumental", first.id);
        return Vec::new();
    }
    match first.synced_lyrics.filter(|s| !s.trim().is_empty()) {
        Some(synced) => {
            info!("Using LRCLIB result id {}", first.id);
            parse_synced(&synced)
        }
        None => Vec::new(),
    }
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<Vec<LyricLine>, CoreError> {
        info!(
            "Searching LRCLIB for: {} - {}",
            query.artist_name, query.track_name
        );

        let url = Self::search_url(query);
        debug!("LRCLIB GET: {url}");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("LRCLIB returned status: {status}"),
            });
        }

        let results: Vec<LrclibResult> = response.json().await.map_err(|e| {
            CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("malformed LRCLIB response: {e}"),
            }
        })?;

        info!("LRCLIB returned {} result(s)", results.len());
        Ok(lines_from_results(results))
    }
}

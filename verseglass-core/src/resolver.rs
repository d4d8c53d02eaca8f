//! Lyrics resolver that watches for track changes and fetches transcripts.

use crate::engine::SyncEngine;
use crate::events::{EventBus, PlayerEvent};
use crate::lyrics::LyricLine;
use crate::playback::TrackInfo;
use crate::provider::{LyricsProvider, LyricsQuery};
use crate::time::DurationExt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background task resolving synced lyrics per track change.
///
/// Providers are tried in order; every failure mode degrades to an empty
/// transcript, which is a valid "no lyrics" state rather than an error.
pub struct LyricsResolver {
    engine: Arc<SyncEngine>,
    bus: EventBus,
    providers: Vec<Box<dyn LyricsProvider>>,
    cancel_token: CancellationToken,
}

impl LyricsResolver {
    /// Create a new lyrics resolver
    pub fn new(
        engine: Arc<SyncEngine>,
        bus: EventBus,
        providers: Vec<Box<dyn LyricsProvider>>,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            engine,
            bus,
            providers,
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start the resolver in a background task. The event subscription is
    /// taken before spawning so no track change between `start` and the
    /// task's first poll is missed.
    #[must_use]
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let rx = self.bus.subscribe();
        tokio::spawn(async move {
            self.run(rx).await;
        })
    }

    async fn run(&self, mut rx: broadcast::Receiver<PlayerEvent>) {
        info!("Starting lyrics resolver");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Lyrics resolver shutting down");
                    break;
                }
                event = rx.recv() => {
                    match event {
                        Ok(PlayerEvent::TrackChanged(track)) => {
                            let lines = self.resolve(&track).await;
                            self.engine.set_lyrics(&track.id, lines).await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        _ => {
                            // Other events (or Lagged) are not ours to handle
                        }
                    }
                }
            }
        }
    }

    /// Resolve the transcript for a track, degrading to empty on any failure.
    async fn resolve(&self, track: &TrackInfo) -> Vec<LyricLine> {
        // Primary artist only: multi-artist strings hurt search accuracy
        let artist = track.artists.first().cloned().unwrap_or_default();
        let query = LyricsQuery::new(&track.name, artist)
            .with_album(&track.album)
            .with_duration(track.duration.as_secs_u32());

        for provider in &self.providers {
            match provider.fetch(&query).await {
                Ok(lines) if !lines.is_empty() => {
                    info!(
                        "Found synced lyrics from {} ({} lines) for {} - {}",
                        provider.name(),
                        lines.len(),
                        track.artists_joined(),
                        track.name
                    );
                    return lines;
                }
                Ok(_) => {
                    debug!("Provider {} returned no lyrics", provider.name());
                }
                Err(e) => {
                    warn!("Provider {} failed: {}", provider.name(), e);
                }
            }
        }

        info!(
            "No synced lyrics found for {} - {}",
            track.artists_joined(),
            track.name
        );
        Vec::new()
    }
}

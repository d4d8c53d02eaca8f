//! The playback sync engine.
//!
//! Combines authoritative polled snapshots with a local high-frequency
//! ticker to drive displayed progress, active-lyric-line selection, and the
//! next-track banner. All mutable state lives in a single [`SyncState`]
//! written only by the engine task; the ticker is a pure extrapolation of
//! the last authoritative sample and never initiates network calls.

use crate::banner::{banner_visible, countdown_progress};
use crate::events::{DisplayEvent, PlayerEvent};
use crate::lyrics::{active_line_index, LyricLine};
use crate::playback::{PlaybackState, TrackInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Engine-internal state. Single writer: only the engine's event handlers
/// mutate it.
#[derive(Debug, Default)]
struct SyncState {
    /// Last authoritative snapshot from the polling loop
    sample: PlaybackState,
    /// Transcript for the current track (empty = no lyrics)
    lines: Vec<LyricLine>,
    /// Active lyric line; `None` = before the first line
    active_line: Option<usize>,
    /// Upcoming track from the queue, if known
    next_track: Option<TrackInfo>,
    /// Whether the next-track banner is currently visible
    banner_visible: bool,
}

/// Engine that maps playback time to display state.
pub struct SyncEngine {
    inner: RwLock<SyncState>,
    display_tx: broadcast::Sender<DisplayEvent>,
    tick_interval: Duration,
    cancel_token: CancellationToken,
}

impl SyncEngine {
    /// Create a new sync engine with the given local ticker interval.
    #[must_use]
    pub fn new(tick_interval: Duration, cancel_token: Option<CancellationToken>) -> Arc<Self> {
        let (display_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            inner: RwLock::new(SyncState::default()),
            display_tx,
            tick_interval,
            cancel_token: cancel_token.unwrap_or_default(),
        })
    }

    /// Subscribe to display events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.display_tx.subscribe()
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start the engine task: consumes player events and runs the local
    /// extrapolation ticker until cancelled.
    #[must_use]
    pub fn start(
        self: Arc<Self>,
        mut events: broadcast::Receiver<PlayerEvent>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("Starting playback sync engine");
            let mut ticker = tokio::time::interval(self.tick_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = self.cancel_token.cancelled() => {
                        info!("Sync engine shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.on_tick().await;
                    }
                    event = events.recv() => {
                        match event {
                            Ok(event) => self.handle_event(event).await,
                            Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(missed)) => {
                                debug!("Sync engine lagged, skipped {missed} events");
                            }
                        }
                    }
                }
            }
        })
    }

    /// Apply one player event to the engine state.
    pub async fn handle_event(&self, event: PlayerEvent) {
        match event {
            PlayerEvent::TrackChanged(track) => self.on_track_changed(track).await,
            PlayerEvent::PlaybackUpdated(state) => self.on_playback_updated(state).await,
            PlayerEvent::PlaybackStopped => self.on_playback_stopped().await,
            PlayerEvent::NextTrackAvailable(track) => {
                self.inner.write().await.next_track = track;
            }
            // Authentication and polling lifecycle events carry no display
            // state; the consumer observes them on the player bus directly.
            _ => {}
        }
    }

    /// Deliver a fetched transcript for a track. Results for a track that is
    /// no longer current are dropped.
    pub async fn set_lyrics(&self, track_id: &str, lines: Vec<LyricLine>) {
        let mut inner = self.inner.write().await;
        let current_id = inner.sample.track.as_ref().map(|t| t.id.as_str());
        if current_id != Some(track_id) {
            debug!("Dropping stale lyrics for superseded track {track_id}");
            return;
        }

        inner.lines = lines;
        inner.active_line = None;
        self.emit(DisplayEvent::LyricsLoaded(inner.lines.clone()));

        let position = inner.sample.extrapolated_position();
        self.select_line(&mut inner, position);
    }

    /// Current extrapolated position, for consumers that pull rather than
    /// subscribe.
    pub async fn current_position(&self) -> Duration {
        self.inner.read().await.sample.extrapolated_position()
    }

    async fn on_track_changed(&self, track: TrackInfo) {
        info!("Track changed: {} - {}", track.artists_joined(), track.name);
        let mut inner = self.inner.write().await;

        let was_visible = inner.banner_visible;
        let was_playing = inner.sample.is_playing;
        inner.lines.clear();
        inner.active_line = None;
        inner.next_track = None;
        inner.banner_visible = false;
        inner.sample = PlaybackState::new(Some(track.clone()), Some(Duration::ZERO), was_playing);

        if was_visible {
            self.emit(DisplayEvent::BannerHidden);
        }
        self.emit(DisplayEvent::TrackStarted(track));
    }

    async fn on_playback_updated(&self, state: PlaybackState) {
        let mut inner = self.inner.write().await;

        // A snapshot without a reported progress keeps the previous
        // extrapolation anchor; only the playing flag is adopted.
        let Some(progress) = state.progress else {
            inner.sample.is_playing = state.is_playing;
            return;
        };

        let duration = state
            .track
            .as_ref()
            .map(|t| t.duration)
            .unwrap_or(Duration::ZERO);
        inner.sample = state;

        // Heartbeat: re-emitted every poll even when nothing changed, so the
        // consumer's clock stays corrected.
        self.emit(DisplayEvent::Progress {
            position: progress,
            duration,
        });

        self.select_line(&mut inner, progress);
        self.update_banner(&mut inner, duration.saturating_sub(progress));
    }

    async fn on_playback_stopped(&self) {
        info!("Playback stopped, clearing display state");
        let mut inner = self.inner.write().await;
        *inner = SyncState::default();
        self.emit(DisplayEvent::PlaybackCleared);
    }

    /// Local ticker: advisory smooth progress between polls. Reads the last
    /// authoritative sample, never mutates it.
    async fn on_tick(&self) {
        let mut inner = self.inner.write().await;
        if !inner.sample.is_playing || inner.sample.track.is_none() {
            return;
        }

        let position = inner.sample.extrapolated_position();
        let duration = inner
            .sample
            .track
            .as_ref()
            .map(|t| t.duration)
            .unwrap_or(Duration::ZERO);

        self.emit(DisplayEvent::Progress { position, duration });
        self.select_line(&mut inner, position);
    }

    /// Re-select the active lyric line; emits only when the index moved.
    fn select_line(&self, inner: &mut SyncState, position: Duration) {
        if inner.lines.is_empty() {
            return;
        }

        let index = active_line_index(&inner.lines, position);
        if index != inner.active_line {
            inner.active_line = index;
            self.emit(DisplayEvent::ActiveLineChanged { index });
        }
    }

    /// Banner transitions, driven only by authoritative updates.
    fn update_banner(&self, inner: &mut SyncState, remaining: Duration) {
        let next_known = inner.next_track.is_some();
        let visible = banner_visible(remaining, next_known, inner.banner_visible);

        if visible && !inner.banner_visible {
            if let Some(next) = inner.next_track.clone() {
                inner.banner_visible = true;
                self.emit(DisplayEvent::BannerShown(next));
            }
        } else if !visible && inner.banner_visible {
            inner.banner_visible = false;
            self.emit(DisplayEvent::BannerHidden);
        }

        if inner.banner_visible {
            self.emit(DisplayEvent::BannerCountdown {
                progress: countdown_progress(remaining),
            });
        }
    }

    fn emit(&self, event: DisplayEvent) {
        let _ = self.display_tx.send(event);
    }
}

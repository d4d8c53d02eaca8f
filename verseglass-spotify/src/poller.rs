//! Playback polling loop: fetches snapshots on a fixed cadence and emits
//! playback events on the shared bus.

use crate::client::PlaybackApi;
use crate::error::ApiError;
use crate::token::TokenManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use verseglass_core::{EventBus, PlayerEvent};

/// Backoff after a rate-limit response without a Retry-After header
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Backoff after a non-auth API error
const API_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Backoff after a network failure
const NETWORK_ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// One spawned polling run and the token that stops it.
struct ActiveRun {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// Polls the playback API and translates snapshots into [`PlayerEvent`]s.
///
/// Each run owns a cancellation token; stopping is cooperative (observed at
/// the top of the next iteration) and every run emits exactly one
/// `PollingStopped` on exit. A restart while the previous run is winding
/// down waits for it to drain first, so runs never overlap.
pub struct PlaybackPoller<A: PlaybackApi> {
    api: Arc<A>,
    tokens: Arc<TokenManager>,
    bus: EventBus,
    poll_interval: Duration,
    current: Mutex<Option<ActiveRun>>,
}

impl<A: PlaybackApi + 'static> PlaybackPoller<A> {
    #[must_use]
    pub fn new(
        api: Arc<A>,
        tokens: Arc<TokenManager>,
        bus: EventBus,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            tokens,
            bus,
            poll_interval,
            current: Mutex::new(None),
        }
    }

    /// Whether a polling run is currently live.
    pub async fn is_polling(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    /// Start a polling run. A no-op while one is already live; a run that
    /// was stopped but has not yet exited is drained first, so its
    /// `PollingStopped` lands before the new run begins.
    pub async fn start_polling(self: Arc<Self>) {
        let mut current = self.current.lock().await;
        if let Some(run) = current.take() {
            if !run.cancel.is_cancelled() && !run.task.is_finished() {
                debug!("Polling already running");
                *current = Some(run);
                return;
            }
            run.cancel.cancel();
            let _ = run.task.await;
        }

        info!("Starting playback polling");
        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let poller = Arc::clone(&self);
        let task = tokio::spawn(async move {
            poller.run(run_cancel).await;
        });
        *current = Some(ActiveRun { cancel, task });
    }

    /// Request the current run to stop; it exits at the next iteration
    /// boundary. A no-op when nothing is running, and idempotent.
    pub async fn stop_polling(&self) {
        if let Some(run) = self.current.lock().await.as_ref() {
            run.cancel.cancel();
        }
    }

    async fn run(&self, cancel: CancellationToken) {
        // Run-local: the first snapshot of every run announces its track as
        // a change.
        let mut last_track_id: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                break;
            }
            if !self.tokens.has_credentials().await {
                info!("No credentials; stopping polling");
                break;
            }

            match self.api.currently_playing().await {
                Ok(Some(state)) => {
                    if let Some(track) = state.track.clone() {
                        if last_track_id.as_deref() != Some(track.id.as_str()) {
                            last_track_id = Some(track.id.clone());
                            info!("Track changed: {} - {}", track.artists_joined(), track.name);
                            self.bus.emit(PlayerEvent::TrackChanged(track));
                            self.announce_next_track().await;
                        }
                        self.bus.emit(PlayerEvent::PlaybackUpdated(state));
                    } else {
                        self.handle_inactive(&mut last_track_id);
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                Ok(None) => {
                    self.handle_inactive(&mut last_track_id);
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(ApiError::Unauthorized) => {
                    if self.tokens.refresh().await.is_err() {
                        warn!("Token refresh failed; stopping polling");
                        break;
                    }
                    // Fresh token; retry immediately
                }
                Err(ApiError::RateLimited { retry_after }) => {
                    let backoff = retry_after.unwrap_or(RATE_LIMIT_BACKOFF);
                    warn!("Rate limited; backing off for {backoff:?}");
                    tokio::time::sleep(backoff).await;
                }
                Err(ApiError::Api { status }) => {
                    warn!("Playback API error (status {status})");
                    tokio::time::sleep(API_ERROR_BACKOFF).await;
                }
                Err(ApiError::Network(e)) => {
                    warn!("Network error while polling: {e}");
                    tokio::time::sleep(NETWORK_ERROR_BACKOFF).await;
                }
            }
        }

        info!("Playback polling stopped");
        self.bus.emit(PlayerEvent::PollingStopped);
    }

    /// Emit `PlaybackStopped` on the transition from active to inactive.
    fn handle_inactive(&self, last_track_id: &mut Option<String>) {
        if last_track_id.take().is_some() {
            info!("Playback stopped");
            self.bus.emit(PlayerEvent::PlaybackStopped);
        }
    }

    /// Look up the queue head for the newly started track. A failed lookup
    /// degrades to an unknown next track rather than an error.
    async fn announce_next_track(&self) {
        let next = match self.api.queue_head().await {
            Ok(next) => next,
            Err(e) => {
                debug!("Queue lookup failed: {e}");
                None
            }
        };
        self.bus.emit(PlayerEvent::NextTrackAvailable(next));
    }
}

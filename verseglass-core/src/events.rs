//! Event taxonomy shared between the authentication layer, the polling loop,
//! the sync engine, and whatever consumer renders the result.

use crate::lyrics::LyricLine;
use crate::playback::{PlaybackState, TrackInfo};
use std::time::Duration;
use tokio::sync::broadcast;

/// Events produced by the token lifecycle and the polling loop.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// Credentials are valid and the session is usable
    Authenticated,
    /// An interactive authorization flow has started
    AuthenticationStarted,
    /// An interactive authorization attempt finished
    AuthenticationFinished {
        success: bool,
        message: Option<String>,
    },
    /// The refresh token was rejected as permanently invalid; a new
    /// interactive flow is required
    ReauthenticationNeeded,
    /// The remote player moved to a different track
    TrackChanged(TrackInfo),
    /// Fresh playback snapshot; emitted every poll cycle while an item is
    /// loaded, even when nothing changed
    PlaybackUpdated(PlaybackState),
    /// The remote player no longer has an active item
    PlaybackStopped,
    /// Queue head after a track change (`None` when the queue is empty or
    /// could not be read)
    NextTrackAvailable(Option<TrackInfo>),
    /// The polling loop has fully stopped
    PollingStopped,
}

/// Events produced by the sync engine for the rendering layer.
#[derive(Debug, Clone)]
pub enum DisplayEvent {
    /// A new track started; lyric and banner state have been reset
    TrackStarted(TrackInfo),
    /// Transcript for the current track (empty when none was found)
    LyricsLoaded(Vec<LyricLine>),
    /// The active lyric line moved; `None` means before the first line
    ActiveLineChanged { index: Option<usize> },
    /// Displayed progress heartbeat, from polls and the local ticker alike
    Progress {
        position: Duration,
        duration: Duration,
    },
    /// The next-track banner became visible
    BannerShown(TrackInfo),
    /// Countdown fill for the visible banner, 0.0 to 1.0
    BannerCountdown { progress: f32 },
    /// The next-track banner was hidden
    BannerHidden,
    /// Playback stopped; all display state has been cleared
    PlaybackCleared,
}

/// Broadcast bus for [`PlayerEvent`]s.
///
/// Cloning shares the underlying channel. Send failures (no live receivers)
/// are ignored, as events are advisory.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Subscribe to player events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit a player event
    pub fn emit(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

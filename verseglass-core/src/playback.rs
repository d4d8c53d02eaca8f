use std::time::{Duration, Instant};

/// Information about a single track, as reported by the remote player.
///
/// Immutable once constructed; two snapshots refer to the same track exactly
/// when their `id` fields are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Stable remote identifier for the track
    pub id: String,
    /// Track name
    pub name: String,
    /// Artist names, in credited order
    pub artists: Vec<String>,
    /// Album name
    pub album: String,
    /// Total track duration
    pub duration: Duration,
    /// Album artwork URL, when the remote provides one
    pub artwork_url: Option<String>,
}

impl TrackInfo {
    /// Create a new track info
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        artists: Vec<String>,
        album: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artists,
            album: album.into(),
            duration,
            artwork_url: None,
        }
    }

    /// Attach an album artwork URL
    #[must_use]
    pub fn with_artwork_url(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    /// All artist names joined for display ("A, B")
    #[must_use]
    pub fn artists_joined(&self) -> String {
        self.artists.join(", ")
    }
}

/// One playback snapshot from the remote player.
///
/// Produced fresh on every poll and never mutated in place. `polled_at`
/// anchors local progress extrapolation between polls.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// Currently loaded track, if any
    pub track: Option<TrackInfo>,
    /// Playback progress at poll time; `None` when the remote did not report it
    pub progress: Option<Duration>,
    /// Whether playback is running (as opposed to paused)
    pub is_playing: bool,
    /// When this snapshot was taken
    pub polled_at: Instant,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            track: None,
            progress: None,
            is_playing: false,
            polled_at: Instant::now(),
        }
    }
}

impl PlaybackState {
    /// Create a new playback snapshot anchored at the current instant
    #[must_use]
    pub fn new(track: Option<TrackInfo>, progress: Option<Duration>, is_playing: bool) -> Self {
        Self {
            track,
            progress,
            is_playing,
            polled_at: Instant::now(),
        }
    }

    /// Extrapolated position based on time elapsed since the snapshot.
    ///
    /// Pure read of the last authoritative sample: while playing, the
    /// position advances with wall clock and clamps to the track duration;
    /// while paused it stays at the sampled value. Snapshots without a
    /// reported progress extrapolate from zero.
    #[must_use]
    pub fn extrapolated_position(&self) -> Duration {
        let base = self.progress.unwrap_or(Duration::ZERO);
        if !self.is_playing {
            return base;
        }

        let extrapolated = base + self.polled_at.elapsed();
        match &self.track {
            Some(track) => extrapolated.min(track.duration),
            None => extrapolated,
        }
    }

    /// Check whether the loaded track differs from `other`'s by identity
    #[must_use]
    pub fn track_changed(&self, other: &Self) -> bool {
        match (&self.track, &other.track) {
            (Some(a), Some(b)) => a.id != b.id,
            (None, None) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, secs: u64) -> TrackInfo {
        TrackInfo::new(
            id,
            "Song",
            vec!["Artist".to_string()],
            "Album",
            Duration::from_secs(secs),
        )
    }

    #[test]
    fn test_default_state_is_stopped() {
        let state = PlaybackState::default();
        assert!(!state.is_playing);
        assert!(state.track.is_none());
        assert!(state.progress.is_none());
    }

    #[test]
    fn test_extrapolation_paused() {
        let state = PlaybackState {
            track: Some(track("t1", 180)),
            progress: Some(Duration::from_secs(30)),
            is_playing: false,
            polled_at: Instant::now() - Duration::from_secs(5),
        };

        assert_eq!(state.extrapolated_position(), Duration::from_secs(30));
    }

    #[test]
    fn test_extrapolation_advances_while_playing() {
        let state = PlaybackState {
            track: Some(track("t1", 180)),
            progress: Some(Duration::from_secs(30)),
            is_playing: true,
            polled_at: Instant::now() - Duration::from_secs(5),
        };

        let position = state.extrapolated_position();
        assert!(position >= Duration::from_secs(35));
        assert!(position < Duration::from_secs(36));
    }

    #[test]
    fn test_extrapolation_clamped_to_duration() {
        let state = PlaybackState {
            track: Some(track("t1", 180)),
            progress: Some(Duration::from_secs(178)),
            is_playing: true,
            polled_at: Instant::now() - Duration::from_secs(10),
        };

        assert_eq!(state.extrapolated_position(), Duration::from_secs(180));
    }

    #[test]
    fn test_extrapolation_unknown_progress_starts_at_zero() {
        let state = PlaybackState {
            track: Some(track("t1", 180)),
            progress: None,
            is_playing: false,
            polled_at: Instant::now(),
        };

        assert_eq!(state.extrapolated_position(), Duration::ZERO);
    }

    #[test]
    fn test_track_changed_by_id_only() {
        let a = PlaybackState::new(Some(track("t1", 180)), Some(Duration::ZERO), true);
        let b = PlaybackState::new(Some(track("t1", 200)), Some(Duration::from_secs(9)), false);
        let c = PlaybackState::new(Some(track("t2", 180)), Some(Duration::ZERO), true);

        assert!(!a.track_changed(&b));
        assert!(a.track_changed(&c));
    }

    #[test]
    fn test_track_changed_none_transitions() {
        let none = PlaybackState::default();
        let some = PlaybackState::new(Some(track("t1", 180)), None, true);

        assert!(none.track_changed(&some));
        assert!(some.track_changed(&none));
        assert!(!none.track_changed(&PlaybackState::default()));
    }

    #[test]
    fn test_artists_joined() {
        let track = TrackInfo::new(
            "t1",
            "Song",
            vec!["First".to_string(), "Second".to_string()],
            "Album",
            Duration::from_secs(60),
        );
        assert_eq!(track.artists_joined(), "First, Second");
    }
}

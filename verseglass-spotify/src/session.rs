//! Session facade wiring the token manager, API client, and polling loop.

use crate::client::SpotifyClient;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, AuthError};
use crate::paths::credentials_path;
use crate::poller::PlaybackPoller;
use crate::token::TokenManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use verseglass_core::{EventBus, PlayerEvent, SpotifyConfig};

/// A connected Spotify session: authentication plus playback polling.
pub struct SpotifySession {
    tokens: Arc<TokenManager>,
    client: Arc<SpotifyClient>,
    poller: Arc<PlaybackPoller<SpotifyClient>>,
    bus: EventBus,
}

impl SpotifySession {
    /// Build a session from configuration, loading persisted credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted credentials are unreadable or an HTTP
    /// client cannot be built.
    pub fn new(config: &SpotifyConfig, bus: EventBus) -> Result<Self, SessionError> {
        let store = CredentialStore::new(credentials_path());
        let tokens = Arc::new(TokenManager::new(config, store, bus.clone())?);
        let client = Arc::new(SpotifyClient::new(tokens.credentials())?);
        let poller = Arc::new(PlaybackPoller::new(
            Arc::clone(&client),
            Arc::clone(&tokens),
            bus.clone(),
            Duration::from_millis(config.poll_interval_ms),
        ));

        Ok(Self {
            tokens,
            client,
            poller,
            bus,
        })
    }

    /// Validate or acquire credentials, running the interactive flow when
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if every acquisition path failed.
    pub async fn authenticate(&self) -> Result<(), AuthError> {
        self.tokens.authenticate(self.client.as_ref()).await
    }

    /// Start the playback polling loop. A no-op when already running; a
    /// loop still winding down after a stop is drained first.
    pub async fn start_polling(&self) {
        Arc::clone(&self.poller).start_polling().await;
    }

    /// Request the polling loop to stop.
    pub async fn stop_polling(&self) {
        self.poller.stop_polling().await;
    }

    /// Whether the polling loop is currently running.
    pub async fn is_polling(&self) -> bool {
        self.poller.is_polling().await
    }

    /// Subscribe to playback events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.bus.subscribe()
    }
}

/// Errors raised while building or driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

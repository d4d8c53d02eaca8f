use std::time::Duration;
use thiserror::Error;

/// Errors from the token lifecycle manager.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The refresh token was rejected as permanently invalid (revoked or
    /// expired); credentials have been cleared and a new interactive flow
    /// is required.
    #[error("Refresh token rejected; re-authentication required")]
    InvalidGrant,

    /// The authorization redirect arrived without a code.
    #[error("Authentication failed: no code received from Spotify")]
    NoCodeReceived,

    /// The authorization-code exchange failed.
    #[error("Token exchange failed: {reason}")]
    TokenExchangeFailed { reason: String },

    /// The callback listener could not be run (bind failure, timeout,
    /// closed channel).
    #[error("Authorization callback failed: {reason}")]
    CallbackFailed { reason: String },

    /// An interactive flow is already pending; only one callback listener
    /// may be open at a time.
    #[error("An interactive authentication flow is already in progress")]
    FlowInProgress,

    /// Recoverable failure (network, server 5xx); credentials were kept.
    #[error("Transient authentication error: {reason}")]
    Transient { reason: String },

    /// Failed to read or write the persisted credentials.
    #[error("Credential storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize persisted credentials.
    #[error("Credential format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the remote playback client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The access token was rejected; refresh and retry.
    #[error("Spotify rejected the access token")]
    Unauthorized,

    /// Rate limited; back off before the next request.
    #[error("Spotify API rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other unsuccessful API status.
    #[error("Spotify API error (status {status})")]
    Api { status: u16 },

    /// Request never produced a response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

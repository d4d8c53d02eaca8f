pub mod client;
pub mod credentials;
pub mod error;
pub mod paths;
pub mod pkce;
pub mod poller;
pub mod session;
pub mod token;

pub use client::{PlaybackApi, SpotifyClient};
pub use credentials::{CredentialHandle, CredentialStore, Credentials};
pub use error::{ApiError, AuthError};
pub use poller::PlaybackPoller;
pub use session::{SessionError, SpotifySession};
pub use token::TokenManager;

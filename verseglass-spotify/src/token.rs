//! Token lifecycle management: validation probe, refresh, and the
//! interactive PKCE authorization flow with a local callback listener.

use crate::client::PlaybackApi;
use crate::credentials::{CredentialHandle, CredentialStore, Credentials};
use crate::error::{ApiError, AuthError};
use crate::pkce::generate_pkce;
use axum::{extract::Query, response::Html, routing::get, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{info, warn};
use verseglass_core::{EventBus, PlayerEvent, SpotifyConfig};

/// Spotify authorization endpoint
const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

/// Spotify token endpoint (code and refresh exchange)
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Scopes needed for playback and queue polling
const SCOPES: &str = "user-read-playback-state user-read-currently-playing user-read-playback-position";

/// Timeout for the interactive callback (10 minutes)
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout for token endpoint requests
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Manages credential acquisition, validation, refresh, and persistence.
///
/// Sole writer of the shared [`CredentialHandle`]: credentials are always
/// replaced wholesale and persisted after every mutation.
pub struct TokenManager {
    client_id: String,
    redirect_uri: String,
    token_url: String,
    http: reqwest::Client,
    credentials: CredentialHandle,
    store: CredentialStore,
    bus: EventBus,
    /// Held for the duration of an interactive flow; guarantees a single
    /// callback listener per port.
    flow_guard: Mutex<()>,
}

/// Token endpoint response for both code and refresh exchanges.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

/// Query parameters of the authorization redirect
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

impl TokenManager {
    /// Create a token manager, loading any persisted credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the persisted
    /// credentials are unreadable.
    pub fn new(
        config: &SpotifyConfig,
        store: CredentialStore,
        bus: EventBus,
    ) -> Result<Self, AuthError> {
        Self::with_token_url(config, store, bus, TOKEN_URL)
    }

    /// Create a token manager against a custom token endpoint (tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the persisted
    /// credentials are unreadable.
    pub fn with_token_url(
        config: &SpotifyConfig,
        store: CredentialStore,
        bus: EventBus,
        token_url: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Transient {
                reason: e.to_string(),
            })?;

        let persisted = store.load()?;
        Ok(Self {
            client_id: config.client_id.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
            token_url: token_url.into(),
            http,
            credentials: Arc::new(RwLock::new(persisted)),
            store,
            bus,
            flow_guard: Mutex::new(()),
        })
    }

    /// Shared read handle to the current credentials.
    #[must_use]
    pub fn credentials(&self) -> CredentialHandle {
        Arc::clone(&self.credentials)
    }

    /// Whether a credential pair is currently held.
    pub async fn has_credentials(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Validate or acquire credentials.
    ///
    /// Stored credentials are validated with one lightweight probe call; an
    /// auth-rejected probe triggers a refresh, and a failed refresh falls
    /// through to the interactive flow. Without stored credentials, the
    /// interactive flow runs directly.
    ///
    /// # Errors
    ///
    /// Returns an error if every acquisition path failed.
    pub async fn authenticate(&self, probe: &dyn PlaybackApi) -> Result<(), AuthError> {
        if self.has_credentials().await {
            match probe.currently_playing().await {
                Ok(_) => {
                    info!("Stored credentials are valid");
                    self.bus.emit(PlayerEvent::Authenticated);
                    return Ok(());
                }
                Err(ApiError::Unauthorized) => {
                    info!("Stored access token rejected, attempting refresh");
                    if self.refresh().await.is_ok() {
                        self.bus.emit(PlayerEvent::Authenticated);
                        return Ok(());
                    }
                    // Fall through to the interactive flow
                }
                Err(e) => {
                    warn!("Credential probe failed: {e}; starting interactive flow");
                }
            }
        }

        self.interactive_flow().await
    }

    /// Exchange the stored refresh token for fresh credentials.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidGrant`] when the refresh token is missing or
    /// rejected by the server (credentials cleared, `ReauthenticationNeeded`
    /// emitted); [`AuthError::Transient`] on network or server failures
    /// (credentials kept).
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let refresh_token = {
            let guard = self.credentials.read().await;
            guard.as_ref().map(|c| c.refresh_token.clone())
        };

        let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
            warn!("Cannot refresh: refresh token is missing");
            self.clear_credentials().await;
            self.bus.emit(PlayerEvent::ReauthenticationNeeded);
            return Err(AuthError::InvalidGrant);
        };

        info!("Refreshing access token");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Transient {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_client_error() {
            // 400-class means the refresh token is revoked or expired
            warn!("Refresh token rejected (status {status})");
            self.clear_credentials().await;
            self.bus.emit(PlayerEvent::ReauthenticationNeeded);
            return Err(AuthError::InvalidGrant);
        }
        if !status.is_success() {
            return Err(AuthError::Transient {
                reason: format!("token endpoint returned status {status}"),
            });
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| AuthError::Transient {
                reason: e.to_string(),
            })?;

        // The endpoint may rotate the refresh token; keep the old one when
        // it does not.
        let credentials = Credentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token.unwrap_or(refresh_token),
        };
        self.replace_credentials(credentials).await?;
        info!("Access token refreshed");
        Ok(())
    }

    /// Run the interactive PKCE authorization flow.
    ///
    /// Opens the browser, waits for exactly one redirect on the local
    /// callback listener, and exchanges the code. The listener is released
    /// on every exit path.
    ///
    /// # Errors
    ///
    /// [`AuthError::FlowInProgress`] when another flow holds the listener;
    /// otherwise the failure of this attempt.
    pub async fn interactive_flow(&self) -> Result<(), AuthError> {
        let Ok(_guard) = self.flow_guard.try_lock() else {
            return Err(AuthError::FlowInProgress);
        };

        self.bus.emit(PlayerEvent::AuthenticationStarted);

        match self.run_authorization_flow().await {
            Ok(()) => {
                self.bus.emit(PlayerEvent::AuthenticationFinished {
                    success: true,
                    message: None,
                });
                self.bus.emit(PlayerEvent::Authenticated);
                Ok(())
            }
            Err(e) => {
                warn!("Interactive authentication failed: {e}");
                self.clear_credentials().await;
                self.bus.emit(PlayerEvent::AuthenticationFinished {
                    success: false,
                    message: Some(e.to_string()),
                });
                Err(e)
            }
        }
    }

    async fn run_authorization_flow(&self) -> Result<(), AuthError> {
        let pkce = generate_pkce();
        let (host, port, callback_path) = self.parse_redirect_uri()?;

        // Listener is bound before the browser opens so the redirect cannot
        // race it
        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let router = build_callback_router(&callback_path, tx);
        let listener = bind_callback_listener(&host, port).await?;

        let auth_url = self.build_authorize_url(&pkce.challenge)?;
        info!("Opening browser for Spotify authorization");
        if let Err(e) = open::that(&auth_url) {
            warn!("Could not open browser automatically: {e}");
            info!("Please open this URL manually:\n{auth_url}");
        }

        let params = wait_for_callback(rx, listener, router).await?;
        let code = match (params.code, params.error) {
            (Some(code), _) => code,
            (None, Some(error)) => {
                warn!("Authorization redirect reported an error: {error}");
                return Err(AuthError::NoCodeReceived);
            }
            (None, None) => return Err(AuthError::NoCodeReceived),
        };

        info!("Received authorization code, exchanging for tokens");
        self.exchange_code(&code, &pkce.verifier).await
    }

    /// Exchange an authorization code for a credential pair.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<(), AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("code_verifier", verifier),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::TokenExchangeFailed {
                reason: format!("token endpoint returned status {status}"),
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| AuthError::TokenExchangeFailed {
                    reason: e.to_string(),
                })?;

        let credentials = Credentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token.unwrap_or_default(),
        };
        self.replace_credentials(credentials).await?;
        info!("Authorization complete");
        Ok(())
    }

    /// Replace the credential pair atomically and persist it.
    async fn replace_credentials(&self, credentials: Credentials) -> Result<(), AuthError> {
        self.store.save(&credentials)?;
        *self.credentials.write().await = Some(credentials);
        Ok(())
    }

    /// Drop in-memory and persisted credentials.
    async fn clear_credentials(&self) {
        *self.credentials.write().await = None;
        self.store.clear();
    }

    fn build_authorize_url(&self, challenge: &str) -> Result<String, AuthError> {
        let url = url::Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_challenge_method", "S256"),
                ("code_challenge", challenge),
                ("scope", SCOPES),
            ],
        )
        .map_err(|e| AuthError::CallbackFailed {
            reason: format!("invalid authorize URL: {e}"),
        })?;
        Ok(url.into())
    }

    fn parse_redirect_uri(&self) -> Result<(String, u16, String), AuthError> {
        let parsed =
            url::Url::parse(&self.redirect_uri).map_err(|e| AuthError::CallbackFailed {
                reason: format!("invalid redirect URI: {e}"),
            })?;

        let host = parsed.host_str().unwrap_or("127.0.0.1").to_string();
        // A URI without an explicit port means the scheme default (80 for
        // http), which is where the browser will send the redirect.
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| AuthError::CallbackFailed {
                reason: format!("redirect URI {} has no usable port", self.redirect_uri),
            })?;
        let path = parsed.path().to_string();
        Ok((host, port, path))
    }
}

/// Router serving the single authorization redirect.
fn build_callback_router(callback_path: &str, tx: oneshot::Sender<CallbackParams>) -> Router {
    let tx = Arc::new(Mutex::new(Some(tx)));
    Router::new().route(
        callback_path,
        get(move |Query(params): Query<CallbackParams>| {
            let tx = Arc::clone(&tx);
            async move {
                let body = if params.code.is_some() {
                    SUCCESS_HTML
                } else {
                    NO_CODE_HTML
                };
                if let Some(sender) = tx.lock().await.take() {
                    let _ = sender.send(params);
                }
                Html(body)
            }
        }),
    )
}

async fn bind_callback_listener(
    host: &str,
    port: u16,
) -> Result<tokio::net::TcpListener, AuthError> {
    let host = if host == "localhost" { "127.0.0.1" } else { host };
    let addr: SocketAddr =
        format!("{host}:{port}")
            .parse()
            .map_err(|e| AuthError::CallbackFailed {
                reason: format!("invalid callback address: {e}"),
            })?;

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AuthError::CallbackFailed {
                reason: format!("failed to bind {addr}: {e}"),
            })?;
    info!("Authorization callback listener on http://{addr}");
    Ok(listener)
}

/// Serve the listener until the first redirect arrives, the server dies, or
/// the flow times out. The listener is dropped on return in every case.
async fn wait_for_callback(
    rx: oneshot::Receiver<CallbackParams>,
    listener: tokio::net::TcpListener,
    router: Router,
) -> Result<CallbackParams, AuthError> {
    let server = axum::serve(listener, router);

    tokio::select! {
        result = rx => {
            result.map_err(|_| AuthError::CallbackFailed {
                reason: "callback channel closed unexpectedly".into(),
            })
        }
        _ = server => {
            Err(AuthError::CallbackFailed {
                reason: "callback server stopped unexpectedly".into(),
            })
        }
        () = tokio::time::sleep(CALLBACK_TIMEOUT) => {
            Err(AuthError::CallbackFailed {
                reason: format!(
                    "authorization timed out after {} minutes",
                    CALLBACK_TIMEOUT.as_secs() / 60
                ),
            })
        }
    }
}

/// Confirmation page for a successful redirect
const SUCCESS_HTML: &str = r"<!DOCTYPE html>
<html>
<head><title>Authentication Successful</title>
<style>body { font-family: sans-serif; text-align: center; padding-top: 50px; }</style>
</head>
<body>
    <h1>Authentication Successful!</h1>
    <p>You can close this window and return to Verseglass.</p>
</body>
</html>";

/// Page for a redirect without a code
const NO_CODE_HTML: &str = r"<!DOCTYPE html>
<html>
<head><title>Authentication Failed</title>
<style>body { font-family: sans-serif; text-align: center; padding-top: 50px; }</style>
</head>
<body>
    <h1>Authentication Failed</h1>
    <p>No authorization code was received. Please close this window and try again.</p>
</body>
</html>";

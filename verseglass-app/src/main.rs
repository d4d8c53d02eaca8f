//! Headless Verseglass runner: authenticates with Spotify, polls playback,
//! and logs synchronized lyric lines and track-change banners.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use verseglass_core::{
    config_path, Config, CoreError, DisplayEvent, EventBus, LyricLine, LyricsProvider,
    LyricsResolver, PlayerEvent, SyncEngine,
};
use verseglass_lyrics_lrclib::LrclibProvider;
use verseglass_spotify::SpotifySession;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match Config::load(&config_path()) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created a new config at {}. Fill in your Spotify client ID and run again.",
                path.display()
            );
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            error!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let bus = EventBus::new();
    let cancel_token = CancellationToken::new();

    let session = SpotifySession::new(&config.spotify, bus.clone())?;

    let engine = SyncEngine::new(
        Duration::from_millis(config.sync.tick_interval_ms),
        Some(cancel_token.clone()),
    );
    let engine_task = SyncEngine::start(Arc::clone(&engine), bus.subscribe());

    let providers: Vec<Box<dyn LyricsProvider>> = vec![Box::new(LrclibProvider::new()?)];
    let resolver = Arc::new(LyricsResolver::new(
        Arc::clone(&engine),
        bus.clone(),
        providers,
        Some(cancel_token.clone()),
    ));
    let resolver_task = resolver.start();

    let display_task = tokio::spawn(render_display(engine.subscribe(), cancel_token.clone()));
    let player_task = tokio::spawn(log_player_events(bus.subscribe(), cancel_token.clone()));

    session.authenticate().await?;
    session.start_polling().await;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    session.stop_polling().await;
    cancel_token.cancel();

    let _ = tokio::join!(engine_task, resolver_task, display_task, player_task);
    Ok(())
}

/// Print the display stream: active lyric lines, progress, and banners.
async fn render_display(
    mut rx: broadcast::Receiver<DisplayEvent>,
    cancel_token: CancellationToken,
) {
    let mut lines: Vec<LyricLine> = Vec::new();

    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => break,
            event = rx.recv() => event,
        };
        match event {
            Ok(DisplayEvent::TrackStarted(track)) => {
                lines.clear();
                info!("Now playing: {} - {}", track.artists_joined(), track.name);
            }
            Ok(DisplayEvent::LyricsLoaded(loaded)) => {
                info!("Loaded {} lyric line(s)", loaded.len());
                lines = loaded;
            }
            Ok(DisplayEvent::ActiveLineChanged { index }) => {
                if let Some(line) = index.and_then(|i| lines.get(i)) {
                    info!("♪ {}", line.text);
                }
            }
            Ok(DisplayEvent::BannerShown(next)) => {
                info!("Up next: {} - {}", next.artists_joined(), next.name);
            }
            Ok(DisplayEvent::BannerCountdown { progress }) => {
                tracing::debug!("Banner countdown at {progress:.2}");
            }
            Ok(DisplayEvent::BannerHidden) => {
                tracing::debug!("Banner hidden");
            }
            Ok(DisplayEvent::PlaybackCleared) => {
                lines.clear();
                info!("Playback stopped");
            }
            Ok(DisplayEvent::Progress { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Display stream lagged, skipped {skipped} event(s)");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Log lifecycle events from the playback side.
async fn log_player_events(
    mut rx: broadcast::Receiver<PlayerEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => break,
            event = rx.recv() => event,
        };
        match event {
            Ok(PlayerEvent::Authenticated) => info!("Authenticated with Spotify"),
            Ok(PlayerEvent::AuthenticationStarted) => {
                info!("Waiting for Spotify authorization in the browser");
            }
            Ok(PlayerEvent::AuthenticationFinished { success, message }) => {
                if success {
                    info!("Authorization finished");
                } else {
                    warn!(
                        "Authorization failed: {}",
                        message.unwrap_or_else(|| "unknown error".to_string())
                    );
                }
            }
            Ok(PlayerEvent::ReauthenticationNeeded) => {
                warn!("Spotify session expired; restart to authenticate again");
            }
            Ok(PlayerEvent::PollingStopped) => info!("Playback polling stopped"),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Player stream lagged, skipped {skipped} event(s)");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

//! End-to-end pipeline: player events flow through the engine and resolver
//! tasks to display events, with no network involved.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use verseglass_core::{
    parse_synced, CoreError, DisplayEvent, EventBus, LyricLine, LyricsProvider, LyricsQuery,
    LyricsResolver, PlaybackState, PlayerEvent, SyncEngine, TrackInfo,
};

struct FixedProvider {
    lines: Vec<LyricLine>,
}

#[async_trait]
impl LyricsProvider for FixedProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn fetch(&self, _query: &LyricsQuery) -> Result<Vec<LyricLine>, CoreError> {
        Ok(self.lines.clone())
    }
}

struct FailingProvider;

#[async_trait]
impl LyricsProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn fetch(&self, _query: &LyricsQuery) -> Result<Vec<LyricLine>, CoreError> {
        Err(CoreError::LyricsProviderFailed {
            provider: "failing".to_string(),
            reason: "scripted failure".to_string(),
        })
    }
}

fn track(id: &str) -> TrackInfo {
    TrackInfo::new(
        id,
        "Song",
        vec!["Artist".to_string()],
        "Album",
        Duration::from_secs(180),
    )
}

async fn next_event(rx: &mut broadcast::Receiver<DisplayEvent>) -> DisplayEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for display event")
        .expect("display channel closed")
}

/// Wait for the first event matching the filter, skipping others (the local
/// ticker interleaves progress heartbeats).
async fn wait_for<F: Fn(&DisplayEvent) -> bool>(
    rx: &mut broadcast::Receiver<DisplayEvent>,
    f: F,
) -> DisplayEvent {
    loop {
        let event = next_event(rx).await;
        if f(&event) {
            return event;
        }
    }
}

#[tokio::test]
async fn test_track_change_flows_to_lyrics_and_active_line() {
    let bus = EventBus::new();
    let engine = SyncEngine::new(Duration::from_millis(50), None);
    let engine_task = SyncEngine::start(Arc::clone(&engine), bus.subscribe());

    let provider = FixedProvider {
        lines: parse_synced("[00:05.00]One\n[00:10.00]Two"),
    };
    let resolver = Arc::new(LyricsResolver::new(
        Arc::clone(&engine),
        bus.clone(),
        vec![Box::new(FailingProvider), Box::new(provider)],
        Some(engine.cancel_token()),
    ));
    let resolver_task = resolver.start();

    let mut rx = engine.subscribe();

    bus.emit(PlayerEvent::TrackChanged(track("t1")));
    let started = wait_for(&mut rx, |e| matches!(e, DisplayEvent::TrackStarted(_))).await;
    assert!(matches!(started, DisplayEvent::TrackStarted(t) if t.id == "t1"));

    // The failing provider is skipped; the fixed one delivers two lines.
    let loaded = wait_for(&mut rx, |e| matches!(e, DisplayEvent::LyricsLoaded(_))).await;
    match loaded {
        DisplayEvent::LyricsLoaded(lines) => assert_eq!(lines.len(), 2),
        other => panic!("unexpected event: {other:?}"),
    }

    bus.emit(PlayerEvent::PlaybackUpdated(PlaybackState::new(
        Some(track("t1")),
        Some(Duration::from_secs(6)),
        true,
    )));
    let changed = wait_for(&mut rx, |e| {
        matches!(e, DisplayEvent::ActiveLineChanged { .. })
    })
    .await;
    assert!(matches!(
        changed,
        DisplayEvent::ActiveLineChanged { index: Some(0) }
    ));

    engine.cancel_token().cancel();
    let _ = tokio::join!(engine_task, resolver_task);
}

#[tokio::test]
async fn test_no_lyrics_found_still_loads_empty_transcript() {
    let bus = EventBus::new();
    let engine = SyncEngine::new(Duration::from_millis(50), None);
    let engine_task = SyncEngine::start(Arc::clone(&engine), bus.subscribe());

    let resolver = Arc::new(LyricsResolver::new(
        Arc::clone(&engine),
        bus.clone(),
        vec![Box::new(FixedProvider { lines: Vec::new() })],
        Some(engine.cancel_token()),
    ));
    let resolver_task = resolver.start();

    let mut rx = engine.subscribe();
    bus.emit(PlayerEvent::TrackChanged(track("t1")));

    let loaded = wait_for(&mut rx, |e| matches!(e, DisplayEvent::LyricsLoaded(_))).await;
    match loaded {
        DisplayEvent::LyricsLoaded(lines) => assert!(lines.is_empty()),
        other => panic!("unexpected event: {other:?}"),
    }

    engine.cancel_token().cancel();
    let _ = tokio::join!(engine_task, resolver_task);
}

//! End-to-end tests for the recognition session state machine
//!
//! Drives the session with a scripted recognizer and a fake metadata lookup,
//! observing outcomes through the event bus, the shared state projection,
//! and the history store.

use ritmo_common::db::{self, HistoryStore};
use ritmo_common::{EventBus, RecognitionEvent};
use ritmo_rec::allowlist::ArtistAllowlist;
use ritmo_rec::recognizer::{Recognizer, RecognizerListener, RecognizerUpdate};
use ritmo_rec::services::{Enrichment, ItunesError, MetadataLookup};
use ritmo_rec::session::{RecognitionSession, SessionHandle, StartOutcome};
use ritmo_rec::state::{SessionPhase, SharedState};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Test doubles
// ============================================================================

/// Recognizer that replays a per-attempt script of callbacks
struct ScriptedRecognizer {
    accept: bool,
    scripts: Mutex<VecDeque<Vec<RecognizerUpdate>>>,
    cancelled: AtomicBool,
}

impl ScriptedRecognizer {
    fn accepting(script: Vec<RecognizerUpdate>) -> Arc<Self> {
        Self::with_scripts(vec![script])
    }

    fn with_scripts(scripts: Vec<Vec<RecognizerUpdate>>) -> Arc<Self> {
        Arc::new(Self {
            accept: true,
            scripts: Mutex::new(scripts.into_iter().collect()),
            cancelled: AtomicBool::new(false),
        })
    }

    fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            accept: false,
            scripts: Mutex::new(VecDeque::new()),
            cancelled: AtomicBool::new(false),
        })
    }

    fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Recognizer for ScriptedRecognizer {
    fn start_capture(&self, listener: RecognizerListener) -> bool {
        if !self.accept {
            return false;
        }
        let script = self
            .scripts
            .lock()
            .expect("scripts lock")
            .pop_front()
            .unwrap_or_default();
        for update in script {
            let _ = listener.send(update);
        }
        true
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Metadata lookup with scripted outcomes
#[derive(Clone)]
enum FakeLookup {
    Success(Enrichment),
    Fail,
    Delayed(Duration),
}

impl MetadataLookup for FakeLookup {
    async fn lookup(&self, _title: &str, _artist: &str) -> Result<Enrichment, ItunesError> {
        match self {
            FakeLookup::Success(enrichment) => Ok(enrichment.clone()),
            FakeLookup::Fail => Err(ItunesError::NoResults),
            FakeLookup::Delayed(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Enrichment::default())
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    session: SessionHandle,
    state: Arc<SharedState>,
    history: HistoryStore,
    events: broadcast::Receiver<RecognitionEvent>,
}

async fn setup(recognizer: Arc<dyn Recognizer>, lookup: FakeLookup) -> Harness {
    let pool = db::init_memory_database().await.expect("memory db");
    let history = HistoryStore::new(pool).await.expect("history store");
    let state = Arc::new(SharedState::new());
    let bus = EventBus::new(100);
    let events = bus.subscribe();

    let session = RecognitionSession::spawn(
        recognizer,
        lookup,
        ArtistAllowlist::builtin(),
        history.clone(),
        state.clone(),
        bus,
    );

    Harness {
        session,
        state,
        history,
        events,
    }
}

fn matched_payload(title: &str, artist: &str) -> String {
    format!(
        r#"{{
            "status": {{"code": 0, "msg": "Success", "version": "1.0"}},
            "metadata": {{"music": [{{
                "title": "{title}",
                "artists": [{{"name": "{artist}"}}],
                "album": {{"name": "Grandes Exitos"}},
                "release_date": "1965-04-12",
                "genres": [{{"name": "Pasillo"}}]
            }}]}}
        }}"#
    )
}

async fn next_event(rx: &mut broadcast::Receiver<RecognitionEvent>) -> RecognitionEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event bus closed")
}

async fn wait_for_history_len(history: &HistoryStore, expected: usize) {
    for _ in 0..100 {
        if history.list().await.expect("list history").len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("history never reached {} entries", expected);
}

async fn wait_for_phase(state: &SharedState, phase: SessionPhase) {
    for _ in 0..100 {
        if state.phase().await == phase {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session never reached phase {}", phase);
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn recognized_track_emits_event_and_persists() {
    let recognizer = ScriptedRecognizer::accepting(vec![
        RecognizerUpdate::Volume(0.3),
        RecognizerUpdate::Result(Some(matched_payload("Fatalidad", "Julio Jaramillo"))),
    ]);
    let enrichment = Enrichment {
        preview_url: Some("https://audio.example.com/preview.m4a".to_string()),
        artwork_url: Some("https://img.example.com/600x600bb.jpg".to_string()),
    };
    let mut h = setup(recognizer, FakeLookup::Success(enrichment)).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));

    let event = next_event(&mut h.events).await;
    let RecognitionEvent::Recognized { track, .. } = event else {
        panic!("expected Recognized, got {}", event.event_type());
    };
    assert_eq!(track.title, "Fatalidad");
    assert_eq!(track.artist, "Julio Jaramillo");
    assert_eq!(track.album.as_deref(), Some("Grandes Exitos"));
    assert_eq!(track.year.as_deref(), Some("1965"));
    assert_eq!(track.genre.as_deref(), Some("Pasillo"));
    assert_eq!(
        track.preview_url.as_deref(),
        Some("https://audio.example.com/preview.m4a")
    );

    wait_for_history_len(&h.history, 1).await;
    let entries = h.history.list().await.expect("list history");
    assert_eq!(entries[0].title, "Fatalidad");

    wait_for_phase(&h.state, SessionPhase::Idle).await;
    let last = h.state.last_recognized().await.expect("last recognized");
    assert_eq!(last.title, "Fatalidad");
    assert_eq!(h.state.status_text().await, "Fatalidad – Julio Jaramillo");
}

#[tokio::test]
async fn non_allowlisted_artist_is_rejected_without_persisting() {
    let recognizer = ScriptedRecognizer::accepting(vec![RecognizerUpdate::Result(Some(
        matched_payload("Shake It Off", "Taylor Swift"),
    ))]);
    let mut h = setup(recognizer, FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::NotAllowlisted { .. }
    ));

    wait_for_phase(&h.state, SessionPhase::Idle).await;
    assert!(h.state.last_recognized().await.is_none());
    assert!(h.history.list().await.expect("list history").is_empty());
    assert_eq!(h.state.status_text().await, "Artist is not on the allow-list");
}

#[tokio::test]
async fn missing_payload_reports_not_found() {
    let recognizer = ScriptedRecognizer::accepting(vec![RecognizerUpdate::Result(None)]);
    let mut h = setup(recognizer, FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::NotFound { .. }
    ));
    assert_eq!(h.state.status_text().await, "Song not found");
}

#[tokio::test]
async fn error_status_payload_reports_not_found() {
    let payload = r#"{"status": {"code": 1001, "msg": "No result"}}"#.to_string();
    let recognizer =
        ScriptedRecognizer::accepting(vec![RecognizerUpdate::Result(Some(payload))]);
    let mut h = setup(recognizer, FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::NotFound { .. }
    ));
}

#[tokio::test]
async fn malformed_payload_fails_the_attempt() {
    let recognizer = ScriptedRecognizer::accepting(vec![RecognizerUpdate::Result(Some(
        "this is not json".to_string(),
    ))]);
    let mut h = setup(recognizer, FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Failed { .. }
    ));
    wait_for_phase(&h.state, SessionPhase::Idle).await;
}

#[tokio::test]
async fn start_while_busy_is_rejected() {
    // Empty script: the session stays in Capturing until cancelled
    let recognizer = ScriptedRecognizer::accepting(vec![]);
    let h = setup(recognizer.clone(), FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert_eq!(h.session.start().await, StartOutcome::Busy);

    h.session.cancel();
    wait_for_phase(&h.state, SessionPhase::Idle).await;
    assert!(recognizer.was_cancelled());
}

#[tokio::test]
async fn capture_rejection_fails_the_attempt() {
    let mut h = setup(ScriptedRecognizer::rejecting(), FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::CaptureRejected);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Failed { .. }
    ));
    assert_eq!(h.state.phase().await, SessionPhase::Idle);

    // The session remains usable for the next attempt
    assert_eq!(h.session.start().await, StartOutcome::CaptureRejected);
}

#[tokio::test]
async fn lookup_failure_still_recognizes_without_enrichment() {
    let recognizer = ScriptedRecognizer::accepting(vec![RecognizerUpdate::Result(Some(
        matched_payload("Esperando tu Amor", "Tranzas"),
    ))]);
    let mut h = setup(recognizer, FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));

    let event = next_event(&mut h.events).await;
    let RecognitionEvent::Recognized { track, .. } = event else {
        panic!("expected Recognized, got {}", event.event_type());
    };
    assert_eq!(track.title, "Esperando tu Amor");
    assert!(track.preview_url.is_none());
    assert!(track.artwork_url.is_none());

    wait_for_history_len(&h.history, 1).await;
}

#[tokio::test]
async fn cancel_during_capture_emits_no_terminal_event() {
    let recognizer = ScriptedRecognizer::accepting(vec![RecognizerUpdate::Volume(0.5)]);
    let mut h = setup(recognizer.clone(), FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));

    h.session.cancel();
    wait_for_phase(&h.state, SessionPhase::Idle).await;

    assert!(recognizer.was_cancelled());
    assert_eq!(h.state.status_text().await, "Cancelled");
    assert_eq!(h.state.volume().await, 0.0);

    // No terminal event may follow a cancel
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(
        h.events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn cancel_during_resolve_suppresses_the_terminal_event() {
    let recognizer = ScriptedRecognizer::accepting(vec![RecognizerUpdate::Result(Some(
        matched_payload("Fatalidad", "Julio Jaramillo"),
    ))]);
    let mut h = setup(
        recognizer,
        FakeLookup::Delayed(Duration::from_millis(300)),
    )
    .await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));

    wait_for_phase(&h.state, SessionPhase::Resolving).await;
    h.session.cancel();

    // Let the delayed lookup complete; its result must be discarded
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.state.phase().await, SessionPhase::Idle);
    assert!(h.state.last_recognized().await.is_none());
    assert!(h.history.list().await.expect("list history").is_empty());
    assert!(matches!(
        h.events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn restart_clears_the_previous_recognition() {
    let recognizer = ScriptedRecognizer::with_scripts(vec![
        vec![RecognizerUpdate::Result(Some(matched_payload(
            "Fatalidad",
            "Julio Jaramillo",
        )))],
        vec![],
    ]);
    let mut h = setup(recognizer, FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Recognized { .. }
    ));
    wait_for_phase(&h.state, SessionPhase::Idle).await;
    assert!(h.state.last_recognized().await.is_some());

    // Second attempt clears the previous result while capturing
    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(h.state.last_recognized().await.is_none());
    assert_eq!(h.state.status_text().await, "Listening…");

    h.session.cancel();
    wait_for_phase(&h.state, SessionPhase::Idle).await;
}

#[tokio::test]
async fn stale_callbacks_from_a_cancelled_attempt_are_dropped() {
    // First attempt delivers nothing; its listener is kept to replay a
    // stale result after the attempt was cancelled
    struct HoldingRecognizer {
        listeners: Mutex<Vec<RecognizerListener>>,
    }

    impl Recognizer for HoldingRecognizer {
        fn start_capture(&self, listener: RecognizerListener) -> bool {
            self.listeners.lock().expect("listeners lock").push(listener);
            true
        }
        fn cancel(&self) {}
    }

    let recognizer = Arc::new(HoldingRecognizer {
        listeners: Mutex::new(Vec::new()),
    });
    let mut h = setup(recognizer.clone(), FakeLookup::Fail).await;

    assert_eq!(h.session.start().await, StartOutcome::Listening);
    assert!(matches!(
        next_event(&mut h.events).await,
        RecognitionEvent::Started { .. }
    ));

    h.session.cancel();
    wait_for_phase(&h.state, SessionPhase::Idle).await;

    // Replay a late result from the cancelled attempt
    let stale = recognizer.listeners.lock().expect("listeners lock")[0].clone();
    let _ = stale.send(RecognizerUpdate::Result(Some(matched_payload(
        "Fatalidad",
        "Julio Jaramillo",
    ))));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.state.phase().await, SessionPhase::Idle);
    assert!(h.state.last_recognized().await.is_none());
    assert!(matches!(
        h.events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

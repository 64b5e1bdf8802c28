//! Recognition session state machine
//!
//! One session owns the full lifecycle of a recognition attempt:
//! `Idle → Capturing → Resolving → Idle`. The session runs as a single
//! spawned task consuming a message queue; API commands and recognizer
//! callbacks are both marshaled onto that queue, so no two transitions can
//! interleave and each attempt emits at most one terminal event.

pub mod payload;

use crate::allowlist::ArtistAllowlist;
use crate::recognizer::{Recognizer, RecognizerUpdate};
use crate::services::MetadataLookup;
use crate::state::{SessionPhase, SharedState};
use payload::RawOutcome;
use ritmo_common::db::HistoryStore;
use ritmo_common::{EventBus, RecognitionEvent, RecognizedTrack};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Outcome of a start request, reported synchronously to the caller
///
/// Terminal attempt outcomes arrive later as [`RecognitionEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Capture accepted; a `Started` event has been emitted
    Listening,
    /// An attempt is already in flight; request rejected
    Busy,
    /// The recognizer rejected the capture request; a `Failed` event has
    /// been emitted
    CaptureRejected,
}

enum SessionMsg {
    Start {
        reply: oneshot::Sender<StartOutcome>,
    },
    Cancel,
    Recognizer {
        attempt: u64,
        update: RecognizerUpdate,
    },
    EnrichmentDone {
        attempt: u64,
        track: RecognizedTrack,
    },
}

/// Cloneable handle for issuing session commands
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMsg>,
}

impl SessionHandle {
    /// Begin a new attempt; valid only while Idle
    pub async fn start(&self) -> StartOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(SessionMsg::Start { reply: reply_tx })
            .is_err()
        {
            return StartOutcome::CaptureRejected;
        }
        reply_rx.await.unwrap_or(StartOutcome::CaptureRejected)
    }

    /// Abort the in-flight attempt (no-op while Idle, never emits an event)
    pub fn cancel(&self) {
        let _ = self.tx.send(SessionMsg::Cancel);
    }
}

/// The session task
pub struct RecognitionSession<L: MetadataLookup> {
    rx: mpsc::UnboundedReceiver<SessionMsg>,
    tx: mpsc::UnboundedSender<SessionMsg>,
    recognizer: Arc<dyn Recognizer>,
    lookup: L,
    allowlist: ArtistAllowlist,
    history: HistoryStore,
    state: Arc<SharedState>,
    events: EventBus,
    /// Attempt counter; stale callbacks from earlier attempts are dropped
    attempt: u64,
    phase: SessionPhase,
    /// Set by cancel() during Resolving; suppresses the terminal event
    cancelled: bool,
}

impl<L: MetadataLookup> RecognitionSession<L> {
    /// Spawn the session task and return its command handle
    pub fn spawn(
        recognizer: Arc<dyn Recognizer>,
        lookup: L,
        allowlist: ArtistAllowlist,
        history: HistoryStore,
        state: Arc<SharedState>,
        events: EventBus,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionHandle { tx: tx.clone() };

        let session = Self {
            rx,
            tx,
            recognizer,
            lookup,
            allowlist,
            history,
            state,
            events,
            attempt: 0,
            phase: SessionPhase::Idle,
            cancelled: false,
        };
        tokio::spawn(session.run());

        handle
    }

    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                SessionMsg::Start { reply } => {
                    let outcome = self.handle_start().await;
                    let _ = reply.send(outcome);
                }
                SessionMsg::Cancel => self.handle_cancel().await,
                SessionMsg::Recognizer { attempt, update } => {
                    self.handle_recognizer(attempt, update).await;
                }
                SessionMsg::EnrichmentDone { attempt, track } => {
                    self.handle_enriched(attempt, track).await;
                }
            }
        }
        debug!("Session queue closed, task exiting");
    }

    async fn handle_start(&mut self) -> StartOutcome {
        if self.phase != SessionPhase::Idle {
            debug!(phase = %self.phase, "Rejecting start while attempt in flight");
            return StartOutcome::Busy;
        }

        self.attempt += 1;
        let (listener_tx, mut listener_rx) = mpsc::unbounded_channel();

        if !self.recognizer.start_capture(listener_tx) {
            let message =
                "Could not start capture; check input device and permissions".to_string();
            warn!("{}", message);
            self.state.set_status_text(&message).await;
            self.events.emit_lossy(RecognitionEvent::Failed {
                message,
                timestamp: chrono::Utc::now(),
            });
            return StartOutcome::CaptureRejected;
        }

        // Forward recognizer callbacks onto the session queue, tagged with
        // the attempt so stale callbacks are dropped
        let tx = self.tx.clone();
        let attempt = self.attempt;
        tokio::spawn(async move {
            while let Some(update) = listener_rx.recv().await {
                if tx.send(SessionMsg::Recognizer { attempt, update }).is_err() {
                    break;
                }
            }
        });

        self.cancelled = false;
        self.set_phase(SessionPhase::Capturing).await;
        self.state.set_last_recognized(None).await;
        self.state.set_status_text("Listening…").await;
        self.events.emit_lossy(RecognitionEvent::Started {
            timestamp: chrono::Utc::now(),
        });
        info!(attempt = self.attempt, "Capture started");

        StartOutcome::Listening
    }

    async fn handle_cancel(&mut self) {
        match self.phase {
            SessionPhase::Idle => {}
            SessionPhase::Capturing => {
                self.recognizer.cancel();
                self.set_phase(SessionPhase::Idle).await;
                self.state.set_volume(0.0).await;
                self.state.set_status_text("Cancelled").await;
                info!(attempt = self.attempt, "Capture cancelled");
            }
            SessionPhase::Resolving => {
                // Enrichment is already in flight; let it finish but
                // suppress the terminal event
                self.cancelled = true;
                self.state.set_volume(0.0).await;
                self.state.set_status_text("Cancelled").await;
                info!(attempt = self.attempt, "Attempt cancelled during resolve");
            }
        }
    }

    async fn handle_recognizer(&mut self, attempt: u64, update: RecognizerUpdate) {
        if attempt != self.attempt {
            return;
        }

        match update {
            RecognizerUpdate::Volume(level) => {
                if self.phase == SessionPhase::Capturing {
                    self.state.set_volume(level).await;
                }
            }
            RecognizerUpdate::Result(raw) => {
                if self.phase != SessionPhase::Capturing {
                    return;
                }
                match payload::interpret(raw.as_deref()) {
                    RawOutcome::NoMatch => self.finish_not_found().await,
                    RawOutcome::Malformed(reason) => {
                        self.finish_failed(format!("Could not parse result: {}", reason))
                            .await;
                    }
                    RawOutcome::Matched(track) => self.begin_enrichment(track).await,
                }
            }
        }
    }

    async fn begin_enrichment(&mut self, track: RecognizedTrack) {
        self.set_phase(SessionPhase::Resolving).await;
        self.state.set_status_text("Looking up track details…").await;

        let lookup = self.lookup.clone();
        let tx = self.tx.clone();
        let attempt = self.attempt;
        tokio::spawn(async move {
            let enriched = match lookup.lookup(&track.title, &track.artist).await {
                Ok(enrichment) => {
                    track.with_enrichment(enrichment.preview_url, enrichment.artwork_url)
                }
                Err(e) => {
                    // Non-fatal: proceed with the recognizer's own fields
                    warn!("Metadata lookup failed: {}", e);
                    track
                }
            };
            let _ = tx.send(SessionMsg::EnrichmentDone {
                attempt,
                track: enriched,
            });
        });
    }

    async fn handle_enriched(&mut self, attempt: u64, track: RecognizedTrack) {
        if attempt != self.attempt || self.phase != SessionPhase::Resolving {
            return;
        }

        if self.cancelled {
            // Status was already set to "Cancelled"; no terminal event
            self.cancelled = false;
            self.set_phase(SessionPhase::Idle).await;
            return;
        }

        if self.allowlist.matches(&track.artist) {
            info!(title = %track.title, artist = %track.artist, "Track recognized");
            self.state.set_last_recognized(Some(track.clone())).await;
            self.state.set_status_text(track.display_line()).await;

            // Fire-and-forget persistence: a failure is logged, never
            // surfaced as a session failure
            let history = self.history.clone();
            let persisted = track.clone();
            tokio::spawn(async move {
                if let Err(e) = history.append(&persisted).await {
                    warn!("Failed to persist history record: {}", e);
                }
            });

            self.events.emit_lossy(RecognitionEvent::Recognized {
                track,
                timestamp: chrono::Utc::now(),
            });
        } else {
            debug!(title = %track.title, artist = %track.artist, "Artist not allow-listed");
            self.state
                .set_status_text("Artist is not on the allow-list")
                .await;
            self.events.emit_lossy(RecognitionEvent::NotAllowlisted {
                timestamp: chrono::Utc::now(),
            });
        }

        self.set_phase(SessionPhase::Idle).await;
    }

    async fn finish_not_found(&mut self) {
        self.state.set_status_text("Song not found").await;
        self.events.emit_lossy(RecognitionEvent::NotFound {
            timestamp: chrono::Utc::now(),
        });
        self.set_phase(SessionPhase::Idle).await;
    }

    async fn finish_failed(&mut self, message: String) {
        warn!("{}", message);
        self.state.set_status_text(&message).await;
        self.events.emit_lossy(RecognitionEvent::Failed {
            message,
            timestamp: chrono::Utc::now(),
        });
        self.set_phase(SessionPhase::Idle).await;
    }

    async fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.state.set_phase(phase).await;
    }
}

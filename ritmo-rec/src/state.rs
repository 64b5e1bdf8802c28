//! Shared session state
//!
//! UI-facing projections of the recognition session, written only by the
//! session task and read by API handlers. These mirror the most recent
//! event and carry no invariants of their own.

use ritmo_common::RecognizedTrack;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Recognition session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No attempt in flight (initial and terminal state)
    Idle,
    /// External recognizer is capturing audio
    Capturing,
    /// Result received, enrichment lookup in flight
    Resolving,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Capturing => write!(f, "Capturing"),
            SessionPhase::Resolving => write!(f, "Resolving"),
        }
    }
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with single-writer updates from
/// the session task.
pub struct SharedState {
    /// Current session phase
    phase: RwLock<SessionPhase>,

    /// Most recently recognized, allow-listed track
    last_recognized: RwLock<Option<RecognizedTrack>>,

    /// Latest capture volume level reported by the recognizer
    volume: RwLock<f64>,

    /// Human-readable status line
    status_text: RwLock<String>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        Self {
            phase: RwLock::new(SessionPhase::Idle),
            last_recognized: RwLock::new(None),
            volume: RwLock::new(0.0),
            status_text: RwLock::new("Idle".to_string()),
        }
    }

    /// Get current session phase
    pub async fn phase(&self) -> SessionPhase {
        *self.phase.read().await
    }

    /// Set session phase
    pub async fn set_phase(&self, phase: SessionPhase) {
        *self.phase.write().await = phase;
    }

    /// True while an attempt is in flight
    pub async fn is_active(&self) -> bool {
        *self.phase.read().await != SessionPhase::Idle
    }

    /// Get the most recently recognized track
    pub async fn last_recognized(&self) -> Option<RecognizedTrack> {
        self.last_recognized.read().await.clone()
    }

    /// Set (or clear) the most recently recognized track
    pub async fn set_last_recognized(&self, track: Option<RecognizedTrack>) {
        *self.last_recognized.write().await = track;
    }

    /// Get latest capture volume level
    pub async fn volume(&self) -> f64 {
        *self.volume.read().await
    }

    /// Set capture volume level
    pub async fn set_volume(&self, volume: f64) {
        *self.volume.write().await = volume;
    }

    /// Get status line
    pub async fn status_text(&self) -> String {
        self.status_text.read().await.clone()
    }

    /// Set status line
    pub async fn set_status_text(&self, text: impl Into<String>) {
        *self.status_text.write().await = text.into();
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

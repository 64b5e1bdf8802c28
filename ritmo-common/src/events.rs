//! Event types for the RITMO event system
//!
//! Provides the recognition event definitions and the EventBus used to fan
//! them out to SSE subscribers and tests.

use crate::track::RecognizedTrack;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Recognition lifecycle events
///
/// Exactly one terminal event (`Recognized`, `NotFound`, `NotAllowlisted` or
/// `Failed`) concludes each attempt; `Started` is emitted once when capture
/// begins. Events are broadcast via [`EventBus`] and serialized for SSE
/// transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecognitionEvent {
    /// Capture started for a new attempt
    Started {
        /// When capture started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track was recognized and passed the allow-list gate
    Recognized {
        /// The (possibly enriched) recognized track
        track: RecognizedTrack,
        /// When the attempt concluded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The recognizer found no match (or returned an error status)
    NotFound {
        /// When the attempt concluded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A valid match was rejected by the artist allow-list
    NotAllowlisted {
        /// When the attempt concluded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The attempt failed (capture rejected or malformed payload)
    Failed {
        /// Human-readable failure description
        message: String,
        /// When the attempt concluded
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RecognitionEvent {
    /// Event type name used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            RecognitionEvent::Started { .. } => "Started",
            RecognitionEvent::Recognized { .. } => "Recognized",
            RecognitionEvent::NotFound { .. } => "NotFound",
            RecognitionEvent::NotAllowlisted { .. } => "NotAllowlisted",
            RecognitionEvent::Failed { .. } => "Failed",
        }
    }

    /// True for the event that concludes an attempt
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecognitionEvent::Started { .. })
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally: non-blocking publish, multiple
/// concurrent subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RecognitionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RecognitionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RecognitionEvent,
    ) -> Result<usize, broadcast::error::SendError<RecognitionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RecognitionEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Event emitted with no subscribers");
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> RecognizedTrack {
        RecognizedTrack::new(
            "Fatalidad".to_string(),
            "Julio Jaramillo".to_string(),
            None,
            Some("1965".to_string()),
            Some("Vals".to_string()),
        )
    }

    #[test]
    fn test_event_serialization_tags() {
        let event = RecognitionEvent::Recognized {
            track: sample_track(),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("serialization should succeed");
        assert!(json.contains("\"type\":\"Recognized\""));
        assert!(json.contains("\"title\":\"Fatalidad\""));

        let back: RecognitionEvent =
            serde_json::from_str(&json).expect("deserialization should succeed");
        assert_eq!(back.event_type(), "Recognized");
    }

    #[test]
    fn test_terminal_classification() {
        let ts = chrono::Utc::now();
        assert!(!RecognitionEvent::Started { timestamp: ts }.is_terminal());
        assert!(RecognitionEvent::NotFound { timestamp: ts }.is_terminal());
        assert!(RecognitionEvent::NotAllowlisted { timestamp: ts }.is_terminal());
        assert!(RecognitionEvent::Failed {
            message: "boom".to_string(),
            timestamp: ts
        }
        .is_terminal());
    }

    #[test]
    fn test_eventbus_emit_and_subscribe() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(RecognitionEvent::NotFound {
            timestamp: chrono::Utc::now(),
        })
        .expect("emit should succeed");

        let received = rx.try_recv().expect("should receive event");
        assert_eq!(received.event_type(), "NotFound");
    }

    #[test]
    fn test_eventbus_emit_lossy_without_subscribers() {
        let bus = EventBus::new(10);
        // No subscribers: must not panic
        bus.emit_lossy(RecognitionEvent::Started {
            timestamp: chrono::Utc::now(),
        });
    }
}

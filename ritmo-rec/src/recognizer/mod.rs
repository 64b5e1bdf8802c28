//! External recognizer boundary
//!
//! The recognizer owns audio capture and fingerprint matching; the session
//! only sees this interface. Callbacks arrive from the recognizer's own
//! capture thread and are marshaled through an unbounded channel onto the
//! session task; implementations never touch session state directly.

pub mod cloud;

pub use cloud::CloudRecognizer;

use tokio::sync::mpsc;

/// Callback messages delivered by a recognizer during one attempt
#[derive(Debug, Clone)]
pub enum RecognizerUpdate {
    /// Capture volume level, any number of times while capturing
    Volume(f64),
    /// The terminal result, at most once per attempt. `None` when the
    /// recognizer produced no usable response.
    Result(Option<String>),
}

/// Channel end handed to the recognizer for callback delivery
pub type RecognizerListener = mpsc::UnboundedSender<RecognizerUpdate>;

/// Capture-side boundary of the recognition pipeline
///
/// `start_capture` either accepts (and will later deliver callbacks through
/// the listener) or rejects synchronously. A cancelled capture delivers no
/// result callback.
pub trait Recognizer: Send + Sync {
    /// Request capture for one attempt; false when capture cannot start
    /// (no input device, resource failure)
    fn start_capture(&self, listener: RecognizerListener) -> bool;

    /// Abort an in-flight capture
    fn cancel(&self);
}

//! # RITMO Common Library
//!
//! Shared code for the RITMO recognition service:
//! - Recognized track model
//! - Recognition event types and EventBus
//! - Database pool initialization and history store
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod track;

pub use error::{Error, Result};
pub use events::{EventBus, RecognitionEvent};
pub use track::RecognizedTrack;

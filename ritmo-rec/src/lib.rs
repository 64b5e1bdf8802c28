//! # RITMO Recognition Service (ritmo-rec)
//!
//! Headless music-recognition service: captures ambient audio, identifies it
//! through a cloud fingerprinting endpoint, filters matches against a
//! configured artist allow-list, enriches matches from the iTunes Search
//! API, persists a listening history, and exposes an HTTP/SSE control
//! surface.

pub mod allowlist;
pub mod api;
pub mod config;
pub mod error;
pub mod player;
pub mod recognizer;
pub mod services;
pub mod session;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::SharedState;

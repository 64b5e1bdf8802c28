//! Recognized track model

use serde::{Deserialize, Serialize};

/// One successfully parsed recognition result.
///
/// Immutable once constructed: enrichment produces a new value via
/// [`RecognizedTrack::with_enrichment`] instead of patching fields in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedTrack {
    /// Track title
    pub title: String,
    /// Primary artist (first credited artist; secondary artists are dropped)
    pub artist: String,
    /// Album name, when the recognizer reported one
    pub album: Option<String>,
    /// 4-character year string derived from the release date (best effort,
    /// shorter date strings pass through unvalidated)
    pub year: Option<String>,
    /// First listed genre
    pub genre: Option<String>,
    /// Artwork URL from enrichment
    pub artwork_url: Option<String>,
    /// 30-second preview URL from enrichment
    pub preview_url: Option<String>,
}

impl RecognizedTrack {
    /// Create a bare (un-enriched) track from recognizer fields
    pub fn new(
        title: String,
        artist: String,
        album: Option<String>,
        year: Option<String>,
        genre: Option<String>,
    ) -> Self {
        Self {
            title,
            artist,
            album,
            year,
            genre,
            artwork_url: None,
            preview_url: None,
        }
    }

    /// Return a new track with enrichment URLs filled in
    pub fn with_enrichment(
        &self,
        preview_url: Option<String>,
        artwork_url: Option<String>,
    ) -> Self {
        Self {
            preview_url,
            artwork_url,
            ..self.clone()
        }
    }

    /// "Title – Artist" line used as the session status text
    pub fn display_line(&self) -> String {
        format!("{} – {}", self.title, self.artist)
    }
}

//! Recognizer payload interpretation
//!
//! The external recognizer delivers its terminal result as an optional JSON
//! document with a status code and, on success, a `metadata.music` array.
//! This module turns that raw payload into one of four outcomes the session
//! maps onto terminal events.

use ritmo_common::RecognizedTrack;
use serde::{Deserialize, Serialize};

/// Identify response payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentifyPayload {
    pub status: IdentifyStatus,
    pub metadata: Option<IdentifyMetadata>,
}

/// Status block: code 0 means a match was found
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentifyStatus {
    pub code: i32,
    pub msg: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentifyMetadata {
    #[serde(default)]
    pub music: Vec<MusicEntry>,
}

/// One matched recording
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MusicEntry {
    pub title: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistEntry>,
    pub album: Option<AlbumEntry>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<GenreEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistEntry {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumEntry {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenreEntry {
    pub name: Option<String>,
}

/// Interpretation of one raw recognizer payload
#[derive(Debug, Clone)]
pub enum RawOutcome {
    /// A track was parsed from a successful match
    Matched(RecognizedTrack),
    /// No payload, or the recognizer reported a non-zero status
    NoMatch,
    /// Payload present but malformed (bad JSON, or missing title/artist)
    Malformed(String),
}

/// Interpret a raw recognizer payload
pub fn interpret(raw: Option<&str>) -> RawOutcome {
    let raw = match raw {
        Some(text) if !text.trim().is_empty() => text,
        _ => return RawOutcome::NoMatch,
    };

    let payload: IdentifyPayload = match serde_json::from_str(raw) {
        Ok(payload) => payload,
        Err(e) => return RawOutcome::Malformed(format!("invalid payload: {}", e)),
    };

    if payload.status.code != 0 {
        return RawOutcome::NoMatch;
    }

    match parse_track(&payload) {
        Some(track) => RawOutcome::Matched(track),
        None => RawOutcome::Malformed("missing title or artist".to_string()),
    }
}

/// Extract a track from a zero-status payload
///
/// First music entry only; secondary artists and genres are discarded. The
/// year is the first 4 characters of the release date, passed through
/// unvalidated when the date string is shorter.
fn parse_track(payload: &IdentifyPayload) -> Option<RecognizedTrack> {
    let music = payload.metadata.as_ref()?.music.first()?;

    let title = music.title.clone()?;
    let artist = music.artists.first()?.name.clone()?;

    let album = music.album.as_ref().and_then(|a| a.name.clone());
    let year = music
        .release_date
        .as_ref()
        .map(|date| date.chars().take(4).collect());
    let genre = music.genres.first().and_then(|g| g.name.clone());

    Some(RecognizedTrack::new(title, artist, album, year, genre))
}

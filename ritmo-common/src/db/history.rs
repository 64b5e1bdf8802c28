//! Listening history persistence
//!
//! Append-only record of allow-listed recognitions. The store owns record
//! identity (SQLite autoincrement); records are never mutated, and only the
//! bulk [`HistoryStore::clear`] deletes them. A `watch` channel publishes a
//! newest-first snapshot that refreshes on every append/clear, giving
//! long-lived observers a live, restartable view.

use crate::track::RecognizedTrack;
use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tokio::sync::watch;

/// One persisted history entry: a recognized track plus its store-assigned id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Store-assigned, monotonically increasing identity
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub artwork_url: Option<String>,
    pub preview_url: Option<String>,
}

impl HistoryRecord {
    /// View the record as a track (drops the identity)
    pub fn to_track(&self) -> RecognizedTrack {
        RecognizedTrack {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            year: self.year.clone(),
            genre: self.genre.clone(),
            artwork_url: self.artwork_url.clone(),
            preview_url: self.preview_url.clone(),
        }
    }
}

/// History store over the song_history table
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
    snapshot_tx: Arc<watch::Sender<Vec<HistoryRecord>>>,
}

impl HistoryStore {
    /// Create a store and load the initial snapshot
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let initial = list_all(&pool).await?;
        let (snapshot_tx, _) = watch::channel(initial);
        Ok(Self {
            pool,
            snapshot_tx: Arc::new(snapshot_tx),
        })
    }

    /// Append a track, assigning a fresh identity
    ///
    /// Duplicate content is permitted and never deduplicated.
    pub async fn append(&self, track: &RecognizedTrack) -> Result<HistoryRecord> {
        let result = sqlx::query(
            r#"
            INSERT OR REPLACE INTO song_history (
                title, artist, album, year, genre, artwork_url, preview_url
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(&track.year)
        .bind(&track.genre)
        .bind(&track.artwork_url)
        .bind(&track.preview_url)
        .execute(&self.pool)
        .await?;

        let record = HistoryRecord {
            id: result.last_insert_rowid(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            year: track.year.clone(),
            genre: track.genre.clone(),
            artwork_url: track.artwork_url.clone(),
            preview_url: track.preview_url.clone(),
        };

        self.refresh_snapshot().await?;
        Ok(record)
    }

    /// All records, newest first
    pub async fn list(&self) -> Result<Vec<HistoryRecord>> {
        list_all(&self.pool).await
    }

    /// Delete all records
    ///
    /// Exposed for external triggers only; the recognition session never
    /// calls this.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM song_history")
            .execute(&self.pool)
            .await?;
        self.refresh_snapshot().await?;
        Ok(())
    }

    /// Subscribe to the live newest-first snapshot
    pub fn observe(&self) -> watch::Receiver<Vec<HistoryRecord>> {
        self.snapshot_tx.subscribe()
    }

    async fn refresh_snapshot(&self) -> Result<()> {
        let records = list_all(&self.pool).await?;
        self.snapshot_tx.send_replace(records);
        Ok(())
    }
}

async fn list_all(pool: &SqlitePool) -> Result<Vec<HistoryRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, artist, album, year, genre, artwork_url, preview_url
        FROM song_history
        ORDER BY id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| HistoryRecord {
            id: row.get("id"),
            title: row.get("title"),
            artist: row.get("artist"),
            album: row.get("album"),
            year: row.get("year"),
            genre: row.get("genre"),
            artwork_url: row.get("artwork_url"),
            preview_url: row.get("preview_url"),
        })
        .collect())
}

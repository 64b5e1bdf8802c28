//! Database initialization and history store

pub mod history;

pub use history::{HistoryRecord, HistoryStore};

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows the live history snapshot to be refreshed while the
    // session task is appending
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_song_history_table(&pool).await?;

    Ok(pool)
}

/// Open an in-memory database with the full schema (tests)
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    create_song_history_table(&pool).await?;
    Ok(pool)
}

/// Create the song_history table (idempotent)
///
/// No timestamp column: insertion order is the retrieval order, newest
/// first by the store-assigned autoincrement id.
pub async fn create_song_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS song_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album TEXT,
            year TEXT,
            genre TEXT,
            artwork_url TEXT,
            preview_url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

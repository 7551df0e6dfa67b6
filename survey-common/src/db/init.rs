//! Database initialization
//!
//! Opens (or creates) the SQLite store and makes sure the single
//! `survey_responses` table exists. Safe to run on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How long a statement waits on a locked database before failing
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Connections kept by the pool; one writer at a time is enforced by SQLite
pub const MAX_CONNECTIONS: u32 = 10;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // journal_mode and busy_timeout are per-connection pragmas
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_survey_responses_table(&pool).await?;

    info!("Database busy timeout set to {} ms", BUSY_TIMEOUT_MS);

    Ok(pool)
}

/// Create the survey_responses table
///
/// `raw_json` holds the validated answer set and is what every read
/// projection is built from; the `q*` columns are a queryable copy.
pub async fn create_survey_responses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            q1 TEXT NOT NULL,
            q1_follow TEXT,
            q2 TEXT NOT NULL,
            q3 TEXT NOT NULL,
            q4 TEXT NOT NULL,
            q5 TEXT NOT NULL,
            q6 TEXT NOT NULL,
            q7 TEXT NOT NULL,
            q8 TEXT NOT NULL,
            q9 TEXT NOT NULL,
            q10 TEXT NOT NULL,
            q11 TEXT NOT NULL,
            q12 TEXT NOT NULL,
            q13 TEXT NOT NULL,
            q14 TEXT NOT NULL,
            q15 TEXT,
            raw_json TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

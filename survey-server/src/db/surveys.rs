//! Survey response persistence
//!
//! Rows are append-only: nothing here updates or deletes. Reads return the
//! `raw_json` snapshot together with `id` and `created_at`; projections are
//! built from that snapshot only.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use survey_common::{Error, Result};
use tracing::debug;

use crate::schema::SurveyAnswers;

/// Timestamp layout stored in `created_at` (matches SQLite `datetime('now')`)
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored survey response as read back from the database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredSurvey {
    pub id: i64,
    pub created_at: String,
    pub raw_json: String,
}

/// Insert a validated answer set and return its new id
///
/// One INSERT writes the denormalized columns and the `raw_json` snapshot
/// together, so the row commits whole or not at all.
pub async fn insert_survey(pool: &SqlitePool, answers: &SurveyAnswers) -> Result<i64> {
    // Prepare all data before touching the pool
    let raw_json = serde_json::to_string(answers)
        .map_err(|e| Error::Internal(format!("Failed to serialize answers: {}", e)))?;
    let created_at = Utc::now().format(CREATED_AT_FORMAT).to_string();

    let mut query = sqlx::query(
        r#"
        INSERT INTO survey_responses
            (created_at, q1, q1_follow, q2, q3, q4, q5, q6, q7, q8, q9, q10, q11, q12, q13, q14, q15, raw_json)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&created_at)
    .bind(answers.q1.as_str())
    .bind(answers.q1_follow.as_deref());

    for value in answers.likert() {
        query = query.bind(value.as_str());
    }

    let result = query
        .bind(answers.q15.as_deref())
        .bind(&raw_json)
        .execute(pool)
        .await?;

    let id = result.last_insert_rowid();
    debug!(id, "Inserted survey response");

    Ok(id)
}

/// The `limit` most recent responses, newest first
///
/// Callers clamp `limit`; a non-positive value returns nothing.
pub async fn list_recent_surveys(pool: &SqlitePool, limit: i64) -> Result<Vec<StoredSurvey>> {
    if limit <= 0 {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, StoredSurvey>(
        "SELECT id, created_at, raw_json FROM survey_responses ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Exact lookup by id; `Ok(None)` when no such response exists
pub async fn get_survey(pool: &SqlitePool, id: i64) -> Result<Option<StoredSurvey>> {
    let row = sqlx::query_as::<_, StoredSurvey>(
        "SELECT id, created_at, raw_json FROM survey_responses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Number of stored responses
pub async fn count_surveys(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

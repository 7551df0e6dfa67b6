//! Output shapes for stored survey responses
//!
//! Every shape is built from the stored `raw_json` plus `id` and
//! `created_at`, never from the denormalized columns. One selector
//! ([`Shape`]) drives all of them so the full, export and compact views of a
//! record cannot disagree.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Write;
use thiserror::Error;

use crate::db::StoredSurvey;
use crate::schema::LIKERT_KEYS;

/// Content type for line-delimited JSON responses
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Marker used in summaries for a missing answer
pub const MISSING_MARKER: &str = "n/a";

/// Projection errors
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Stored snapshot is not a JSON object
    #[error("Stored answers for survey #{id} are not valid JSON: {source}")]
    CorruptSnapshot {
        id: i64,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing a projection failed
    #[error("Failed to encode projection: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Output shape selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Answers plus the derived one-line summary
    Full,
    /// Answers only (bulk export)
    Export,
    /// Minimal-key form for the recommender
    Compact,
}

/// `{id, created_at, answers, ai_summary}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullProjection {
    pub id: i64,
    pub created_at: String,
    pub answers: Map<String, Value>,
    pub ai_summary: String,
}

/// `{id, created_at, answers}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportProjection {
    pub id: i64,
    pub created_at: String,
    pub answers: Map<String, Value>,
}

/// `{id, t, q1, lang, lk, note}`; these key names are a fixed contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactProjection {
    pub id: i64,
    pub t: String,
    pub q1: Value,
    pub lang: Value,
    pub lk: Vec<Value>,
    pub note: Value,
}

/// A record rendered in one of the shapes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Projection {
    Full(FullProjection),
    Export(ExportProjection),
    Compact(CompactProjection),
}

/// Parse the stored snapshot into its answer map
pub fn stored_answers(record: &StoredSurvey) -> Result<Map<String, Value>, ProjectionError> {
    serde_json::from_str::<Map<String, Value>>(&record.raw_json).map_err(|source| {
        ProjectionError::CorruptSnapshot {
            id: record.id,
            source,
        }
    })
}

/// Render one record
pub fn project(record: &StoredSurvey, shape: Shape) -> Result<Projection, ProjectionError> {
    let answers = stored_answers(record)?;

    let projection = match shape {
        Shape::Full => Projection::Full(FullProjection {
            id: record.id,
            created_at: record.created_at.clone(),
            ai_summary: summarize(record.id, &record.created_at, &answers),
            answers,
        }),
        Shape::Export => Projection::Export(ExportProjection {
            id: record.id,
            created_at: record.created_at.clone(),
            answers,
        }),
        Shape::Compact => Projection::Compact(compact(record, &answers)),
    };

    Ok(projection)
}

/// Render a batch, preserving order
pub fn project_all(
    records: &[StoredSurvey],
    shape: Shape,
) -> Result<Vec<Projection>, ProjectionError> {
    records.iter().map(|r| project(r, shape)).collect()
}

/// Line-delimited encoding: one compact projection per line, `\n`-joined,
/// no trailing newline
pub fn encode_ndjson(records: &[StoredSurvey]) -> Result<String, ProjectionError> {
    let lines = records
        .iter()
        .map(|r| {
            let line = serde_json::to_string(&project(r, Shape::Compact)?)?;
            Ok(line)
        })
        .collect::<Result<Vec<String>, ProjectionError>>()?;
    Ok(lines.join("\n"))
}

fn compact(record: &StoredSurvey, answers: &Map<String, Value>) -> CompactProjection {
    let field = |key: &str| answers.get(key).cloned().unwrap_or(Value::Null);

    CompactProjection {
        id: record.id,
        t: record.created_at.clone(),
        q1: field("q1"),
        lang: field("q1_follow"),
        lk: LIKERT_KEYS.iter().map(|&key| field(key)).collect(),
        note: field("q15"),
    }
}

/// Deterministic one-line synthesis of a response
///
/// `Survey #<id> on <created_at>: experience=<q1>[ (<q1_follow>)]; interests: q2:<v>, ..., q14:<v>; notes: <q15|none>`
pub fn summarize(id: i64, created_at: &str, answers: &Map<String, Value>) -> String {
    let text = |key: &'static str| answer_text(answers, key);

    let mut summary = format!(
        "Survey #{} on {}: experience={}",
        id,
        created_at,
        text("q1").unwrap_or(MISSING_MARKER)
    );

    // Writing into a String cannot fail
    if let Some(follow) = text("q1_follow") {
        let _ = write!(summary, " ({})", follow);
    }

    summary.push_str("; interests: ");
    for (i, &key) in LIKERT_KEYS.iter().enumerate() {
        let sep = if i == 0 { "" } else { ", " };
        let _ = write!(summary, "{}{}:{}", sep, key, text(key).unwrap_or(MISSING_MARKER));
    }

    let _ = write!(summary, "; notes: {}", text("q15").unwrap_or("none"));

    summary
}

/// Non-empty string answer for `key`
fn answer_text<'a>(answers: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    answers
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

//! External recommendation invoker
//!
//! Regenerates the line-delimited export artifact from the store, runs the
//! configured recommender process against it and relays the single JSON
//! document it prints. The store is only read.
//!
//! Process contract: `<program> <args...> --file <artifact> --limit <top>`,
//! exactly one JSON document on stdout, finished within the timeout.

use serde_json::Value;
use sqlx::SqlitePool;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use survey_common::config::RecommenderConfig;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::db;
use crate::projection::{self, ProjectionError};

/// Longest stderr excerpt kept for logging
const STDERR_EXCERPT_CHARS: usize = 500;

/// Name prefix of the per-call temporary artifact files
pub const ARTIFACT_TMP_PREFIX: &str = ".survey-export-";

/// Recommendation failures
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Reading records for the artifact failed
    #[error("Failed to read surveys for export: {0}")]
    Store(#[from] survey_common::Error),

    /// A stored record could not be projected
    #[error("Failed to encode export: {0}")]
    Projection(#[from] ProjectionError),

    /// Writing the artifact failed
    #[error("Failed to write export artifact {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process could not be started
    #[error("Failed to spawn recommender '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process outlived its deadline and was killed
    #[error("Recommender timed out after {0:?}")]
    Timeout(Duration),

    /// The process exited unsuccessfully
    #[error("Recommender exited with {status}: {stderr}")]
    ExitFailure { status: String, stderr: String },

    /// stdout was not exactly one JSON document
    #[error("Recommender output is not valid JSON: {0}")]
    InvalidOutput(String),
}

impl RecommendError {
    /// Short, stable label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            RecommendError::Store(_) => "store",
            RecommendError::Projection(_) => "projection",
            RecommendError::ArtifactWrite { .. } => "artifact_write",
            RecommendError::Spawn { .. } => "spawn",
            RecommendError::Timeout(_) => "timeout",
            RecommendError::ExitFailure { .. } => "exit_failure",
            RecommendError::InvalidOutput(_) => "invalid_output",
        }
    }
}

/// Runs the external recommender against a freshly regenerated artifact
#[derive(Debug, Clone)]
pub struct Recommender {
    program: String,
    args: Vec<String>,
    artifact_path: PathBuf,
    timeout: Duration,
    export_limit: i64,
    default_top: u32,
}

impl Recommender {
    pub fn new(config: &RecommenderConfig, artifact_path: PathBuf) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            artifact_path,
            timeout: Duration::from_secs(config.timeout_secs),
            export_limit: config.export_limit,
            default_top: config.top,
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn default_top(&self) -> u32 {
        self.default_top
    }

    /// Regenerate the artifact, then run the process with `top` as the hint
    pub async fn recommend(&self, pool: &SqlitePool, top: u32) -> Result<Value, RecommendError> {
        let written = self.regenerate_artifact(pool).await?;
        info!(
            records = written,
            artifact = %self.artifact_path.display(),
            "Regenerated recommendation export"
        );
        self.invoke(top).await
    }

    /// Write the newest `export_limit` records as NDJSON to the artifact path
    ///
    /// Each call writes its own temp file beside the artifact and renames it
    /// into place; concurrent calls never share a temp path.
    pub async fn regenerate_artifact(&self, pool: &SqlitePool) -> Result<usize, RecommendError> {
        let records = db::list_recent_surveys(pool, self.export_limit).await?;
        let body = projection::encode_ndjson(&records)?;

        let dir = match self.artifact_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let target = self.artifact_path.clone();

        let written = tokio::task::spawn_blocking(move || write_replacing(&dir, &target, &body))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .and_then(|result| result);

        written.map_err(|source| RecommendError::ArtifactWrite {
            path: self.artifact_path.clone(),
            source,
        })?;

        Ok(records.len())
    }

    /// Run the process against the current artifact
    pub async fn invoke(&self, top: u32) -> Result<Value, RecommendError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--file")
            .arg(&self.artifact_path)
            .arg("--limit")
            .arg(top.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program, args = ?self.args, top, "Invoking recommender");

        let child = cmd.spawn().map_err(|source| RecommendError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // Dropping the wait future on timeout kills the child (kill_on_drop)
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| RecommendError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => return Err(RecommendError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(RecommendError::ExitFailure {
                status: output.status.to_string(),
                stderr: excerpt(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        parse_output(&output.stdout)
    }
}

/// Write `body` to a fresh temp file in `dir`, then rename it onto `target`
fn write_replacing(dir: &Path, target: &Path, body: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(ARTIFACT_TMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(body.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// stdout must hold exactly one JSON document (surrounding whitespace allowed)
pub fn parse_output(stdout: &[u8]) -> Result<Value, RecommendError> {
    let text = std::str::from_utf8(stdout)
        .map_err(|e| RecommendError::InvalidOutput(format!("stdout is not UTF-8: {}", e)))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(RecommendError::InvalidOutput("empty stdout".to_string()));
    }
    serde_json::from_str(text).map_err(|e| RecommendError::InvalidOutput(e.to_string()))
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= STDERR_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(STDERR_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_single_document() {
        let value = parse_output(b"  {\"languages\": []}\n").unwrap();
        assert_eq!(value, json!({"languages": []}));
    }

    #[test]
    fn rejects_empty_output() {
        let err = parse_output(b"\n").unwrap_err();
        assert_eq!(err.kind(), "invalid_output");
    }

    #[test]
    fn rejects_trailing_text() {
        let err = parse_output(b"{\"a\":1}\nDone!").unwrap_err();
        assert!(matches!(err, RecommendError::InvalidOutput(_)));
    }

    #[test]
    fn rejects_two_documents() {
        assert!(parse_output(b"{\"a\":1}\n{\"b\":2}").is_err());
    }

    #[test]
    fn excerpt_truncates_long_stderr() {
        let long = "e".repeat(STDERR_EXCERPT_CHARS + 50);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), STDERR_EXCERPT_CHARS + 3);
    }

    #[test]
    fn write_replacing_overwrites_and_cleans_up() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("responses.ndjson");

        write_replacing(dir.path(), &target, "first").unwrap();
        write_replacing(dir.path(), &target, "{\"id\":1}").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"id\":1}");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn new_copies_config() {
        let config = RecommenderConfig {
            program: "recommend".to_string(),
            args: vec!["--fast".to_string()],
            timeout_secs: 7,
            export_limit: 50,
            top: 2,
        };
        let rec = Recommender::new(&config, PathBuf::from("/tmp/out.ndjson"));

        assert_eq!(rec.timeout, Duration::from_secs(7));
        assert_eq!(rec.export_limit, 50);
        assert_eq!(rec.default_top(), 2);
        assert_eq!(rec.artifact_path(), Path::new("/tmp/out.ndjson"));
    }
}

//! Recommendation endpoint tests
//!
//! The external recommender is replaced by small `sh -c` scripts. The script
//! sees the appended arguments as `$1..$4` (`--file <path> --limit <n>`).

#![cfg(unix)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use survey_common::config::RecommenderConfig;
use survey_common::db::init_database;
use survey_server::db::insert_survey;
use survey_server::recommender::{RecommendError, Recommender, ARTIFACT_TMP_PREFIX};
use survey_server::schema::validate;
use survey_server::{build_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    dir: TempDir,
    pool: SqlitePool,
    artifact: PathBuf,
    recommender: Recommender,
    router: Router,
}

fn script_config(script: &str, timeout_secs: u64) -> RecommenderConfig {
    RecommenderConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
        timeout_secs,
        ..RecommenderConfig::default()
    }
}

async fn setup_app(config: RecommenderConfig) -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let pool = init_database(&dir.path().join("survey.db"))
        .await
        .expect("Should create test database");
    let artifact = dir.path().join("responses.ndjson");
    let recommender = Recommender::new(&config, artifact.clone());
    let router = build_router(AppState::new(pool.clone(), recommender.clone(), None));

    TestApp {
        dir,
        pool,
        artifact,
        recommender,
        router,
    }
}

fn payload(q1: &str, follow: Option<&str>) -> Value {
    let mut payload = json!({ "q1": q1, "q1_follow": follow });
    for i in 2..=14 {
        payload[format!("q{}", i)] = json!("Agree");
    }
    payload
}

async fn submit(app: &TestApp, body: &Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/surveys")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn get_json(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).expect("Should parse JSON"))
}

async fn seed(app: &TestApp, count: usize) {
    let answers = validate(&payload("yes", Some("Elixir"))).unwrap();
    for _ in 0..count {
        insert_survey(&app.pool, &answers).await.unwrap();
    }
}

fn leftover_temp_files(app: &TestApp) -> usize {
    std::fs::read_dir(app.dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(ARTIFACT_TMP_PREFIX)
        })
        .count()
}

async fn row_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_output_relayed_verbatim() {
    let app = setup_app(script_config(
        r#"printf '{"languages":[{"name":"Rust","score":0.9}],"limit":%s}\n' "$4""#,
        10,
    ))
    .await;
    submit(&app, &payload("yes", Some("C++"))).await;

    let (status, body) = get_json(&app, "/api/recommendations").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "languages": [{ "name": "Rust", "score": 0.9 }], "limit": 1 })
    );
}

#[tokio::test]
async fn test_top_hint_is_clamped() {
    let app = setup_app(script_config(r#"printf '{"limit":%s}' "$4""#, 10)).await;

    let (_, body) = get_json(&app, "/api/recommendations?top=3").await;
    assert_eq!(body["limit"], json!(3));

    let (_, body) = get_json(&app, "/api/recommendations?top=99").await;
    assert_eq!(body["limit"], json!(10));
}

#[tokio::test]
async fn test_artifact_matches_line_export() {
    let app = setup_app(script_config(r#"test "$1" = --file && test -f "$2" && echo '{}'"#, 10))
        .await;
    submit(&app, &payload("no", None)).await;
    submit(&app, &payload("yes", Some("Haskell"))).await;

    let (status, _) = get_json(&app, "/api/recommendations").await;
    assert_eq!(status, StatusCode::OK);

    let artifact = std::fs::read_to_string(&app.artifact).unwrap();
    let request = Request::builder()
        .uri("/api/survey/ndjson")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let line_export = response.into_body().collect().await.unwrap().to_bytes();

    assert_eq!(artifact.as_bytes(), &line_export[..]);
    assert_eq!(artifact.lines().count(), 2);
    assert_eq!(leftover_temp_files(&app), 0);
}

#[tokio::test]
async fn test_nonzero_exit_is_processing_failure() {
    let app = setup_app(script_config("echo 'model unavailable' >&2; exit 3", 10)).await;
    submit(&app, &payload("no", None)).await;
    let before = row_count(&app.pool).await;

    let (status, body) = get_json(&app, "/api/recommendations").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Gemini processing failed" }));
    assert_eq!(row_count(&app.pool).await, before);
}

#[tokio::test]
async fn test_non_json_output_is_failure() {
    let app = setup_app(script_config("echo 'Here are your languages: Rust'", 10)).await;

    let (status, body) = get_json(&app, "/api/recommendations").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Gemini processing failed");
}

#[tokio::test]
async fn test_exit_failure_kind_and_stderr() {
    let app = setup_app(script_config("echo 'bad key' >&2; exit 2", 10)).await;

    let err = app.recommender.recommend(&app.pool, 1).await.unwrap_err();

    match err {
        RecommendError::ExitFailure { stderr, .. } => assert_eq!(stderr, "bad key"),
        other => panic!("expected exit failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_process_times_out() {
    let app = setup_app(script_config("sleep 5; echo '{}'", 1)).await;

    let started = Instant::now();
    let err = app.recommender.recommend(&app.pool, 1).await.unwrap_err();

    assert_eq!(err.kind(), "timeout");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_missing_program_is_spawn_failure() {
    let config = RecommenderConfig {
        program: "/nonexistent/recommender-bin".to_string(),
        args: Vec::new(),
        ..RecommenderConfig::default()
    };
    let app = setup_app(config).await;

    let err = app.recommender.recommend(&app.pool, 1).await.unwrap_err();
    assert_eq!(err.kind(), "spawn");

    let (status, body) = get_json(&app, "/api/recommendations").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Gemini processing failed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_recommendations_all_succeed() {
    // Each run checks that the artifact it was handed is complete
    // (1500 lines, no trailing newline)
    let config = RecommenderConfig {
        export_limit: 1500,
        ..script_config(
            r#"n=$(wc -l < "$2"); test "$n" -eq 1499 && echo '{"ok":true}'"#,
            30,
        )
    };
    let app = setup_app(config).await;
    seed(&app, 1500).await;

    for _ in 0..3 {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let router = app.router.clone();
                tokio::spawn(async move {
                    let request = Request::builder()
                        .uri("/api/recommendations")
                        .body(Body::empty())
                        .unwrap();
                    router.oneshot(request).await.unwrap().status()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }
    }

    assert_eq!(leftover_temp_files(&app), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_other_requests_served_while_recommender_runs() {
    let app = setup_app(script_config("sleep 2; echo '{}'", 10)).await;
    submit(&app, &payload("no", None)).await;

    let router = app.router.clone();
    let started = Instant::now();
    let pending = tokio::spawn(async move {
        let request = Request::builder()
            .uri("/api/recommendations")
            .body(Body::empty())
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    let (status, _) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = get_json(&app, "/api/surveys").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!pending.is_finished());

    assert_eq!(pending.await.unwrap(), StatusCode::OK);
    assert!(started.elapsed() >= Duration::from_secs(2));
}

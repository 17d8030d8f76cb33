use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::analyzer::{AnalyzerApi, ApiError, HttpAnalyzerClient};
use shared::config::AnalyzerConfig;
use shared::flows::{EvictionPolicy, ResultView, RetrievalFlow, SubmissionFlow, SubmissionOutcome};
use shared::models::{AnalysisForm, AnalysisRequest};
use shared::session::{FileSessionStore, SessionStore};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
    seen_paths: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_bodies: Arc::new(Mutex::new(Vec::new())),
            seen_paths: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn create_posts_wire_payload_and_reads_id() {
    let state = TestServerState::with_replies(vec![ok_reply(json!({
        "id": "abc123",
        "status": "pending"
    }))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = HttpAnalyzerClient::new(&config_for(&base_url)).expect("client should build");
    let created = client
        .create_analysis(AnalysisRequest::from_form(
            &AnalysisForm::new("https://x.test", "SEO audit"),
            "gemini-1.5-flash",
        ))
        .await
        .expect("create should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(
        created.identifier().map(|handle| handle.to_string()),
        Some("abc123".to_string())
    );
    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(
        seen_bodies,
        vec![json!({
            "url": "https://x.test",
            "requestPrompt": "SEO audit",
            "analysisContext": "SEO audit",
            "geminiModel": "gemini-1.5-flash"
        })]
    );
    let seen_paths = state.seen_paths.lock().await.clone();
    assert_eq!(seen_paths, vec!["POST /web-analyzer/".to_string()]);
}

#[tokio::test]
async fn fetch_by_id_decodes_result() {
    let state = TestServerState::with_replies(vec![ok_reply(json!({
        "id": "abc123",
        "url": "https://x.test",
        "requestPrompt": "SEO audit",
        "status": "completed",
        "analysisSummary": "## Findings\n\n**fast**"
    }))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = HttpAnalyzerClient::new(&config_for(&base_url)).expect("client should build");
    let result = client
        .fetch_analysis("abc123")
        .await
        .expect("fetch should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(result.url(), "https://x.test");
    assert_eq!(result.status_label(), "completed");
    assert_eq!(result.summary(), Some("## Findings\n\n**fast**"));
    let seen_paths = state.seen_paths.lock().await.clone();
    assert_eq!(seen_paths, vec!["GET /web-analyzer/abc123".to_string()]);
}

#[tokio::test]
async fn fetch_maps_404_to_not_found() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::NOT_FOUND,
        body: json!({ "message": "Analysis not found" }),
    }]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let client = HttpAnalyzerClient::new(&config_for(&base_url)).expect("client should build");
    let err = client
        .fetch_analysis("missing")
        .await
        .expect_err("missing analysis should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(err, ApiError::NotFound);
}

#[tokio::test]
async fn error_status_surfaces_server_message() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        body: json!({ "message": "url must be reachable" }),
    }]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let client = HttpAnalyzerClient::new(&config_for(&base_url)).expect("client should build");
    let err = client
        .create_analysis(AnalysisRequest::from_form(
            &AnalysisForm::new("https://x.test", "SEO"),
            "gemini-1.5-flash",
        ))
        .await
        .expect_err("422 should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(
        err,
        ApiError::Status {
            status: 422,
            message: "url must be reachable".to_string()
        }
    );
}

#[tokio::test]
async fn list_returns_summary_rows() {
    let state = TestServerState::with_replies(vec![ok_reply(json!([
        { "id": 1, "url": "https://a.test", "status": "completed" },
        { "id": "two", "url": "https://b.test", "requestPrompt": "perf" }
    ]))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = HttpAnalyzerClient::new(&config_for(&base_url)).expect("client should build");
    let rows = client.list_analyses().await.expect("list should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id_label(), "1");
    assert_eq!(rows[1].id_label(), "two");
    assert_eq!(rows[1].request_prompt.as_deref(), Some("perf"));
    let seen_paths = state.seen_paths.lock().await.clone();
    assert_eq!(seen_paths, vec!["GET /web-analyzer/".to_string()]);
}

#[tokio::test]
async fn invalid_json_is_reported_as_invalid_payload() {
    let state = TestServerState::with_replies(vec![ok_reply(json!("just a string"))]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let client = HttpAnalyzerClient::new(&config_for(&base_url)).expect("client should build");
    let err = client
        .list_analyses()
        .await
        .expect_err("string body is not a list");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(matches!(err, ApiError::InvalidPayload(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("address should resolve");
    drop(listener);

    let client = HttpAnalyzerClient::new(&config_for(&format!("http://{addr}")))
        .expect("client should build");
    let err = client
        .fetch_analysis("abc123")
        .await
        .expect_err("closed port should fail");

    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn submit_then_load_round_trips_through_session_file() {
    let state = TestServerState::with_replies(vec![
        ok_reply(json!({ "id": "abc123" })),
        ok_reply(json!({
            "id": "abc123",
            "url": "https://x.test",
            "requestPrompt": "SEO audit",
            "analysisSummary": "**hi**"
        })),
    ]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let config = config_for(&base_url);
    let api: Arc<dyn AnalyzerApi> =
        Arc::new(HttpAnalyzerClient::new(&config).expect("client should build"));
    let store = Arc::new(FileSessionStore::new(config.session_file.clone()));

    let submission = SubmissionFlow::new(api.clone(), store.clone(), config.model.clone());
    let outcome = submission
        .submit(&AnalysisForm::new("https://x.test", "SEO audit"))
        .await
        .expect("submission should succeed");
    assert!(matches!(outcome, SubmissionOutcome::Accepted { .. }));

    let retrieval = RetrievalFlow::new(api, store.clone(), config.eviction_policy);
    let view = retrieval.load().await.expect("load should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    match view {
        ResultView::Loaded(result) => assert_eq!(result.summary(), Some("**hi**")),
        other => panic!("expected loaded view, got {other:?}"),
    }
    assert_eq!(
        store.get().expect("store read").map(|handle| handle.to_string()),
        Some("abc123".to_string())
    );
    let seen_paths = state.seen_paths.lock().await.clone();
    assert_eq!(
        seen_paths,
        vec![
            "POST /web-analyzer/".to_string(),
            "GET /web-analyzer/abc123".to_string()
        ]
    );

    cleanup(&config.session_file);
}

fn ok_reply(body: Value) -> MockReply {
    MockReply {
        status: StatusCode::OK,
        body,
    }
}

fn config_for(base_url: &str) -> AnalyzerConfig {
    AnalyzerConfig {
        api_base_url: base_url.to_string(),
        create_url: format!("{base_url}/web-analyzer/"),
        model: "gemini-1.5-flash".to_string(),
        timeout_ms: Some(5_000),
        session_file: std::env::temp_dir()
            .join(format!("veridia-it-{}", uuid::Uuid::new_v4()))
            .join("session.json"),
        eviction_policy: EvictionPolicy::AnyError,
    }
}

fn cleanup(session_file: &std::path::Path) {
    if let Some(dir) = session_file.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route(
            "/web-analyzer/",
            post(test_create_handler).get(test_list_handler),
        )
        .route("/web-analyzer/{id}", get(test_fetch_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}"), shutdown_tx, server_task)
}

async fn test_create_handler(
    State(state): State<TestServerState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_bodies.lock().await.push(payload);
    next_reply(&state, "POST /web-analyzer/".to_string()).await
}

async fn test_list_handler(State(state): State<TestServerState>) -> (StatusCode, Json<Value>) {
    next_reply(&state, "GET /web-analyzer/".to_string()).await
}

async fn test_fetch_handler(
    State(state): State<TestServerState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    next_reply(&state, format!("GET /web-analyzer/{id}")).await
}

async fn next_reply(state: &TestServerState, seen: String) -> (StatusCode, Json<Value>) {
    state.seen_paths.lock().await.push(seen);

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({ "message": "exhausted_test_replies" }),
    });

    (reply.status, Json(reply.body))
}

// End-to-end handler tests against the router, with mocked collaborators.

mod common;

use std::io::Write;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use common::{deps, entry, fast_policy, snapshot, MockBroker, MockCapture, MockTranscripts, MockTransport};
use voice_interview::http::{create_router, AppState};
use voice_interview::provider::{NotesSettings, ProviderClient, ProviderSettings};
use voice_interview::script::ScriptCache;

const SCRIPT_YAML: &str = r#"
metadata:
  title: Intake interview
sections:
  greeting:
    title: Greeting
    description: Welcome the patient.
    estimated_time: 2 minutes
  history_intake:
    title: Medical History
    estimated_time: 5 minutes
questions:
  q1:
    id: 1
    section: greeting
    question: How are you feeling today?
    category: greeting
  q2:
    id: 2
    section: history_intake
    question: Any chronic conditions we track?
    category: medical history
"#;

struct TestApp {
    router: Router,
    transport: Arc<MockTransport>,
    // holds the script file open for the lifetime of the test
    _script_file: Option<NamedTempFile>,
}

fn provider_client() -> Arc<ProviderClient> {
    Arc::new(ProviderClient::new(
        ProviderSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            agent_id: Some("agent_test".to_string()),
        },
        NotesSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo-0125".to_string(),
        },
    ))
}

fn app_with_script(yaml: Option<&str>) -> TestApp {
    let transport = Arc::new(MockTransport::new());
    let transcripts = Arc::new(MockTranscripts::new(vec![snapshot(
        "done",
        vec![entry("agent", "Hello.", 0.0)],
    )]));
    let session_deps = deps(
        Arc::new(MockCapture::new()),
        Arc::new(MockBroker::new()),
        Arc::clone(&transport),
        transcripts,
    );

    let (script, script_file) = match yaml {
        Some(yaml) => {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(yaml.as_bytes()).unwrap();
            file.flush().unwrap();
            let cache = Arc::new(ScriptCache::new(file.path()));
            (cache, Some(file))
        }
        None => (Arc::new(ScriptCache::new("does-not-exist.yaml")), None),
    };

    let state = AppState::new(session_deps, fast_policy(2), script, provider_client());
    TestApp {
        router: create_router(state),
        transport,
        _script_file: script_file,
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoint_answers() {
    let app = app_with_script(Some(SCRIPT_YAML));
    let (status, body) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn start_is_rejected_while_interview_is_running() {
    let app = app_with_script(Some(SCRIPT_YAML));

    let (status, body) = post(
        &app.router,
        "/interviews/start",
        json!({ "interview_id": "intake-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["interview_id"], "intake-1");
    assert_eq!(app.transport.open_count(), 1);

    let (status, body) = post(
        &app.router,
        "/interviews/start",
        json!({ "interview_id": "intake-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("intake-1"));
    assert_eq!(app.transport.open_count(), 1);
}

#[tokio::test]
async fn stop_returns_stats_and_forgets_the_interview() {
    let app = app_with_script(Some(SCRIPT_YAML));

    post(
        &app.router,
        "/interviews/start",
        json!({ "interview_id": "intake-2" }),
    )
    .await;

    common::wait_until(|| async {
        let (_, body) = get(&app.router, "/interviews/intake-2/status").await;
        body["stats"]["state"] == "connected"
    })
    .await;

    let (status, body) = post(&app.router, "/interviews/stop/intake-2", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");
    assert_eq!(body["stats"]["state"], "idle");
    assert_eq!(body["stats"]["conversation_id"], "conv_test");
    assert_eq!(body["stats"]["transcript_timed_out"], false);

    let (status, _) = get(&app.router, "/interviews/intake-2/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(&app.router, "/interviews/stop/intake-2", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn racing_starts_with_one_id_open_a_single_session() {
    let app = app_with_script(Some(SCRIPT_YAML));

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let router = app.router.clone();
        tasks.push(tokio::spawn(async move {
            let (status, _) = post(
                &router,
                "/interviews/start",
                json!({ "interview_id": "intake-race" }),
            )
            .await;
            status
        }));
    }

    let mut statuses = Vec::new();
    for task in tasks {
        statuses.push(task.await.unwrap());
    }
    statuses.sort();

    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(app.transport.open_count(), 1);
}

#[tokio::test]
async fn timed_out_reconciliation_answers_request_timeout() {
    // The durable record never reaches "done".
    let transport = Arc::new(MockTransport::new());
    let session_deps = deps(
        Arc::new(MockCapture::new()),
        Arc::new(MockBroker::new()),
        Arc::clone(&transport),
        Arc::new(MockTranscripts::new(vec![snapshot(
            "processing",
            vec![entry("agent", "Partial so far.", 2.0)],
        )])),
    );
    let state = AppState::new(
        session_deps,
        fast_policy(2),
        Arc::new(ScriptCache::new("does-not-exist.yaml")),
        provider_client(),
    );
    let router = create_router(state);

    post(
        &router,
        "/interviews/start",
        json!({ "interview_id": "intake-7" }),
    )
    .await;

    // Remote side ends the session; reconciliation exhausts its budget.
    transport
        .sender()
        .await
        .send(voice_interview::transport::TransportEvent::Disconnected)
        .await
        .unwrap();

    common::wait_until(|| async {
        let (status, _) = get(&router, "/interviews/intake-7/transcript").await;
        status == StatusCode::REQUEST_TIMEOUT
    })
    .await;

    // The partial transcript still ships in the 408 body.
    let (status, body) = get(&router, "/interviews/intake-7/transcript").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    let transcript = body.as_array().unwrap();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0]["content"], "Partial so far.");

    let (status, body) = post(&router, "/interviews/stop/intake-7", json!({})).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["status"], "timeout");
    assert_eq!(body["stats"]["transcript_timed_out"], true);
    assert_eq!(body["stats"]["message_count"], 1);
}

#[tokio::test]
async fn connect_failure_surfaces_as_server_error() {
    let transport = Arc::new(MockTransport::failing());
    let session_deps = deps(
        Arc::new(MockCapture::new()),
        Arc::new(MockBroker::new()),
        Arc::clone(&transport),
        Arc::new(MockTranscripts::new(vec![])),
    );
    let state = AppState::new(
        session_deps,
        fast_policy(2),
        Arc::new(ScriptCache::new("does-not-exist.yaml")),
        provider_client(),
    );
    let router = create_router(state);

    let (status, body) = post(
        &router,
        "/interviews/start",
        json!({ "interview_id": "intake-3" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Failed to connect"));

    // a failed start leaves nothing behind
    let (status, _) = get(&router, "/interviews/intake-3/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_and_transcript_track_live_messages() {
    let app = app_with_script(Some(SCRIPT_YAML));

    post(
        &app.router,
        "/interviews/start",
        json!({ "interview_id": "intake-4" }),
    )
    .await;

    let sender = app.transport.sender().await;
    sender
        .send(voice_interview::transport::TransportEvent::Message {
            source: "ai".to_string(),
            text: "Tell me about your pregnancy history.".to_string(),
        })
        .await
        .unwrap();

    common::wait_until(|| async {
        let (_, body) = get(&app.router, "/interviews/intake-4/transcript").await;
        body.as_array().map(|a| !a.is_empty()).unwrap_or(false)
    })
    .await;

    let (status, body) = get(&app.router, "/interviews/intake-4/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["state"], "connected");
    assert_eq!(body["stats"]["message_count"], 1);
    assert_eq!(
        body["current_text"],
        "Tell me about your pregnancy history."
    );

    let (status, body) = get(&app.router, "/interviews/intake-4/transcript").await;
    assert_eq!(status, StatusCode::OK);
    let transcript = body.as_array().unwrap();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0]["role"], "assistant");
}

#[tokio::test]
async fn progress_degrades_to_empty_without_a_script() {
    let app = app_with_script(None);

    post(
        &app.router,
        "/interviews/start",
        json!({ "interview_id": "intake-5" }),
    )
    .await;

    let (status, body) = get(&app.router, "/interviews/intake-5/progress").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress_available"], false);
    assert_eq!(body["categories"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn progress_reports_script_sections() {
    let app = app_with_script(Some(SCRIPT_YAML));

    post(
        &app.router,
        "/interviews/start",
        json!({ "interview_id": "intake-6" }),
    )
    .await;

    let (status, body) = get(&app.router, "/interviews/intake-6/progress").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress_available"], true);
    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["name"], "Greeting");
    assert_eq!(categories[1]["order"], 2);
}

#[tokio::test]
async fn progress_for_unknown_interview_is_not_found() {
    let app = app_with_script(Some(SCRIPT_YAML));
    let (status, _) = get(&app.router, "/interviews/missing/progress").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn script_endpoint_serves_the_parsed_script() {
    let app = app_with_script(Some(SCRIPT_YAML));
    let (status, body) = get(&app.router, "/script").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["title"], "Intake interview");
    assert!(body["sections"]["greeting"].is_object());
}

#[tokio::test]
async fn missing_script_file_fails_the_script_endpoint() {
    let app = app_with_script(None);
    let (status, _) = get(&app.router, "/script").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn section_lookup_includes_guidance_and_ordering() {
    let app = app_with_script(Some(SCRIPT_YAML));
    let (status, body) = post(
        &app.router,
        "/script/section",
        json!({ "section_name": "greeting" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["section_name"], "greeting");
    assert_eq!(body["total_questions"], 1);
    assert_eq!(body["next_section"], "history_intake");
    assert_eq!(
        body["section_order"],
        json!(["greeting", "history_intake"])
    );
    assert!(!body["conversation_guidance"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_section_is_not_found_and_names_alternatives() {
    let app = app_with_script(Some(SCRIPT_YAML));
    let (status, body) = post(
        &app.router,
        "/script/section",
        json!({ "section_name": "closing" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("greeting"));
}

#[tokio::test]
async fn question_lookup_defaults_to_the_first_question() {
    let app = app_with_script(Some(SCRIPT_YAML));

    let (status, body) = post(&app.router, "/script/question", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["section"], "greeting");

    let (status, body) = post(&app.router, "/script/question", json!({ "question_id": 9 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains('9'));
}

#[tokio::test]
async fn empty_summary_request_is_a_bad_request() {
    let app = app_with_script(Some(SCRIPT_YAML));
    let (status, body) = post(&app.router, "/notes/summary", json!({ "transcript": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("required"));
}

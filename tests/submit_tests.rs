// tests/submit_tests.rs

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use quiz_notifier::{
    config::{
        Config, CredentialsProvider, NotificationCredentials, StaticCredentials, parse_api_base,
    },
    models::answer_key::AnswerKey,
    notify::{DeliveryError, NotificationSink},
    routes,
    state::AppState,
};

/// What the fake sink does when called.
#[derive(Clone)]
enum Script {
    Succeed,
    Fail(DeliveryError),
    Panic,
}

/// Notification sink that counts calls and records the last message.
struct RecordingSink {
    calls: AtomicUsize,
    last: Mutex<Option<(NotificationCredentials, String)>>,
    script: Script,
}

impl RecordingSink {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
            script,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_message(&self) -> Option<String> {
        self.last.lock().unwrap().as_ref().map(|(_, text)| text.clone())
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(
        &self,
        credentials: &NotificationCredentials,
        text: &str,
    ) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((credentials.clone(), text.to_string()));
        match &self.script {
            Script::Succeed => Ok(()),
            Script::Fail(e) => Err(e.clone()),
            Script::Panic => panic!("sink exploded"),
        }
    }
}

fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        telegram_api_base: parse_api_base("http://127.0.0.1:9").unwrap(),
        notify_timeout: Duration::from_secs(1),
        report_title: "English Test Result".to_string(),
    }
}

/// Credentials provider that blows up mid-request.
struct BrokenCredentials;

impl CredentialsProvider for BrokenCredentials {
    fn credentials(&self) -> Option<NotificationCredentials> {
        panic!("credential store unavailable")
    }
}

fn configured() -> StaticCredentials {
    StaticCredentials::new(Some("123:ABC"), Some("-100200300"))
}

/// Spawns the app on a random port and returns its base URL.
async fn spawn_app(
    credentials: impl CredentialsProvider + 'static,
    sink: Arc<RecordingSink>,
) -> String {
    let state = AppState {
        config: test_config(),
        credentials: Arc::new(credentials),
        sink,
        answer_key: Arc::new(AnswerKey::standard().clone()),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn sample_payload() -> serde_json::Value {
    serde_json::json!({
        "name": "Aziza",
        "group": "ENG-101",
        "score": 16,
        "percentage": 80,
        "time": 125,
        "leaves": 1,
        "timestamp": 1_700_000_000_000_i64
    })
}

fn assert_cors(response: &reqwest::Response) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}

#[tokio::test]
async fn valid_submission_is_sent() {
    // Arrange
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(&format!("{}/api/submit", address))
        .json(&sample_payload())
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    assert_cors(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["score"], 16);
    assert_eq!(body["percentage"], 80.0);
    assert_eq!(body["telegram"], "sent");
    assert!(body.get("delivery_error").is_none());

    assert_eq!(sink.calls(), 1);
    let message = sink.last_message().unwrap();
    assert!(message.contains("*Student:* Aziza"));
    assert!(message.contains("*Group:* ENG-101"));
    assert!(message.contains("16/20 (80%)"));
    assert!(message.contains("*Time:* 2:05"));
    assert!(message.contains("*Page Leaves:* 1"));
    assert!(message.contains("2023-11-14 22:13:20 UTC"));
    assert!(message.contains("EXCELLENT"));
    assert!(!message.contains("*Answers:*"));
}

#[tokio::test]
async fn sink_receives_configured_credentials() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;

    reqwest::Client::new()
        .post(&format!("{}/api/submit", address))
        .json(&sample_payload())
        .send()
        .await
        .expect("Failed to execute request");

    let (credentials, _) = sink.last.lock().unwrap().clone().unwrap();
    assert_eq!(credentials.bot_token, "123:ABC");
    assert_eq!(credentials.chat_id, "-100200300");
}

#[tokio::test]
async fn non_json_body_is_rejected_without_delivery() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/submit", address))
        .header("Content-Type", "text/plain")
        .body("name=Aziza&score=16")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert_cors(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON");
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn non_object_json_is_rejected() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/submit", address))
        .body("[1, 2, 3]")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn empty_body_is_missing_data() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;
    let client = reqwest::Client::new();

    for body in ["", "   ", "null"] {
        let response = client
            .post(&format!("{}/api/submit", address))
            .body(body)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 400, "body {:?}", body);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["error"], "Missing submission data");
    }
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn stringified_body_is_accepted() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;

    // The whole payload encoded as a JSON string, as some clients send it.
    let stringified = serde_json::to_string(&sample_payload().to_string()).unwrap();

    let response = reqwest::Client::new()
        .post(&format!("{}/api/submit", address))
        .header("Content-Type", "text/plain")
        .body(stringified)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 16);
    assert_eq!(sink.calls(), 1);
}

#[tokio::test]
async fn missing_credentials_skip_delivery() {
    let cases = [
        StaticCredentials::new(None, Some("-100200300")),
        StaticCredentials::new(Some("123:ABC"), None),
        StaticCredentials::new(None, None),
        StaticCredentials::new(Some("  "), Some("-100200300")),
    ];

    for credentials in cases {
        let sink = RecordingSink::new(Script::Succeed);
        let address = spawn_app(credentials, sink.clone()).await;

        let response = reqwest::Client::new()
            .post(&format!("{}/api/submit", address))
            .json(&sample_payload())
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["score"], 16);
        assert_eq!(body["telegram"], "not_configured");
        assert_eq!(body["message"], "Test recorded (Telegram not configured)");
        assert_eq!(sink.calls(), 0);
    }
}

#[tokio::test]
async fn failed_delivery_still_succeeds() {
    let failures = [
        DeliveryError::Rejected {
            status: 400,
            body: r#"{"ok":false,"description":"Bad Request: chat not found"}"#.to_string(),
        },
        DeliveryError::Timeout,
        DeliveryError::Transport("connection refused".to_string()),
    ];

    for failure in failures {
        let sink = RecordingSink::new(Script::Fail(failure.clone()));
        let address = spawn_app(configured(), sink.clone()).await;

        let response = reqwest::Client::new()
            .post(&format!("{}/api/submit", address))
            .json(&sample_payload())
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["score"], 16);
        assert_eq!(body["telegram"], "failed");
        assert_eq!(body["delivery_error"], failure.category());
        assert_eq!(sink.calls(), 1);
    }
}

#[tokio::test]
async fn rejected_delivery_hides_api_body_from_client() {
    let sink = RecordingSink::new(Script::Fail(DeliveryError::Rejected {
        status: 403,
        body: r#"{"ok":false,"description":"Forbidden: bot was kicked from the group chat"}"#
            .to_string(),
    }));
    let address = spawn_app(configured(), sink.clone()).await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/submit", address))
        .json(&sample_payload())
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let text = response.text().await.unwrap();
    assert!(!text.contains("kicked"), "{}", text);
    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["telegram"], "failed");
    assert_eq!(body["delivery_error"], "rejected (403)");
}

#[tokio::test]
async fn internal_fault_returns_500_with_cors() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(BrokenCredentials, sink.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/submit", address))
        .json(&sample_payload())
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 500);
    assert_cors(&response);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["message"], "credential store unavailable");
    assert_eq!(sink.calls(), 0);

    // The server keeps serving after the fault.
    let response = client
        .get(&format!("{}/api/health", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn panicking_sink_is_reported_as_failed_delivery() {
    let sink = RecordingSink::new(Script::Panic);
    let address = spawn_app(configured(), sink.clone()).await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/submit", address))
        .json(&sample_payload())
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["telegram"], "failed");
    assert_eq!(body["delivery_error"], "aborted");
}

#[tokio::test]
async fn preflight_returns_bare_ok() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, &format!("{}/api/submit", address))
        .header("Origin", "https://quiz.example.com")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    assert_cors(&response);
    assert!(response.bytes().await.unwrap().is_empty());
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;
    let client = reqwest::Client::new();

    for method in [reqwest::Method::GET, reqwest::Method::PUT, reqwest::Method::DELETE] {
        let response = client
            .request(method.clone(), &format!("{}/api/submit", address))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 405, "method {}", method);
        assert_cors(&response);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Method not allowed");
    }
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn answer_map_adds_per_question_section() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink.clone()).await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/submit", address))
        .json(&serde_json::json!({
            "studentName": "Bekzod",
            "className": "ENG-102",
            "score": 1,
            "percentage": 5,
            "timeSpent": 59,
            "answers": { "q1": "b", "q2": "x" }
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);

    let message = sink.last_message().unwrap();
    assert!(message.contains("*Student:* Bekzod"));
    assert!(message.contains("*Group:* ENG-102"));
    assert!(message.contains("*Time:* 0:59"));
    assert!(message.contains("NEEDS IMPROVEMENT"));
    assert!(message.contains("📋 *Answers:* 1/20 correct"));
    assert!(message.contains("1. ✅ b"));
    assert!(message.contains("2. ❌ x (correct: c)"));
    assert!(message.contains("3. ❌ No answer (correct: a)"));
}

#[tokio::test]
async fn health_check_works() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink).await;

    let response = reqwest::Client::new()
        .get(&format!("{}/api/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_path_is_404() {
    let sink = RecordingSink::new(Script::Succeed);
    let address = spawn_app(configured(), sink).await;

    let response = reqwest::Client::new()
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

use super::*;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::UserId;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
    send_payloads: Arc<Mutex<Vec<Value>>>,
    feed: Arc<Mutex<Vec<Value>>>,
    fail_feed: Arc<Mutex<bool>>,
}

async fn handle_login(Json(payload): Json<Value>) -> (StatusCode, Json<Value>) {
    if payload["password"] == "correct-horse" {
        (
            StatusCode::OK,
            Json(json!({"token": "t-123", "username": payload["username"]})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "unauthorized", "message": "INVALID_CREDENTIALS"})),
        )
    }
}

async fn handle_register(Json(payload): Json<Value>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({"token": "t-fresh", "username": payload["username"]})),
    )
}

async fn handle_feed(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.auth_headers.lock().await.push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
    );
    if *state.fail_feed.lock().await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"code": "internal", "message": "feed unavailable"})),
        );
    }
    let feed = state.feed.lock().await.clone();
    (StatusCode::OK, Json(Value::Array(feed)))
}

async fn handle_send(
    State(state): State<ServerState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.send_payloads.lock().await.push(payload.clone());
    (StatusCode::CREATED, Json(payload))
}

async fn spawn_service() -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/login/", post(handle_login))
        .route("/api/register/", post(handle_register))
        .route("/api/messages/", get(handle_feed).post(handle_send))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn feed_record(sender: &str, receiver: &str, sender_id: i64, receiver_id: i64, text: &str) -> Value {
    json!({
        "id": 1,
        "sender": sender_id,
        "receiver": receiver_id,
        "sender_username": sender,
        "receiver_username": receiver,
        "text": text,
        "timestamp": "2024-01-01T00:00:00Z",
    })
}

async fn logged_in_controller(server_url: &str) -> SessionController {
    let api = ApiClient::new(server_url).expect("client");
    let session = api.login("bob", "correct-horse").await.expect("login");
    SessionController::new(api, session)
}

#[tokio::test]
async fn login_yields_session_with_token_and_username() {
    let (server_url, _state) = spawn_service().await.expect("spawn server");
    let api = ApiClient::new(&server_url).expect("client");

    let session = api.login("bob", "correct-horse").await.expect("login");
    assert_eq!(session.token(), "t-123");
    assert_eq!(session.username(), "bob");
}

#[tokio::test]
async fn rejected_login_surfaces_service_message_and_requires_reauth() {
    let (server_url, _state) = spawn_service().await.expect("spawn server");
    let api = ApiClient::new(&server_url).expect("client");

    let err = api.login("bob", "wrong").await.expect_err("must fail");
    match &err {
        ClientError::Api { status, message } => {
            assert_eq!(*status, reqwest::StatusCode::UNAUTHORIZED);
            assert_eq!(message, "INVALID_CREDENTIALS");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.requires_reauth());
}

#[tokio::test]
async fn register_creates_a_session() {
    let (server_url, _state) = spawn_service().await.expect("spawn server");
    let api = ApiClient::new(&server_url).expect("client");

    let session = api
        .register(shared::protocol::RegisterRequest {
            username: "neo".into(),
            password: "follow-the-white-rabbit".into(),
            email: String::new(),
            location: "the matrix".into(),
            bio: String::new(),
        })
        .await
        .expect("register");
    assert_eq!(session.token(), "t-fresh");
    assert_eq!(session.username(), "neo");
}

#[test]
fn server_url_must_be_http_or_https() {
    assert!(matches!(
        ApiClient::new("ftp://example.com"),
        Err(ClientError::InvalidServerUrl(_))
    ));
    assert!(matches!(
        ApiClient::new("not a url"),
        Err(ClientError::InvalidServerUrl(_))
    ));
    let client = ApiClient::new("http://example.com/").expect("valid url");
    assert_eq!(client.server_url(), "http://example.com");
}

#[tokio::test]
async fn protected_calls_carry_the_token_header() {
    let (server_url, state) = spawn_service().await.expect("spawn server");
    let mut controller = logged_in_controller(&server_url).await;

    controller.refresh().await.expect("refresh");

    let headers = state.auth_headers.lock().await.clone();
    assert_eq!(headers, vec![Some("Token t-123".to_string())]);
}

#[tokio::test]
async fn refresh_builds_partner_directory_from_feed() {
    let (server_url, state) = spawn_service().await.expect("spawn server");
    *state.feed.lock().await = vec![
        feed_record("alice", "bob", 1, 2, "hello"),
        feed_record("bob", "alice", 2, 1, "hi back"),
        feed_record("carol", "bob", 3, 2, "ping"),
    ];
    let mut controller = logged_in_controller(&server_url).await;

    controller.refresh().await.expect("refresh");

    assert_eq!(controller.store().len(), 3);
    let names: Vec<&str> = controller
        .partners()
        .iter()
        .map(|p| p.display_name.as_str())
        .collect();
    assert_eq!(names, ["alice", "carol"]);
    assert_eq!(controller.partners()[0].identity, UserId(1));

    let thread = select_thread(controller.store(), "alice");
    assert_eq!(thread.len(), 2);
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_snapshot() {
    let (server_url, state) = spawn_service().await.expect("spawn server");
    *state.feed.lock().await = vec![feed_record("alice", "bob", 1, 2, "hello")];
    let mut controller = logged_in_controller(&server_url).await;
    controller.refresh().await.expect("first refresh");
    assert_eq!(controller.store().len(), 1);

    *state.fail_feed.lock().await = true;
    let err = controller.refresh().await.expect_err("must fail");
    assert!(matches!(err, ClientError::Api { .. }));

    assert_eq!(controller.store().len(), 1);
    assert_eq!(controller.partners().len(), 1);
}

#[tokio::test]
async fn send_posts_receiver_and_text_then_repulls() {
    let (server_url, state) = spawn_service().await.expect("spawn server");
    let mut controller = logged_in_controller(&server_url).await;

    let profile = shared::protocol::ProfileRecord {
        user: UserId(7),
        username: "trinity".into(),
        email: String::new(),
        location: String::new(),
        bio: String::new(),
        avatar: None,
    };
    let partner = Partner {
        display_name: "alice".into(),
        identity: UserId(3),
    };
    // Profile precedence over the lingering chat selection.
    let selection = SelectionContext::from_sources(Some(&profile), Some(&partner));

    controller.send(&selection, "wake up").await.expect("send");

    let payloads = state.send_payloads.lock().await.clone();
    assert_eq!(payloads, vec![json!({"receiver": 7, "text": "wake up"})]);
    // The follow-up re-pull hit the feed endpoint once.
    assert_eq!(state.auth_headers.lock().await.len(), 1);
}

#[tokio::test]
async fn send_succeeds_even_if_the_follow_up_repull_fails() {
    let (server_url, state) = spawn_service().await.expect("spawn server");
    *state.feed.lock().await = vec![feed_record("alice", "bob", 1, 2, "hello")];
    let mut controller = logged_in_controller(&server_url).await;
    controller.refresh().await.expect("first refresh");

    // Feed goes down between the dispatch and the re-pull.
    *state.fail_feed.lock().await = true;
    let partner = Partner {
        display_name: "alice".into(),
        identity: UserId(1),
    };
    let selection = SelectionContext::from_sources(None, Some(&partner));

    controller
        .send(&selection, "are you there")
        .await
        .expect("dispatch already succeeded");

    let payloads = state.send_payloads.lock().await.clone();
    assert_eq!(payloads, vec![json!({"receiver": 1, "text": "are you there"})]);
    // The pre-send snapshot stays in place until the next refresh.
    assert_eq!(controller.store().len(), 1);
}

#[tokio::test]
async fn send_without_target_is_blocked_before_any_request() {
    let (server_url, state) = spawn_service().await.expect("spawn server");
    let mut controller = logged_in_controller(&server_url).await;

    let selection = SelectionContext::from_sources(None, None);
    let err = controller
        .send(&selection, "to nobody")
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::Route(RouteError::NoTarget)));

    assert!(state.send_payloads.lock().await.is_empty());
    assert!(state.auth_headers.lock().await.is_empty());
}

#[tokio::test]
async fn malformed_feed_records_are_dropped_at_ingest() {
    let (server_url, state) = spawn_service().await.expect("spawn server");
    *state.feed.lock().await = vec![
        feed_record("alice", "bob", 1, 2, "ok"),
        json!({"sender": 1, "sender_username": "alice", "text": "no receiver"}),
        feed_record("bob", "alice", 2, 1, "also ok"),
    ];
    let mut controller = logged_in_controller(&server_url).await;

    controller.refresh().await.expect("refresh");

    assert_eq!(controller.store().len(), 2);
    let names: Vec<&str> = controller
        .partners()
        .iter()
        .map(|p| p.display_name.as_str())
        .collect();
    assert_eq!(names, ["alice"]);
}

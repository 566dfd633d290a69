//! End-to-end tests driving the router in-process with scripted
//! completion clients.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use codemate::config::ServerConfig;
use codemate::llm::{MockLlmClient, MockStep};
use codemate::storage::Storage;
use codemate::{AppCore, build_router};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    core: Arc<AppCore>,
    _tmp: TempDir,
}

fn test_app(llm: MockLlmClient, title_llm: MockLlmClient) -> TestApp {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("api.db");
    let config = ServerConfig::for_tests(db_path.to_str().unwrap());
    let storage = Arc::new(Storage::new(&config.database_path).unwrap());
    let core = Arc::new(AppCore {
        config,
        storage,
        llm: Arc::new(llm),
        title_llm: Arc::new(title_llm),
        mailer: None,
    });
    TestApp {
        router: build_router(core.clone()),
        core,
        _tmp: tmp,
    }
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, String) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Register, verify through the emailed token, log in, and return the
/// session cookie.
async fn register_and_login(app: &TestApp, email: &str) -> String {
    let (status, _) = send(
        app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "Ada",
                "email": email,
                "password": "password123",
                "confirmPassword": "password123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let user = app.core.storage.users.find_by_email(email).unwrap().unwrap();
    let token = user.verification_token.clone().unwrap();
    let (status, _) = send(
        app,
        request("GET", &format!("/api/auth/verify/{}", token), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "password123" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login should set a session cookie")
        .to_str()
        .unwrap();
    set_cookie
        .split(';')
        .next()
        .expect("cookie should have a value")
        .to_string()
}

fn parse_sse(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|frame| frame.trim().strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let app = test_app(MockLlmClient::new("chat"), MockLlmClient::new("title"));
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("codemate"));
}

#[tokio::test]
async fn test_full_turn_flow() {
    let app = test_app(
        MockLlmClient::from_steps("chat", vec![MockStep::stream(&["Hello", " world"])]),
        MockLlmClient::from_steps("title", vec![MockStep::text("Loop Fix")]),
    );
    let cookie = register_and_login(&app, "ada@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/chat",
            Some(&cookie),
            Some(json!({
                "message": "fix this loop",
                "language": "Python",
                "action": "debug",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let events = parse_sse(&String::from_utf8(bytes.to_vec()).unwrap());

    // Token events in order, then the terminal completion
    assert_eq!(events[0]["token"], "Hello");
    assert_eq!(events[1]["token"], " world");
    let last = events.last().unwrap();
    assert_eq!(last["assistantMessage"], "Hello world");
    assert_eq!(last["chatId"], last["newChatId"]);
    let chat_id = last["chatId"].as_str().unwrap().to_string();

    // The chat is listed with its generated title
    let (status, body) = send(&app, request("GET", "/api/chats", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listed["data"][0]["id"], chat_id.as_str());
    assert_eq!(listed["data"][0]["title"], "Loop Fix");

    // And holds both messages
    let (status, body) = send(
        &app,
        request("GET", &format!("/api/chats/{}", chat_id), Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let chat: Value = serde_json::from_str(&body).unwrap();
    let messages = chat["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "fix this loop");
    assert_eq!(messages[1]["content"], "Hello world");
}

#[tokio::test]
async fn test_follow_up_turn_keeps_chat() {
    let app = test_app(
        MockLlmClient::from_steps(
            "chat",
            vec![
                MockStep::stream(&["first"]),
                MockStep::stream(&["second"]),
            ],
        ),
        MockLlmClient::from_steps("title", vec![MockStep::text("Sort Help")]),
    );
    let cookie = register_and_login(&app, "ada@example.com").await;

    let (_, body) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            Some(&cookie),
            Some(json!({ "message": "sort a list", "language": "Rust", "action": "analyze" })),
        ),
    )
    .await;
    let events = parse_sse(&body);
    let chat_id = events.last().unwrap()["chatId"].as_str().unwrap().to_string();

    let (_, body) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            Some(&cookie),
            Some(json!({
                "message": "and in reverse?",
                "language": "Rust",
                "action": "analyze",
                "chatId": chat_id,
            })),
        ),
    )
    .await;
    let events = parse_sse(&body);
    let last = events.last().unwrap();
    assert_eq!(last["chatId"], chat_id.as_str());
    assert!(last.get("newChatId").is_none());

    let stored = app.core.storage.chats.get(&chat_id).unwrap().unwrap();
    assert_eq!(stored.messages.len(), 4);
    // Follow-up turns keep the title from the first turn
    assert_eq!(stored.title, "Sort Help");
}

#[tokio::test]
async fn test_turn_requires_session() {
    let app = test_app(MockLlmClient::new("chat"), MockLlmClient::new("title"));
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            None,
            Some(json!({ "message": "hi", "language": "Go", "action": "debug" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/api/chats", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_turn_rejects_foreign_chat() {
    let app = test_app(
        MockLlmClient::from_steps("chat", vec![MockStep::stream(&["mine"])]),
        MockLlmClient::from_steps("title", vec![MockStep::text("My Chat")]),
    );
    let ada = register_and_login(&app, "ada@example.com").await;
    let bob = register_and_login(&app, "bob@example.com").await;

    let (_, body) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            Some(&ada),
            Some(json!({ "message": "secret", "language": "C", "action": "analyze" })),
        ),
    )
    .await;
    let chat_id = parse_sse(&body).last().unwrap()["chatId"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            Some(&bob),
            Some(json!({
                "message": "mine now",
                "language": "C",
                "action": "analyze",
                "chatId": chat_id,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request("GET", &format!("/api/chats/{}", chat_id), Some(&bob), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_custom_action_requires_instruction() {
    let app = test_app(MockLlmClient::new("chat"), MockLlmClient::new("title"));
    let cookie = register_and_login(&app, "ada@example.com").await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            Some(&cookie),
            Some(json!({ "message": "do it", "language": "Go", "action": "custom" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Rejected before anything was written
    assert!(
        app.core
            .storage
            .chats
            .list_recent_for_owner(
                &app.core
                    .storage
                    .users
                    .find_by_email("ada@example.com")
                    .unwrap()
                    .unwrap()
                    .id
            )
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_upstream_error_is_streamed() {
    let app = test_app(
        MockLlmClient::from_steps(
            "chat",
            vec![MockStep::stream_then_error(&["part"], "connection reset")],
        ),
        MockLlmClient::new("title"),
    );
    let cookie = register_and_login(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            Some(&cookie),
            Some(json!({ "message": "hello", "language": "Go", "action": "debug" })),
        ),
    )
    .await;

    // Headers were already sent, so the failure arrives inside the stream
    assert_eq!(status, StatusCode::OK);
    let events = parse_sse(&body);
    assert_eq!(events[0]["token"], "part");
    assert!(events.last().unwrap().get("error").is_some());
}

#[tokio::test]
async fn test_login_failures() {
    let app = test_app(MockLlmClient::new("chat"), MockLlmClient::new("title"));

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "Ada",
                "email": "ada@example.com",
                "password": "password123",
                "confirmPassword": "password123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Not verified yet
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "password123" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user = app
        .core
        .storage
        .users
        .find_by_email("ada@example.com")
        .unwrap()
        .unwrap();
    let token = user.verification_token.clone().unwrap();
    send(
        &app,
        request("GET", &format!("/api/auth/verify/{}", token), None, None),
    )
    .await;

    // Wrong password
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown account
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "password123" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_mismatch_and_duplicates() {
    let app = test_app(MockLlmClient::new("chat"), MockLlmClient::new("title"));

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "Ada",
                "email": "ada@example.com",
                "password": "password123",
                "confirmPassword": "different456",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    register_and_login(&app, "ada@example.com").await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "Ada2",
                "email": "ada@example.com",
                "password": "password123",
                "confirmPassword": "password123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_chat() {
    let app = test_app(
        MockLlmClient::from_steps("chat", vec![MockStep::stream(&["gone soon"])]),
        MockLlmClient::from_steps("title", vec![MockStep::text("Short Lived")]),
    );
    let cookie = register_and_login(&app, "ada@example.com").await;

    let (_, body) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            Some(&cookie),
            Some(json!({ "message": "hi", "language": "Go", "action": "analyze" })),
        ),
    )
    .await;
    let chat_id = parse_sse(&body).last().unwrap()["chatId"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = send(
        &app,
        request(
            "DELETE",
            &format!("/api/chats/{}", chat_id),
            Some(&cookie),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request("GET", &format!("/api/chats/{}", chat_id), Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_account_removes_chats() {
    let app = test_app(
        MockLlmClient::from_steps("chat", vec![MockStep::stream(&["bye"])]),
        MockLlmClient::from_steps("title", vec![MockStep::text("Farewell Chat")]),
    );
    let cookie = register_and_login(&app, "ada@example.com").await;

    let (_, body) = send(
        &app,
        request(
            "POST",
            "/api/chat",
            Some(&cookie),
            Some(json!({ "message": "hi", "language": "Go", "action": "analyze" })),
        ),
    )
    .await;
    let chat_id = parse_sse(&body).last().unwrap()["chatId"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = send(
        &app,
        request("DELETE", "/api/auth/account", Some(&cookie), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(app.core.storage.chats.get(&chat_id).unwrap().is_none());
    assert!(
        app.core
            .storage
            .users
            .find_by_email("ada@example.com")
            .unwrap()
            .is_none()
    );

    // The old session no longer works
    let (status, _) = send(&app, request("GET", "/api/auth/me", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_profile() {
    let app = test_app(MockLlmClient::new("chat"), MockLlmClient::new("title"));
    let cookie = register_and_login(&app, "ada@example.com").await;

    let (status, body) = send(&app, request("GET", "/api/auth/me", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    let profile: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(profile["data"]["email"], "ada@example.com");
    assert_eq!(profile["data"]["displayName"], "Ada");
    assert_eq!(profile["data"]["isVerified"], true);
}

//! Admin token handling and chat presets over HTTP.

#![allow(clippy::unwrap_used)]

use serde_json::{Value, json};

use bazaar_integration_tests::{TOKEN_HEADER, TestApp};

fn preset_body() -> Value {
    json!({
        "question": "Where is my order?",
        "responses": ["Check the Orders page."],
        "keywords": [" Order ", "track"]
    })
}

async fn send(
    app: &TestApp,
    method: reqwest::Method,
    path: &str,
    body: Option<&Value>,
    token: &str,
) -> (u16, Value) {
    let mut request = app
        .client
        .request(method, format!("{}{path}", app.base_url))
        .header(TOKEN_HEADER, token);
    if let Some(body) = body {
        request = request.json(body);
    }
    let response = request.send().await.unwrap();
    (response.status().as_u16(), response.json().await.unwrap())
}

#[tokio::test]
async fn test_admin_login() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(
            "/api/user/admin",
            &json!({ "email": "admin@bazaar.test", "password": "wrong" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Invalid Credentials, Try entering the correct email and password"
    );

    assert!(!app.admin_token().await.is_empty());
}

#[tokio::test]
async fn test_admin_and_user_tokens_are_not_interchangeable() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let user = app.create_account("Ada", "ada@example.com", "correct-horse").await;

    // Admin token on a user route.
    let (status, body) = app.post("/api/user/profile", &json!({}), Some(&admin)).await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Not Authorized Login Again");

    // User token on an admin route.
    let (status, _) = send(&app, reqwest::Method::GET, "/api/chats/presets", None, &user).await;
    assert_eq!(status, 401);

    // Each works where it belongs.
    let (status, _) = send(&app, reqwest::Method::GET, "/api/chats/presets", None, &admin).await;
    assert_eq!(status, 200);
    let (status, _) = app.post("/api/user/profile", &json!({}), Some(&user)).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_preset_crud() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let (status, body) = send(
        &app,
        reqwest::Method::POST,
        "/api/chats/presets",
        Some(&preset_body()),
        &admin,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["preset"]["keywords"], json!(["order", "track"]));
    let id = body["preset"]["_id"].as_i64().unwrap();

    let mut updated = preset_body();
    updated["question"] = json!("Where is my parcel?");
    let (_, body) = send(
        &app,
        reqwest::Method::PUT,
        &format!("/api/chats/presets/{id}"),
        Some(&updated),
        &admin,
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["preset"]["question"], "Where is my parcel?");

    let (_, body) = send(&app, reqwest::Method::GET, "/api/chats/presets", None, &admin).await;
    assert_eq!(body["presets"].as_array().unwrap().len(), 1);

    let path = format!("/api/chats/presets/{id}");
    let (_, body) = send(&app, reqwest::Method::DELETE, &path, None, &admin).await;
    assert_eq!(body["success"], true);

    let (status, body) = send(&app, reqwest::Method::DELETE, &path, None, &admin).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Preset not found");
}

#[tokio::test]
async fn test_invalid_preset_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let mut body = preset_body();
    body["keywords"] = json!(["  "]);
    let (status, body) = send(
        &app,
        reqwest::Method::POST,
        "/api/chats/presets",
        Some(&body),
        &admin,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "At least one keyword is required");
}

#[tokio::test]
async fn test_reply_matches_keyword_or_falls_back() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let user = app.create_account("Ada", "ada@example.com", "correct-horse").await;
    send(
        &app,
        reqwest::Method::POST,
        "/api/chats/presets",
        Some(&preset_body()),
        &admin,
    )
    .await;

    let (_, body) = app
        .post(
            "/api/chats/reply",
            &json!({ "message": "Can I TRACK my package?" }),
            Some(&user),
        )
        .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["reply"], "Check the Orders page.");

    let (_, body) = app
        .post("/api/chats/reply", &json!({ "message": "hello" }), Some(&user))
        .await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["reply"],
        bazaar_server::services::chat_presets::FALLBACK_REPLY
    );

    let (status, _) = app
        .post("/api/chats/reply", &json!({ "message": "hello" }), None)
        .await;
    assert_eq!(status, 401);
}

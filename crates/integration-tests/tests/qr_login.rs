//! One-time token (QR) login over HTTP.

#![allow(clippy::unwrap_used)]

use serde_json::json;

use bazaar_integration_tests::TestApp;

async fn profile_qr(app: &TestApp, session: &str) -> (i64, String) {
    let (_, body) = app.post("/api/user/profile", &json!({}), Some(session)).await;
    (
        body["user"]["id"].as_i64().unwrap(),
        body["user"]["oneTimeLoginToken"].as_str().unwrap().to_owned(),
    )
}

#[tokio::test]
async fn test_qr_token_logs_in_once() {
    let app = TestApp::spawn().await;
    let session = app.create_account("Ada", "ada@example.com", "correct-horse").await;
    let (user_id, qr) = profile_qr(&app, &session).await;

    let request = json!({ "userId": user_id, "token": qr, "deviceId": "198.51.100.4" });
    let (status, body) = app.post("/api/user/qrlogin", &request, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Login successful from a new device");

    let new_session = body["token"].as_str().unwrap().to_owned();
    let (status, _) = app
        .post("/api/user/profile", &json!({}), Some(&new_session))
        .await;
    assert_eq!(status, 200);

    // Reuse is rejected.
    let (_, body) = app.post("/api/user/qrlogin", &request, None).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "QR Invalid");
}

#[tokio::test]
async fn test_profile_reissues_after_consumption() {
    let app = TestApp::spawn().await;
    let session = app.create_account("Ada", "ada@example.com", "correct-horse").await;
    let (user_id, first) = profile_qr(&app, &session).await;

    // Same token while it is live.
    assert_eq!(profile_qr(&app, &session).await.1, first);

    app.post(
        "/api/user/qrlogin",
        &json!({ "userId": user_id.to_string(), "token": first }),
        None,
    )
    .await;

    let (_, second) = profile_qr(&app, &session).await;
    assert_ne!(second, first);
}

#[tokio::test]
async fn test_qr_token_must_match_stored_token() {
    let app = TestApp::spawn().await;
    let ada = app.create_account("Ada", "ada@example.com", "correct-horse").await;
    let bob = app.create_account("Bob", "bob@example.com", "correct-horse").await;
    let (ada_id, ada_qr) = profile_qr(&app, &ada).await;
    let (bob_id, _) = profile_qr(&app, &bob).await;

    for request in [
        json!({ "userId": ada_id, "token": "garbage" }),
        json!({ "userId": bob_id, "token": ada_qr }),
        // A session token is not a one-time token.
        json!({ "userId": ada_id, "token": ada }),
        json!({ "userId": "not-a-number", "token": ada_qr }),
    ] {
        let (status, body) = app.post("/api/user/qrlogin", &request, None).await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], false, "accepted {request}");
        assert_eq!(body["message"], "QR Invalid");
    }

    // Ada's token is still usable after the failed attempts.
    let (_, body) = app
        .post(
            "/api/user/qrlogin",
            &json!({ "userId": ada_id, "token": ada_qr }),
            None,
        )
        .await;
    assert_eq!(body["success"], true);
}

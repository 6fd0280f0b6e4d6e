//! Signup and code confirmation over HTTP.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use serde_json::json;

use bazaar_core::{Email, VerificationCode};
use bazaar_integration_tests::TestApp;
use bazaar_server::db::PendingRegistrationRepository;
use bazaar_server::models::NewPendingRegistration;

#[tokio::test]
async fn test_register_then_verify_creates_account() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(
            "/api/user/register",
            &json!({ "name": "Ada", "email": "Ada@Example.com", "password": "correct-horse" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "OTP sent to your email");

    let code = app.pending_code("ada@example.com").await;
    let (status, body) = app
        .post(
            "/api/user/verifyotp",
            &json!({ "email": "ada@example.com", "otp": code }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    // The pending record is gone once confirmed.
    let email = Email::parse("ada@example.com").unwrap();
    assert!(app.store.get_pending(&email).await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_register_does_not_resend() {
    let app = TestApp::spawn().await;
    let body = json!({ "name": "Ada", "email": "ada@example.com", "password": "correct-horse" });

    let (_, first) = app.post("/api/user/register", &body, None).await;
    assert_eq!(first["message"], "OTP sent to your email");
    let code = app.pending_code("ada@example.com").await;

    let (status, second) = app.post("/api/user/register", &body, None).await;
    assert_eq!(status, 200);
    assert_eq!(second["success"], true);
    assert_eq!(second["message"], "OTP already sent to your email");

    // Same pending record, same code.
    assert_eq!(app.pending_code("ada@example.com").await, code);
}

#[tokio::test]
async fn test_register_existing_account_rejected() {
    let app = TestApp::spawn().await;
    app.create_account("Ada", "ada@example.com", "correct-horse").await;

    let (status, body) = app
        .post(
            "/api/user/register",
            &json!({ "name": "Ada", "email": "ada@example.com", "password": "another-pass" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::spawn().await;

    let (_, body) = app
        .post(
            "/api/user/register",
            &json!({ "name": "Ada", "email": "not-an-email", "password": "correct-horse" }),
            None,
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Please enter a valid email");

    let (_, body) = app
        .post(
            "/api/user/register",
            &json!({ "name": "Ada", "email": "ada@example.com", "password": "short" }),
            None,
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Please enter a strong password");
}

#[tokio::test]
async fn test_register_missing_field_is_json_400() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(
            "/api/user/register",
            &json!({ "name": "Ada", "email": "ada@example.com" }),
            None,
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert!(
        body["message"].as_str().unwrap().contains("password"),
        "unexpected message: {body}"
    );
}

#[tokio::test]
async fn test_register_while_pending_skips_password_check() {
    let app = TestApp::spawn().await;
    app.post(
        "/api/user/register",
        &json!({ "name": "Lin", "email": "lin@example.com", "password": "plum-orchard-7" }),
        None,
    )
    .await;
    let code = app.pending_code("lin@example.com").await;

    // A retry with a different, weak password still just says the code is on its way.
    let (status, body) = app
        .post(
            "/api/user/register",
            &json!({ "name": "Lin", "email": "lin@example.com", "password": "abc" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "OTP already sent to your email");
    assert_eq!(app.pending_code("lin@example.com").await, code);
}

#[tokio::test]
async fn test_wrong_code_rejected_and_record_kept() {
    let app = TestApp::spawn().await;
    app.post(
        "/api/user/register",
        &json!({ "name": "Ada", "email": "ada@example.com", "password": "correct-horse" }),
        None,
    )
    .await;
    let code = app.pending_code("ada@example.com").await;
    let wrong = if code == "111111" { "222222" } else { "111111" };

    let (status, body) = app
        .post(
            "/api/user/verifyotp",
            &json!({ "email": "ada@example.com", "otp": wrong }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid OTP");

    // The right code still works afterwards.
    let (_, body) = app
        .post(
            "/api/user/verifyotp",
            &json!({ "email": "ada@example.com", "otp": code }),
            None,
        )
        .await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_expired_code_rejected() {
    let app = TestApp::spawn().await;
    let email = Email::parse("late@example.com").unwrap();
    app.store
        .create_pending(&NewPendingRegistration {
            name: "Late".to_owned(),
            email: email.clone(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_owned(),
            code: VerificationCode::parse("123456").unwrap(),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    let (status, body) = app
        .post(
            "/api/user/verifyotp",
            &json!({ "email": "late@example.com", "otp": "123456" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "OTP expired, please register again");

    // Registering again starts fresh.
    let (_, body) = app
        .post(
            "/api/user/register",
            &json!({ "name": "Late", "email": "late@example.com", "password": "correct-horse" }),
            None,
        )
        .await;
    assert_eq!(body["message"], "OTP sent to your email");
}

#[tokio::test]
async fn test_verify_without_pending() {
    let app = TestApp::spawn().await;
    let (_, body) = app
        .post(
            "/api/user/verifyotp",
            &json!({ "email": "nobody@example.com", "otp": "123456" }),
            None,
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No pending registration found");
}

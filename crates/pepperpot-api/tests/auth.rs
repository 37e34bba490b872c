mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn signup_verify_and_login() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/auth/signup",
            None,
            json!({ "email": "Chef@Example.com", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 8 characters long");

    let (status, body) = app
        .post(
            "/auth/signup",
            None,
            json!({ "email": "Chef@Example.com", "password": "mise-en-place", "name": "Chef" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["email"], "chef@example.com");

    let (status, body) = app
        .post(
            "/auth/signup",
            None,
            json!({ "email": "chef@example.com", "password": "mise-en-place" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User with this email already exists");

    let token = {
        let sent = app.mailer.verifications.lock().unwrap();
        assert_eq!(sent.len(), 1);
        sent[0].1.clone()
    };

    let (status, _) = app.post("/auth/verify-email", None, json!({ "token": "nope" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/auth/verify-email", None, json!({ "token": token })).await;
    assert_eq!(status, StatusCode::OK);
    // Tokens are single use.
    let (status, _) = app.post("/auth/verify-email", None, json!({ "token": token })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "chef@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "chef@example.com", "password": "mise-en-place" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let session = body["token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/me", Some(&session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "chef@example.com");
    assert_eq!(me["email_verified"], true);
    assert_eq!(me["role"], "USER");
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() {
    let app = TestApp::new();
    app.post(
        "/auth/signup",
        None,
        json!({ "email": "cook@example.com", "password": "first-password" }),
    )
    .await;

    let (known_status, known) = app
        .post("/auth/forgot-password", None, json!({ "email": "cook@example.com" }))
        .await;
    let (unknown_status, unknown) = app
        .post("/auth/forgot-password", None, json!({ "email": "ghost@example.com" }))
        .await;
    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known, unknown);

    let reset_token = {
        let resets = app.mailer.resets.lock().unwrap();
        assert_eq!(resets.len(), 1);
        resets[0].1.clone()
    };

    let (status, _) = app
        .post(
            "/auth/reset-password",
            None,
            json!({ "token": reset_token, "password": "second-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "cook@example.com", "password": "second-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new();
    let (status, body) = app.get("/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = app.get("/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn influencer_profile_defaults_to_account_name() {
    let app = TestApp::new();
    let (_, token) = app.user("baker@example.com");

    let (status, body) = app.post("/influencers/profile", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "baker@example.com");

    let (_, me) = app.get("/me", Some(&token)).await;
    assert_eq!(me["influencer"]["display_name"], "baker@example.com");
}

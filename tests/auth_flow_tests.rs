// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signup, OTP generation, and OTP verification through the router.

use axum::http::StatusCode;
use cabhop::config::Config;
use cabhop::middleware::auth::verify_jwt;
use serde_json::json;

mod common;
use common::{create_test_app, create_test_app_with, send_json, signup_and_login};

fn signup_body(email: &str, phone: &str) -> serde_json::Value {
    json!({ "email": email, "name": "A", "phoneNumber": phone })
}

#[tokio::test]
async fn test_signup_creates_user_and_pending_otp() {
    let (app, state) = create_test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/signup",
        None,
        signup_body("a@b.com", "9876543210"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["message"].is_string());
    assert!(body.get("token").is_none(), "signup must not issue a session");

    let id = body["id"].as_str().unwrap();
    let user = state.db.get_user(id).await.unwrap().expect("user stored");
    assert_eq!(user.phone_number, "9876543210");
    assert_eq!(user.email, "a@b.com");
    assert!(state.kv.get(&format!("otp:{}", id)).is_some());
}

#[tokio::test]
async fn test_duplicate_phone_conflicts() {
    let (app, _) = create_test_app();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/signup",
        None,
        signup_body("a@b.com", "9876543210"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/signup",
        None,
        signup_body("different@b.com", "9876543210"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let (app, _) = create_test_app();

    send_json(
        &app,
        "POST",
        "/api/v1/signup",
        None,
        signup_body("a@b.com", "9876543210"),
    )
    .await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/signup",
        None,
        signup_body("a@b.com", "1111111111"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation() {
    let (app, _) = create_test_app();

    for body in [
        signup_body("not-an-email", "9876543210"),
        signup_body("a@b.com", "12345"),
        json!({ "email": "a@b.com", "name": "", "phoneNumber": "9876543210" }),
        json!({ "email": "a@b.com", "phoneNumber": "9876543210" }),
    ] {
        let (status, response) = send_json(&app, "POST", "/api/v1/signup", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", response);
        assert_eq!(response["error"], "bad_request");
    }
}

#[tokio::test]
async fn test_verify_mismatch_rejected() {
    let (app, state) = create_test_app();

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/v1/signup",
        None,
        signup_body("a@b.com", "9876543210"),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();
    let code = state.otp_service.issue(&id).unwrap();
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/verify-otp",
        None,
        json!({ "id": id, "otp": wrong }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "otp_mismatch");
}

#[tokio::test]
async fn test_verify_without_otp_is_expired() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/verify-otp",
        None,
        json!({ "id": "no-such-user", "otp": "123456" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "otp_expired");
}

#[tokio::test]
async fn test_verify_issues_session_and_is_repeatable() {
    let (app, state) = create_test_app();
    let (user_id, token) = signup_and_login(&app, &state, "9876543210").await;

    let claims = verify_jwt(&token, &state.config.jwt_signing_key).unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.role, "user");

    // The same code keeps working until its TTL elapses.
    let code = state.otp_service.issue(&user_id).unwrap();
    for _ in 0..2 {
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/verify-otp",
            None,
            json!({ "id": user_id, "otp": code }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());
    }
}

#[tokio::test]
async fn test_single_use_mode_consumes_otp() {
    let config = Config {
        otp_single_use: true,
        ..Config::test_default()
    };
    let (app, state) = create_test_app_with(config);
    let (user_id, _) = signup_and_login(&app, &state, "9876543210").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/verify-otp",
        None,
        json!({ "id": user_id, "otp": "123456" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "otp_expired");
}

#[tokio::test]
async fn test_generate_otp_for_known_phone() {
    let (app, state) = create_test_app();
    let (user_id, _) = signup_and_login(&app, &state, "9876543210").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/generate-otp",
        None,
        json!({ "phoneNumber": "9876543210" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id);
    assert!(body.get("otp").is_none(), "OTP must never be returned");
    assert!(state.kv.get(&format!("otp:{}", user_id)).is_some());
}

#[tokio::test]
async fn test_generate_otp_unknown_phone() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/generate-otp",
        None,
        json!({ "phoneNumber": "0000000000" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_generate_otp_malformed_phone() {
    let (app, _) = create_test_app();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/generate-otp",
        None,
        json!({ "phoneNumber": "12-34" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

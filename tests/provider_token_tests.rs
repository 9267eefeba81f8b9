// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Linking and unlinking provider access tokens.

use axum::http::StatusCode;
use cabhop::models::Provider;
use serde_json::json;

mod common;
use common::{create_test_app, send_json, signup_and_login};

#[tokio::test]
async fn test_link_overwrite_and_unlink() {
    let (app, state) = create_test_app();
    let (user_id, token) = signup_and_login(&app, &state, "9876543210").await;

    let (status, _) = send_json(
        &app,
        "PATCH",
        "/api/v1/set-accessToken",
        Some(&token),
        json!({ "accessToken": "ola-1", "name": "OLA" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        "PATCH",
        "/api/v1/set-accessToken",
        Some(&token),
        json!({ "accessToken": "ola-2", "name": "OLA" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let user = state.db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.access_token(Provider::Ola), Some("ola-2"));
    assert_eq!(user.access_token(Provider::Uber), None);

    let (status, body) = send_json(
        &app,
        "PATCH",
        "/api/v1/unlink-accessToken",
        Some(&token),
        json!({ "fieldToNull": "OLA" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let user = state.db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.access_token(Provider::Ola), None);
}

#[tokio::test]
async fn test_all_four_providers_link_and_unlink() {
    let (app, state) = create_test_app();
    let (user_id, token) = signup_and_login(&app, &state, "9876543210").await;

    for provider in Provider::ALL {
        let (status, _) = send_json(
            &app,
            "PATCH",
            "/api/v1/set-accessToken",
            Some(&token),
            json!({ "accessToken": format!("tok-{}", provider), "name": provider.as_str() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "link {}", provider);
    }

    let user = state.db.get_user(&user_id).await.unwrap().unwrap();
    for provider in Provider::ALL {
        assert_eq!(
            user.access_token(provider),
            Some(format!("tok-{}", provider).as_str())
        );
    }

    for provider in Provider::ALL {
        let (status, _) = send_json(
            &app,
            "PATCH",
            "/api/v1/unlink-accessToken",
            Some(&token),
            json!({ "fieldToNull": provider.as_str() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "unlink {}", provider);
    }

    let user = state.db.get_user(&user_id).await.unwrap().unwrap();
    assert!(Provider::ALL
        .iter()
        .all(|p| user.access_token(*p).is_none()));
}

#[tokio::test]
async fn test_unknown_provider_rejected() {
    let (app, state) = create_test_app();
    let (_, token) = signup_and_login(&app, &state, "9876543210").await;

    let (status, body) = send_json(
        &app,
        "PATCH",
        "/api/v1/set-accessToken",
        Some(&token),
        json!({ "accessToken": "x", "name": "LYFT" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = send_json(
        &app,
        "PATCH",
        "/api/v1/unlink-accessToken",
        Some(&token),
        json!({ "fieldToNull": "email" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_access_token_rejected() {
    let (app, state) = create_test_app();
    let (_, token) = signup_and_login(&app, &state, "9876543210").await;

    let (status, _) = send_json(
        &app,
        "PATCH",
        "/api/v1/set-accessToken",
        Some(&token),
        json!({ "accessToken": "", "name": "UBER" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    routing::get,
    Json, Router,
};
use cabhop::config::Config;
use cabhop::db::FirestoreDb;
use cabhop::routes::create_router;
use cabhop::AppState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app with the in-memory directory.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::new(config, FirestoreDb::new_in_memory()).expect("Failed to build state"),
    );
    (create_router(state.clone()), state)
}

/// Config pointing the Ola client at a local mock.
#[allow(dead_code)]
pub fn config_for_ola(base_url: &str) -> Config {
    Config {
        ola_api_base_url: base_url.to_string(),
        ..Config::test_default()
    }
}

/// Send a JSON request and return status + parsed body (Null if empty).
#[allow(dead_code)]
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Sign up a user and run the OTP flow. Returns (user_id, session token).
#[allow(dead_code)]
pub async fn signup_and_login(app: &Router, state: &AppState, phone: &str) -> (String, String) {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/signup",
        None,
        serde_json::json!({
            "email": format!("{}@example.com", phone),
            "name": "Test Rider",
            "phoneNumber": phone,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    let user_id = body["id"].as_str().unwrap().to_string();

    // Reissue to learn the code; the delivery channel is not part of the API.
    let code = state.otp_service.issue(&user_id).unwrap();

    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/verify-otp",
        None,
        serde_json::json!({ "id": user_id, "otp": code }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "verify failed: {}", body);

    (user_id, body["token"].as_str().unwrap().to_string())
}

// ─── Mock Ola API ────────────────────────────────────────────

#[derive(Clone)]
struct MockOlaState {
    status: StatusCode,
    body: Value,
    calls: Arc<AtomicUsize>,
    last_query: Arc<Mutex<HashMap<String, String>>>,
    last_auth: Arc<Mutex<Option<String>>>,
}

/// Local stand-in for the Ola products endpoint.
#[allow(dead_code)]
pub struct MockOla {
    pub base_url: String,
    calls: Arc<AtomicUsize>,
    last_query: Arc<Mutex<HashMap<String, String>>>,
    last_auth: Arc<Mutex<Option<String>>>,
}

#[allow(dead_code)]
impl MockOla {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> HashMap<String, String> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn last_auth(&self) -> Option<String> {
        self.last_auth.lock().unwrap().clone()
    }
}

async fn mock_products(
    State(mock): State<MockOlaState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    mock.calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_query.lock().unwrap() = query;
    *mock.last_auth.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    (mock.status, Json(mock.body.clone()))
}

/// Start a mock Ola server that answers every request with `status` and `body`.
#[allow(dead_code)]
pub async fn spawn_mock_ola(status: StatusCode, body: Value) -> MockOla {
    let calls = Arc::new(AtomicUsize::new(0));
    let last_query = Arc::new(Mutex::new(HashMap::new()));
    let last_auth = Arc::new(Mutex::new(None));

    let state = MockOlaState {
        status,
        body,
        calls: calls.clone(),
        last_query: last_query.clone(),
        last_auth: last_auth.clone(),
    };

    let app = Router::new()
        .route("/v1/products", get(mock_products))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockOla {
        base_url: format!("http://{}", addr),
        calls,
        last_query,
        last_auth,
    }
}

/// A typical successful products response.
#[allow(dead_code)]
pub fn ola_products_body() -> Value {
    serde_json::json!({
        "categories": [
            {"id": "micro", "display_name": "Micro", "eta": 3},
            {"id": "mini", "display_name": "Mini", "eta": 6}
        ],
        "ride_estimate": [
            {"category": "micro", "upfront": {"fare": 110}},
            {"category": "mini", "upfront": {"fare": 155.5}}
        ]
    })
}

/// Quote request body with valid coordinates.
#[allow(dead_code)]
pub fn ride_body() -> Value {
    serde_json::json!({
        "pickup_lat": 12.9716,
        "pickup_lng": 77.5946,
        "drop_lat": 12.9352,
        "drop_lng": 77.6245
    })
}

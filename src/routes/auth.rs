// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Phone + OTP authentication routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::models::User;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/signup", post(signup))
        .route("/api/v1/generate-otp", post(generate_otp))
        .route("/api/v1/verify-otp", post(verify_otp))
}

/// Phone numbers are exactly ten ASCII digits.
fn validate_phone_number(phone: &str) -> std::result::Result<(), ValidationError> {
    if phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone_number")
            .with_message(Cow::Borrowed("Phone number must be exactly 10 digits")))
    }
}

// ─── Signup ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(custom(function = validate_phone_number))]
    pub phone_number: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignUpResponse {
    pub message: String,
    /// Needed by the client to call verify-otp
    pub id: String,
}

/// Create an account and issue its first OTP.
async fn signup(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignUpResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let user = User::new(req.email, req.name, req.phone_number);
    state.db.create_user(&user).await?;

    // Separate write: if this fails the account exists without a pending
    // OTP, and generate-otp recovers it.
    state.otp_service.issue(&user.id)?;

    tracing::info!(user_id = %user.id, "User signed up, OTP pending");

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            message: "User created. Verify the OTP to continue.".to_string(),
            id: user.id,
        }),
    ))
}

// ─── OTP Generation ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOtpRequest {
    #[validate(custom(function = validate_phone_number))]
    pub phone_number: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GenerateOtpResponse {
    pub message: String,
    pub id: String,
}

/// Issue a new OTP for an existing phone number, replacing any pending one.
async fn generate_otp(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<GenerateOtpRequest>, JsonRejection>,
) -> Result<Json<GenerateOtpResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let user = state
        .db
        .find_user_by_phone(&req.phone_number)
        .await?
        .ok_or_else(|| AppError::NotFound("No user with this phone number".to_string()))?;

    state.otp_service.issue(&user.id)?;

    tracing::info!(user_id = %user.id, "OTP regenerated");

    Ok(Json(GenerateOtpResponse {
        message: "OTP generated".to_string(),
        id: user.id,
    }))
}

// ─── OTP Verification ────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,
    #[validate(length(min = 1, message = "otp is required"))]
    pub otp: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerifyOtpResponse {
    pub message: String,
    pub token: String,
}

/// Exchange a valid OTP for a session token.
async fn verify_otp(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<VerifyOtpResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    state.otp_service.verify(&req.id, &req.otp)?;

    let token = create_jwt(
        &req.id,
        &state.config.jwt_signing_key,
        state.config.session_ttl,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(user_id = %req.id, "OTP verified, session issued");

    Ok(Json(VerifyOtpResponse {
        message: "OTP verified".to_string(),
        token,
    }))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::ride::validate_category;
use crate::models::{Provider, RideCoordinates, RideEstimate, RideFingerprint, ServiceType};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/set-accessToken", patch(set_access_token))
        .route("/api/v1/unlink-accessToken", patch(unlink_access_token))
        .route("/api/v1/book-now/ola", post(book_now_ola))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub message: String,
}

// ─── Provider Tokens ─────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetAccessTokenRequest {
    #[validate(length(min = 1, message = "accessToken is required"))]
    pub access_token: String,
    /// Provider name (UBER, OLA, MERUCABS, RAPIDO)
    pub name: String,
}

/// Link (or replace) a provider access token on the caller's account.
async fn set_access_token(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<SetAccessTokenRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(req) = payload?;
    req.validate()?;
    let provider: Provider = req.name.parse().map_err(AppError::BadRequest)?;

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.user_id)))?;

    user.set_access_token(provider, req.access_token);
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %auth.user_id, provider = %provider, "Provider token linked");

    Ok(Json(MessageResponse {
        message: format!("{} access token saved", provider),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkAccessTokenRequest {
    /// Provider whose token should be cleared
    pub field_to_null: String,
}

/// Clear a provider access token from the caller's account.
async fn unlink_access_token(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: std::result::Result<Json<UnlinkAccessTokenRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(req) = payload?;
    let provider: Provider = req.field_to_null.parse().map_err(AppError::BadRequest)?;

    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.user_id)))?;

    user.unlink_access_token(provider);
    state.db.upsert_user(&user).await?;

    tracing::info!(user_id = %auth.user_id, provider = %provider, "Provider token unlinked");

    Ok(Json(MessageResponse {
        message: format!("{} access token removed", provider),
    }))
}

// ─── Ride Quotes ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RideQuoteParams {
    category: Option<String>,
    service_type: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RideQuoteResponse {
    pub message: String,
    pub data: RideEstimate,
}

/// Turn raw query + body into a validated fingerprint. Runs before any
/// cache lookup or upstream call.
fn build_fingerprint(
    params: RideQuoteParams,
    coordinates: RideCoordinates,
) -> Result<RideFingerprint> {
    coordinates.validate()?;

    let service_type: ServiceType = params
        .service_type
        .ok_or_else(|| AppError::BadRequest("service_type is required".to_string()))?
        .parse()
        .map_err(AppError::BadRequest)?;

    let category = params
        .category
        .ok_or_else(|| AppError::BadRequest("category is required".to_string()))?;
    let category = validate_category(&category).map_err(AppError::BadRequest)?;

    Ok(RideFingerprint {
        coordinates,
        category: category.to_string(),
        service_type,
    })
}

/// Get an Ola ride estimate for the caller, served from cache when the
/// request is identical to their previous one.
async fn book_now_ola(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    query: std::result::Result<Query<RideQuoteParams>, QueryRejection>,
    payload: std::result::Result<Json<RideCoordinates>, JsonRejection>,
) -> Result<Json<RideQuoteResponse>> {
    let Query(params) = query?;
    let Json(coordinates) = payload?;
    let fingerprint = build_fingerprint(params, coordinates)?;

    let quote = state
        .ride_quotes
        .fetch_quote(&auth.user_id, &fingerprint)
        .await?;

    tracing::info!(
        user_id = %auth.user_id,
        category = %fingerprint.category,
        service_type = %fingerprint.service_type,
        cache_hit = quote.cached,
        "Ride quote served"
    );

    Ok(Json(RideQuoteResponse {
        message: "Ride estimate fetched".to_string(),
        data: quote.estimate,
    }))
}

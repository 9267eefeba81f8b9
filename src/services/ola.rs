// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ola API client and ride quote cache.
//!
//! Handles:
//! - Ride estimate lookups against the Ola products endpoint
//! - Mapping Ola's city/category error codes to client errors
//! - Normalizing the response into a single [`RideEstimate`]
//! - Per-user caching keyed by the request fingerprint

use crate::error::AppError;
use crate::models::{RideEstimate, RideFingerprint};
use crate::services::kv::SharedKv;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Ola error code for an unserviceable pickup city.
pub const INVALID_CITY: &str = "INVALID_CITY";
/// Ola error code for a category not offered in the pickup city.
pub const INVALID_CITY_CAR_CATEGORY: &str = "INVALID_CITY_CAR_CATEGORY";

/// Ola API client.
#[derive(Clone)]
pub struct OlaClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl OlaClient {
    /// Create a new Ola client with a static bearer credential.
    pub fn new(base_url: String, api_token: String, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_token,
        })
    }

    /// Fetch ride products and estimates for a fingerprint.
    pub async fn get_products(
        &self,
        fingerprint: &RideFingerprint,
    ) -> Result<OlaProductsResponse, AppError> {
        let url = format!("{}/v1/products", self.base_url);
        let c = &fingerprint.coordinates;

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&[
                ("pickup_lat", c.pickup_lat.to_string()),
                ("pickup_lng", c.pickup_lng.to_string()),
                ("drop_lat", c.drop_lat.to_string()),
                ("drop_lng", c.drop_lng.to_string()),
                ("service_type", fingerprint.service_type.to_string()),
                ("category", fingerprint.category.clone()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<OlaErrorBody>(&body) {
                if let Some(mapped) = map_error_code(err.code.as_deref()) {
                    return Err(mapped);
                }
            }
            tracing::warn!(status = %status, "Ola API returned an error");
            return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        let parsed: OlaProductsResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))?;

        // Some error codes arrive with a 200 status.
        if let Some(mapped) = map_error_code(parsed.code.as_deref()) {
            return Err(mapped);
        }

        Ok(parsed)
    }
}

/// Translate Ola's known error codes into user-facing client errors.
fn map_error_code(code: Option<&str>) -> Option<AppError> {
    match code? {
        INVALID_CITY => Some(AppError::BadRequest(
            "Ola does not operate in the pickup city".to_string(),
        )),
        INVALID_CITY_CAR_CATEGORY => Some(AppError::BadRequest(
            "This ride category is not available in the pickup city".to_string(),
        )),
        _ => None,
    }
}

/// Error body returned by Ola.
#[derive(Debug, Clone, Deserialize)]
struct OlaErrorBody {
    code: Option<String>,
}

/// Products response from Ola.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OlaProductsResponse {
    #[serde(default)]
    pub categories: Vec<OlaCategory>,
    #[serde(default)]
    pub ride_estimate: Vec<OlaRideEstimate>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Availability entry for one vehicle category.
#[derive(Debug, Clone, Deserialize)]
pub struct OlaCategory {
    #[serde(default)]
    pub id: Option<String>,
    /// Minutes until a vehicle can reach the pickup point
    pub eta: f64,
}

/// Fare estimate for one vehicle category.
#[derive(Debug, Clone, Deserialize)]
pub struct OlaRideEstimate {
    pub category: String,
    #[serde(default)]
    pub upfront: Option<OlaUpfront>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OlaUpfront {
    pub fare: f64,
}

impl OlaProductsResponse {
    /// Pick the estimate for `requested` and pair it with that category's ETA.
    ///
    /// Estimates and ETAs are joined on the category id. Position is used
    /// only when Ola omits ids from `categories` entirely.
    pub fn to_estimate(&self, requested: &str) -> Result<RideEstimate, AppError> {
        let estimate = self
            .ride_estimate
            .iter()
            .find(|e| e.category == requested)
            .or_else(|| self.ride_estimate.first())
            .ok_or_else(|| AppError::Upstream("No ride estimate in response".to_string()))?;

        let fare = estimate
            .upfront
            .as_ref()
            .map(|u| u.fare)
            .ok_or_else(|| {
                AppError::Upstream(format!("No upfront fare for '{}'", estimate.category))
            })?;

        let eta = match self
            .categories
            .iter()
            .find(|c| c.id.as_deref() == Some(estimate.category.as_str()))
        {
            Some(c) => c.eta,
            None if self.categories.iter().all(|c| c.id.is_none()) => self
                .categories
                .first()
                .map(|c| c.eta)
                .ok_or_else(|| AppError::Upstream("No ETA in response".to_string()))?,
            None => {
                return Err(AppError::Upstream(format!(
                    "No ETA for category '{}'",
                    estimate.category
                )))
            }
        };

        Ok(RideEstimate {
            category: estimate.category.clone(),
            eta,
            fare,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RideQuoteService - Cached estimates per user
// ─────────────────────────────────────────────────────────────────────────────

/// Shared per-user locks type for use in AppState.
pub type QuoteLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Result of a quote lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct RideQuote {
    pub estimate: RideEstimate,
    /// Served from cache without calling Ola
    pub cached: bool,
}

/// High-level quote service: fingerprint-checked cache in front of Ola.
///
/// One cache entry per user, under `ride:{user_id}`. The entry value is the
/// serialized fingerprint and its metadata is the estimate. A new request
/// with a different fingerprint replaces the entry.
#[derive(Clone)]
pub struct RideQuoteService {
    client: OlaClient,
    kv: SharedKv,
    ttl: Duration,
    /// Per-user mutex so concurrent identical requests make one upstream call.
    locks: QuoteLocks,
}

impl RideQuoteService {
    pub fn new(client: OlaClient, kv: SharedKv, ttl: Duration) -> Self {
        Self {
            client,
            kv,
            ttl,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn key(user_id: &str) -> String {
        format!("ride:{}", user_id)
    }

    /// Cached estimate for `user_id` if it was computed for this exact fingerprint.
    fn cached(&self, user_id: &str, fingerprint: &RideFingerprint) -> Option<RideEstimate> {
        let entry = self.kv.get_with_metadata(&Self::key(user_id))?;
        let stored: RideFingerprint = serde_json::from_str(&entry.value).ok()?;
        if &stored != fingerprint {
            return None;
        }
        serde_json::from_value(entry.metadata?).ok()
    }

    /// Get an estimate, calling Ola only on a cache miss.
    pub async fn fetch_quote(
        &self,
        user_id: &str,
        fingerprint: &RideFingerprint,
    ) -> Result<RideQuote, AppError> {
        // Fast path: no lock, no I/O
        if let Some(estimate) = self.cached(user_id, fingerprint) {
            tracing::debug!(user_id, "Ride quote cache hit");
            return Ok(RideQuote {
                estimate,
                cached: true,
            });
        }

        let lock = self
            .locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(user_id, fingerprint).await
        };

        // Drop the user's lock once nobody but us still holds it.
        self.locks
            .remove_if(user_id, |_, l| Arc::ptr_eq(l, &lock) && Arc::strong_count(l) == 2);

        result
    }

    /// Cache re-check and upstream fetch, run while holding the user's lock.
    async fn fetch_locked(
        &self,
        user_id: &str,
        fingerprint: &RideFingerprint,
    ) -> Result<RideQuote, AppError> {
        // Another request for the same user may have filled the cache while we waited.
        if let Some(estimate) = self.cached(user_id, fingerprint) {
            tracing::debug!(user_id, "Ride quote cache hit after wait");
            return Ok(RideQuote {
                estimate,
                cached: true,
            });
        }

        let response = self.client.get_products(fingerprint).await?;
        let estimate = response.to_estimate(&fingerprint.category)?;

        let fingerprint_json = serde_json::to_string(fingerprint)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Fingerprint encode: {}", e)))?;
        let metadata = serde_json::to_value(&estimate)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Estimate encode: {}", e)))?;
        self.kv
            .put_with_metadata(Self::key(user_id), fingerprint_json, metadata, self.ttl);

        tracing::info!(
            user_id,
            category = %estimate.category,
            eta = estimate.eta,
            fare = estimate.fare,
            "Ride quote fetched from Ola"
        );

        Ok(RideQuote {
            estimate,
            cached: false,
        })
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride quote request and estimate models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Ola vehicle categories accepted by the quote endpoint.
pub const RIDE_CATEGORIES: [&str; 17] = [
    "micro",
    "mini",
    "prime",
    "prime_play",
    "prime_sedan",
    "suv",
    "prime_suv",
    "lux",
    "auto",
    "share",
    "bike",
    "ebike",
    "erick",
    "kp",
    "exec",
    "rental",
    "outstation",
];

/// Check a requested category against [`RIDE_CATEGORIES`].
pub fn validate_category(category: &str) -> Result<&'static str, String> {
    RIDE_CATEGORIES
        .iter()
        .copied()
        .find(|c| *c == category)
        .ok_or_else(|| format!("Unsupported ride category '{}'", category))
}

/// Ola service type. `local` is an alias for point-to-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    P2p,
    Rental,
    Outstation,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::P2p => "p2p",
            ServiceType::Rental => "rental",
            ServiceType::Outstation => "outstation",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p2p" | "local" => Ok(ServiceType::P2p),
            "rental" => Ok(ServiceType::Rental),
            "outstation" => Ok(ServiceType::Outstation),
            other => Err(format!(
                "Unsupported service type '{}': expected p2p, local, rental or outstation",
                other
            )),
        }
    }
}

/// Pickup and drop coordinates sent in the quote request body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct RideCoordinates {
    #[validate(range(min = -90.0, max = 90.0, message = "pickup_lat must be between -90 and 90"))]
    pub pickup_lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "pickup_lng must be between -180 and 180"))]
    pub pickup_lng: f64,
    #[validate(range(min = -90.0, max = 90.0, message = "drop_lat must be between -90 and 90"))]
    pub drop_lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "drop_lng must be between -180 and 180"))]
    pub drop_lng: f64,
}

/// Everything that determines an estimate. Two requests with equal
/// fingerprints may share a cached estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideFingerprint {
    #[serde(flatten)]
    pub coordinates: RideCoordinates,
    pub category: String,
    pub service_type: ServiceType,
}

/// Normalized estimate returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RideEstimate {
    pub category: String,
    /// Minutes until pickup
    pub eta: f64,
    pub fare: f64,
}

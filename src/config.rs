// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (JWT key, Ola API token) are read once at startup and kept in
//! memory for the lifetime of the process.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default Ola API endpoint.
pub const DEFAULT_OLA_API_BASE_URL: &str = "https://devapi.olacabs.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// GCP project ID; `None` selects the in-memory user directory
    pub gcp_project_id: Option<String>,
    /// Base URL of the Ola API (overridable for staging and tests)
    pub ola_api_base_url: String,
    /// Timeout for a single Ola API request
    pub ola_timeout: Duration,
    /// Lifetime of issued session tokens
    pub session_ttl: Duration,
    /// Lifetime of an issued OTP
    pub otp_ttl: Duration,
    /// Lifetime of a cached ride estimate
    pub ride_cache_ttl: Duration,
    /// Consume the OTP on successful verification
    pub otp_single_use: bool,
    /// How often expired KV entries are swept
    pub kv_sweep_interval: Duration,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Key for the OTP digest stored in the KV store
    pub otp_hash_key: Vec<u8>,
    /// Static bearer credential for the Ola API
    pub ola_api_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();

        let otp_hash_key = env::var("OTP_HASH_KEY")
            .map(String::into_bytes)
            .unwrap_or_else(|_| jwt_signing_key.clone());

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .ok()
                .filter(|p| !p.trim().is_empty()),
            ola_api_base_url: env::var("OLA_API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_OLA_API_BASE_URL.to_string()),
            ola_timeout: Duration::from_secs(parse_or("OLA_TIMEOUT_SECS", 10)?),
            session_ttl: days("SESSION_TTL_DAYS", parse_or("SESSION_TTL_DAYS", 30)?)?,
            otp_ttl: Duration::from_secs(parse_or("OTP_TTL_SECS", 300)?),
            ride_cache_ttl: Duration::from_secs(parse_or("RIDE_CACHE_TTL_SECS", 300)?),
            otp_single_use: parse_or("OTP_SINGLE_USE", false)?,
            kv_sweep_interval: Duration::from_secs(parse_or("KV_SWEEP_INTERVAL_SECS", 60)?),

            jwt_signing_key,
            otp_hash_key,
            ola_api_token: env::var("OLA_API_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OLA_API_TOKEN"))?,
        })
    }

    /// Fixed configuration for tests: in-memory directory, local Ola URL.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            gcp_project_id: None,
            ola_api_base_url: "http://127.0.0.1:9".to_string(),
            ola_timeout: Duration::from_secs(5),
            session_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            otp_ttl: Duration::from_secs(300),
            ride_cache_ttl: Duration::from_secs(300),
            otp_single_use: false,
            kv_sweep_interval: Duration::from_secs(60),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            otp_hash_key: b"test_otp_key".to_vec(),
            ola_api_token: "test_ola_token".to_string(),
        }
    }
}

/// Read an optional variable, falling back to `default` when unset.
/// A set but unparseable value is an error rather than a silent default.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Convert a day count into a `Duration`, rejecting values that overflow.
fn days(name: &'static str, count: u64) -> Result<Duration, ConfigError> {
    count
        .checked_mul(24 * 60 * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid(name, count.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

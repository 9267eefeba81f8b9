// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Cabhop: phone-verified ride quotes
//!
//! This crate provides the backend API for signing users up with a phone
//! number and one-time passcode, linking their ride-hailing provider
//! tokens, and fetching cached ride estimates from Ola.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use error::AppError;
use services::{KvStore, OlaClient, OtpService, RideQuoteService, SharedKv};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    /// Ephemeral store for OTPs and cached ride quotes
    pub kv: SharedKv,
    pub otp_service: OtpService,
    pub ride_quotes: RideQuoteService,
}

impl AppState {
    /// Wire services around an already-connected user directory.
    pub fn new(config: Config, db: FirestoreDb) -> Result<Self, AppError> {
        let kv: SharedKv = Arc::new(KvStore::new());

        let otp_service = OtpService::new(
            kv.clone(),
            config.otp_hash_key.clone(),
            config.otp_ttl,
            config.otp_single_use,
        );

        let ola = OlaClient::new(
            config.ola_api_base_url.clone(),
            config.ola_api_token.clone(),
            config.ola_timeout,
        )?;
        let ride_quotes = RideQuoteService::new(ola, kv.clone(), config.ride_cache_ttl);

        Ok(Self {
            config,
            db,
            kv,
            otp_service,
            ride_quotes,
        })
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cabhop API Server
//!
//! Signs users up with phone + OTP, stores their ride-hailing provider
//! tokens, and serves cached Ola ride estimates.

use cabhop::{config::Config, db::FirestoreDb, services::kv, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Cabhop API");

    if !config.otp_single_use {
        tracing::warn!("OTPs stay valid until expiry after verification (OTP_SINGLE_USE=false)");
    }

    // Initialize user directory
    let db = match &config.gcp_project_id {
        Some(project_id) => FirestoreDb::new(project_id).await?,
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory user directory");
            FirestoreDb::new_in_memory()
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db)?);

    // Expired OTPs and ride quotes are swept in the background
    kv::spawn_sweeper(state.kv.clone(), config.kv_sweep_interval);
    tracing::info!(
        interval_secs = config.kv_sweep_interval.as_secs(),
        "KV sweeper started"
    );

    // Build router
    let app = cabhop::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cabhop=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

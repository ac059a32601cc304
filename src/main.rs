//! transit-dispatch server entry point.
//!
//! Wires the store, cache, notification buses, background workers, and
//! the Axum HTTP server together.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use transit_dispatch::api;
use transit_dispatch::app_state::AppState;
use transit_dispatch::config::DispatchConfig;
use transit_dispatch::service::{matcher, write_behind, DispatchService, PaymentClient};
use transit_dispatch::store::Store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = DispatchConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting transit-dispatch");

    let store = Store::connect(&config).await?;
    let payment = PaymentClient::new(
        config.payment_retry_attempts,
        Duration::from_millis(config.payment_retry_delay_ms),
    );

    let (sent_tx, sent_rx) = mpsc::channel(256);
    let (unit_status_tx, unit_status_rx) = mpsc::channel(256);

    let dispatch = Arc::new(DispatchService::new(store, payment, sent_tx, unit_status_tx));
    dispatch.bootstrap().await?;

    // Background workers.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(write_behind::run_location_flusher(
        Arc::clone(&dispatch),
        config.location_flush_interval_ms,
        shutdown_rx.clone(),
    ));
    tokio::spawn(write_behind::run_status_ack_syncer(
        Arc::clone(&dispatch),
        sent_rx,
    ));
    tokio::spawn(write_behind::run_unit_status_worker(
        Arc::clone(&dispatch),
        unit_status_rx,
    ));

    if config.matching_enabled {
        tracing::info!("matcher enabled");
        tokio::spawn(matcher::run_matcher(
            Arc::clone(&dispatch),
            config.matching_interval_ms,
            shutdown_rx.clone(),
        ));
    } else {
        tracing::warn!("matcher disabled (set ISUCON_MATCHING=true to enable)");
    }

    // HTTP server.
    let state = AppState {
        dispatch,
        config: config.clone(),
    };
    let app = api::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to listen for shutdown signal");
    }
}

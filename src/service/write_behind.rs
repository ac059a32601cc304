//! Write-behind workers.
//!
//! Three background consumers keep the request path off the store where
//! latency matters:
//!
//! - the **location flusher** batches dirty in-memory locations into
//!   periodic upserts;
//! - the **status-ack syncer** folds `Sent` signals into the completion
//!   gate that releases units;
//! - the **unit status worker** applies unit-initiated transitions
//!   outside the request's transaction.
//!
//! Workers log transient store failures and continue; they never take
//! the process down. On shutdown each drains what is already queued and
//! exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::domain::event::SentSignal;
use crate::domain::{TripId, TripStatusKind};

use super::dispatch::DispatchService;

/// A unit-initiated transition queued by the status handler.
#[derive(Debug, Clone, Copy)]
pub struct UnitStatusUpdate {
    pub trip_id: TripId,
    pub status: TripStatusKind,
}

/// Periodically upserts dirty locations and clears their dirty bits.
///
/// A location updated again between snapshot and clear keeps its dirty
/// bit and is retried next tick.
pub async fn run_location_flusher(
    service: Arc<DispatchService>,
    interval_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = flush_locations(&service).await {
                    tracing::error!(error = %err, "location flush failed");
                }
            }
            _ = shutdown.changed() => {
                // Final drain so the last reports are not lost.
                if let Err(err) = flush_locations(&service).await {
                    tracing::error!(error = %err, "final location flush failed");
                }
                tracing::info!("location flusher shutting down");
                return;
            }
        }
    }
}

async fn flush_locations(service: &DispatchService) -> Result<(), crate::error::DispatchError> {
    let dirty = service.cache().dirty_locations().await;
    if dirty.is_empty() {
        return Ok(());
    }

    let mut tx = service.store().begin().await?;
    for location in &dirty {
        service.store().upsert_location(&mut tx, location).await?;
    }
    tx.commit().await?;

    for location in &dirty {
        service
            .cache()
            .clear_dirty(location.unit_id, location.updated_at)
            .await;
    }
    tracing::debug!(count = dirty.len(), "flushed dirty locations");
    Ok(())
}

/// Consumes `Sent` signals until every producer is gone, then drains
/// the queue and exits.
pub async fn run_status_ack_syncer(
    service: Arc<DispatchService>,
    mut signals: mpsc::Receiver<SentSignal>,
) {
    while let Some(signal) = signals.recv().await {
        if let Err(err) = service.apply_sent_signal(signal).await {
            tracing::error!(error = %err, "failed to apply sent signal");
        }
    }
    tracing::info!("status-ack syncer shutting down");
}

/// Applies queued unit-initiated transitions until every producer is
/// gone, then drains the queue and exits.
pub async fn run_unit_status_worker(
    service: Arc<DispatchService>,
    mut updates: mpsc::Receiver<UnitStatusUpdate>,
) {
    while let Some(update) = updates.recv().await {
        let trip_id = update.trip_id;
        if let Err(err) = service.apply_unit_status(update).await {
            tracing::error!(%trip_id, error = %err, "failed to apply unit status update");
        }
    }
    tracing::info!("unit status worker shutting down");
}

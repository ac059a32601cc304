//! Background matching loop.
//!
//! Every tick the matcher reads the oldest pending trips inside one
//! store transaction, snapshots the eligible units from the cache, and
//! greedily assigns each trip the nearest unused unit by L1 distance.
//! A tick with fewer than [`MIN_ELIGIBLE_UNITS`] eligible units does
//! nothing, so early trips cannot drain the fleet while it is nearly
//! empty.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::domain::{Coordinate, Trip, TripId, TripStatusKind, UnitId};
use crate::error::DispatchError;

use super::dispatch::DispatchService;

/// Pending trips considered per tick.
pub const MATCH_BATCH_SIZE: i64 = 20;
/// Minimum eligible units before any matching happens.
pub const MIN_ELIGIBLE_UNITS: usize = 5;

/// Picks a unit for each pending trip, in trip order.
///
/// Each trip takes the nearest unit not already chosen this tick; ties
/// break toward the smaller unit id so the outcome is deterministic.
/// Returns once every trip is handled or the units run out.
pub(crate) fn select_assignments(
    pending: &[Trip],
    units: &[(UnitId, Coordinate)],
) -> Vec<(TripId, UnitId)> {
    let mut taken: HashSet<UnitId> = HashSet::new();
    let mut assignments = Vec::new();

    for trip in pending {
        let nearest = units
            .iter()
            .filter(|(id, _)| !taken.contains(id))
            .min_by_key(|(id, location)| (trip.pickup.distance_to(*location), *id));
        let Some((unit_id, _)) = nearest else {
            break;
        };
        taken.insert(*unit_id);
        assignments.push((trip.id, *unit_id));
    }
    assignments
}

/// One matcher tick: read, select, bind, fan out.
pub(crate) async fn match_tick(service: &DispatchService) -> Result<usize, DispatchError> {
    let mut tx = service.store().begin().await?;

    let pending = service.store().pending_trips(&mut tx, MATCH_BATCH_SIZE).await?;
    if pending.is_empty() {
        return Ok(0);
    }

    let units = service.cache().free_units_with_location().await;
    if units.len() < MIN_ELIGIBLE_UNITS {
        return Ok(0);
    }

    let assignments = select_assignments(&pending, &units);
    let mut matched = 0;

    for (trip_id, unit_id) in assignments {
        let now = Utc::now();
        service
            .store()
            .bind_trip_unit(&mut tx, trip_id, unit_id, now)
            .await?;
        service.cache().bind_trip_unit(trip_id, unit_id, now).await;

        service.store().set_unit_free_in_tx(&mut tx, unit_id, false).await?;
        service.cache().set_unit_free(unit_id, false).await;

        let Some(trip) = service.cache().trip_by_id(trip_id).await else {
            tracing::error!(%trip_id, "matched trip missing from cache");
            continue;
        };
        let Some(latest) = service.store().latest_status_of_trip(&mut tx, trip_id).await? else {
            tracing::error!(%trip_id, "matched trip has no status");
            continue;
        };
        if latest.status != TripStatusKind::Matching {
            tracing::error!(%trip_id, status = %latest.status, "matched trip left MATCHING");
            continue;
        }

        // The status stays MATCHING; the fan-out reruns so both parties
        // see the binding.
        service.fan_out(&trip, latest.id, TripStatusKind::Matching).await;
        tracing::info!(%trip_id, %unit_id, "matched");
        matched += 1;
    }

    tx.commit().await?;
    Ok(matched)
}

/// Runs the matching loop until shutdown.
pub async fn run_matcher(
    service: Arc<DispatchService>,
    interval_ms: u64,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = match_tick(&service).await {
                    tracing::error!(error = %err, "matcher tick failed");
                }
            }
            _ = shutdown.changed() => {
                tracing::info!("matcher shutting down");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn make_trip(pickup: Coordinate) -> Trip {
        let now = Utc::now();
        Trip {
            id: TripId::new(),
            user_id: UserId::new(),
            unit_id: None,
            pickup,
            destination: Coordinate::new(100, 100),
            evaluation: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn picks_the_nearest_unit() {
        let trip = make_trip(Coordinate::new(0, 0));
        let near = UnitId::new();
        let far = UnitId::new();
        let units = vec![
            (far, Coordinate::new(10, 10)),
            (near, Coordinate::new(1, 1)),
        ];

        let assignments = select_assignments(std::slice::from_ref(&trip), &units);
        assert_eq!(assignments, vec![(trip.id, near)]);
    }

    #[test]
    fn every_trip_matches_when_units_suffice() {
        let trips: Vec<Trip> = (0..4)
            .map(|i| make_trip(Coordinate::new(i * 10, 0)))
            .collect();
        let units: Vec<(UnitId, Coordinate)> = (0..6)
            .map(|i| (UnitId::new(), Coordinate::new(i * 10, 1)))
            .collect();

        let assignments = select_assignments(&trips, &units);
        assert_eq!(assignments.len(), trips.len());

        let distinct: HashSet<UnitId> = assignments.iter().map(|(_, u)| *u).collect();
        assert_eq!(distinct.len(), trips.len(), "units must not be reused");
    }

    #[test]
    fn earlier_trip_wins_the_shared_nearest_unit() {
        let first = make_trip(Coordinate::new(0, 0));
        let second = make_trip(Coordinate::new(0, 0));
        let close = UnitId::new();
        let backup = UnitId::new();
        let units = vec![
            (close, Coordinate::new(0, 1)),
            (backup, Coordinate::new(0, 5)),
        ];

        let assignments = select_assignments(&[first.clone(), second.clone()], &units);
        assert_eq!(assignments, vec![(first.id, close), (second.id, backup)]);
    }

    #[test]
    fn equidistant_units_tie_break_by_id() {
        let trip = make_trip(Coordinate::new(0, 0));
        let mut a = UnitId::new();
        let mut b = UnitId::new();
        if b < a {
            std::mem::swap(&mut a, &mut b);
        }
        let units = vec![(b, Coordinate::new(0, 3)), (a, Coordinate::new(3, 0))];

        let assignments = select_assignments(std::slice::from_ref(&trip), &units);
        assert_eq!(assignments, vec![(trip.id, a)]);
    }

    #[test]
    fn stops_when_units_run_out() {
        let trips: Vec<Trip> = (0..3).map(|_| make_trip(Coordinate::new(0, 0))).collect();
        let units = vec![(UnitId::new(), Coordinate::new(1, 1))];

        let assignments = select_assignments(&trips, &units);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].0, trips[0].id);
    }

    #[test]
    fn no_pending_trips_yields_no_assignments() {
        let units = vec![(UnitId::new(), Coordinate::new(0, 0))];
        assert!(select_assignments(&[], &units).is_empty());
    }
}

//! Process-local authoritative read view.
//!
//! [`IndexCache`] mirrors the store for everything the hot path reads:
//! riders, units, trips, latest locations, latest trip statuses, the
//! latest trip bound to each unit, applied coupons, and per-unit ride
//! aggregates. Writers update the store and the cache inside the same
//! critical section; readers never touch the store.
//!
//! Every map sits behind its own `RwLock`. Multi-map operations acquire
//! locks in one fixed order — `units → locations → latest status →
//! latest trip per unit` (with the remaining maps slotted around that
//! spine) — so overlapping snapshots cannot deadlock.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{
    Coordinate, Coupon, RideStats, StatusId, Trip, TripId, TripStatusKind, Unit, UnitId,
    UnitLocation, User, UserId,
};

/// Latest status of one trip, as tracked by the cache.
#[derive(Debug, Clone, Copy)]
pub struct LatestStatus {
    pub id: StatusId,
    pub status: TripStatusKind,
    pub created_at: DateTime<Utc>,
}

/// A unit eligible for the nearby listing.
#[derive(Debug, Clone)]
pub struct NearbyUnit {
    pub id: UnitId,
    pub name: String,
    pub model: String,
    pub coordinate: Coordinate,
}

/// Full state loaded from the store for a cold start or reset.
#[derive(Debug, Default)]
pub struct CacheSeed {
    pub users: Vec<User>,
    pub units: Vec<Unit>,
    /// Ordered by `updated_at` descending; the first trip seen per unit
    /// becomes that unit's latest binding.
    pub trips: Vec<Trip>,
    pub locations: Vec<UnitLocation>,
    /// Ordered by `created_at` descending; the first row seen per trip
    /// becomes that trip's latest status.
    pub statuses: Vec<(TripId, LatestStatus)>,
    /// Coupons with `used_by` set.
    pub applied_coupons: Vec<Coupon>,
    pub ride_stats: Vec<(UnitId, RideStats)>,
}

/// The coherent in-memory index over the store.
pub struct IndexCache {
    users: RwLock<HashMap<UserId, User>>,
    users_by_token: RwLock<HashMap<String, UserId>>,
    units: RwLock<HashMap<UnitId, Unit>>,
    units_by_token: RwLock<HashMap<String, UnitId>>,
    trips: RwLock<HashMap<TripId, Trip>>,
    locations: RwLock<HashMap<UnitId, UnitLocation>>,
    latest_status: RwLock<HashMap<TripId, LatestStatus>>,
    latest_trip_by_unit: RwLock<HashMap<UnitId, TripId>>,
    coupon_by_trip: RwLock<HashMap<TripId, Coupon>>,
    ride_stats: RwLock<HashMap<UnitId, RideStats>>,
}

impl IndexCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            users_by_token: RwLock::new(HashMap::new()),
            units: RwLock::new(HashMap::new()),
            units_by_token: RwLock::new(HashMap::new()),
            trips: RwLock::new(HashMap::new()),
            locations: RwLock::new(HashMap::new()),
            latest_status: RwLock::new(HashMap::new()),
            latest_trip_by_unit: RwLock::new(HashMap::new()),
            coupon_by_trip: RwLock::new(HashMap::new()),
            ride_stats: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the whole cache with freshly loaded store state.
    ///
    /// World-stop: every write lock is taken (in the fixed order) before
    /// any map is touched, so readers observe either the old or the new
    /// view, never a mix.
    pub async fn install(&self, seed: CacheSeed) {
        let mut users = self.users.write().await;
        let mut users_by_token = self.users_by_token.write().await;
        let mut units = self.units.write().await;
        let mut units_by_token = self.units_by_token.write().await;
        let mut trips = self.trips.write().await;
        let mut locations = self.locations.write().await;
        let mut latest_status = self.latest_status.write().await;
        let mut latest_trip_by_unit = self.latest_trip_by_unit.write().await;
        let mut coupon_by_trip = self.coupon_by_trip.write().await;
        let mut ride_stats = self.ride_stats.write().await;

        users.clear();
        users_by_token.clear();
        for user in seed.users {
            users_by_token.insert(user.access_token.clone(), user.id);
            users.insert(user.id, user);
        }

        units.clear();
        units_by_token.clear();
        for unit in seed.units {
            units_by_token.insert(unit.access_token.clone(), unit.id);
            units.insert(unit.id, unit);
        }

        trips.clear();
        latest_trip_by_unit.clear();
        for trip in seed.trips {
            if let Some(unit_id) = trip.unit_id {
                latest_trip_by_unit.entry(unit_id).or_insert(trip.id);
            }
            trips.insert(trip.id, trip);
        }

        locations.clear();
        for location in seed.locations {
            locations.insert(location.unit_id, location);
        }

        latest_status.clear();
        for (trip_id, status) in seed.statuses {
            latest_status.entry(trip_id).or_insert(status);
        }

        coupon_by_trip.clear();
        for coupon in seed.applied_coupons {
            if let Some(trip_id) = coupon.used_by {
                coupon_by_trip.insert(trip_id, coupon);
            }
        }

        ride_stats.clear();
        for (unit_id, stats) in seed.ride_stats {
            ride_stats.insert(unit_id, stats);
        }
    }

    // ── Riders ──────────────────────────────────────────────────────────

    pub async fn insert_user(&self, user: User) {
        let mut users = self.users.write().await;
        let mut by_token = self.users_by_token.write().await;
        by_token.insert(user.access_token.clone(), user.id);
        users.insert(user.id, user);
    }

    pub async fn user_by_id(&self, id: UserId) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    pub async fn user_by_token(&self, token: &str) -> Option<User> {
        let id = {
            let by_token = self.users_by_token.read().await;
            by_token.get(token).copied()
        }?;
        self.user_by_id(id).await
    }

    // ── Units ───────────────────────────────────────────────────────────

    pub async fn insert_unit(&self, unit: Unit) {
        let mut units = self.units.write().await;
        let mut by_token = self.units_by_token.write().await;
        by_token.insert(unit.access_token.clone(), unit.id);
        units.insert(unit.id, unit);
    }

    pub async fn unit_by_id(&self, id: UnitId) -> Option<Unit> {
        self.units.read().await.get(&id).cloned()
    }

    pub async fn unit_by_token(&self, token: &str) -> Option<Unit> {
        let id = {
            let by_token = self.units_by_token.read().await;
            by_token.get(token).copied()
        }?;
        self.unit_by_id(id).await
    }

    /// Flips the operator toggle. Returns `false` for an unknown unit.
    pub async fn set_unit_active(&self, id: UnitId, active: bool) -> bool {
        let mut units = self.units.write().await;
        match units.get_mut(&id) {
            Some(unit) => {
                unit.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Flips the dispatch flag. Returns `false` for an unknown unit.
    pub async fn set_unit_free(&self, id: UnitId, free: bool) -> bool {
        let mut units = self.units.write().await;
        match units.get_mut(&id) {
            Some(unit) => {
                unit.is_free = free;
                true
            }
            None => false,
        }
    }

    // ── Trips ───────────────────────────────────────────────────────────

    pub async fn insert_trip(&self, trip: Trip) {
        self.trips.write().await.insert(trip.id, trip);
    }

    pub async fn trip_by_id(&self, id: TripId) -> Option<Trip> {
        self.trips.read().await.get(&id).cloned()
    }

    /// Binds a unit to a trip and records it as the unit's latest trip.
    pub async fn bind_trip_unit(&self, trip_id: TripId, unit_id: UnitId, at: DateTime<Utc>) {
        let mut trips = self.trips.write().await;
        let mut latest = self.latest_trip_by_unit.write().await;
        if let Some(trip) = trips.get_mut(&trip_id) {
            trip.unit_id = Some(unit_id);
            trip.updated_at = at;
        }
        latest.insert(unit_id, trip_id);
    }

    pub async fn set_trip_evaluation(&self, trip_id: TripId, evaluation: i64, at: DateTime<Utc>) {
        let mut trips = self.trips.write().await;
        if let Some(trip) = trips.get_mut(&trip_id) {
            trip.evaluation = Some(evaluation);
            trip.updated_at = at;
        }
    }

    /// Latest trip bound to a unit, if any.
    pub async fn latest_trip_of_unit(&self, unit_id: UnitId) -> Option<Trip> {
        let trips = self.trips.read().await;
        let latest = self.latest_trip_by_unit.read().await;
        latest.get(&unit_id).and_then(|id| trips.get(id)).cloned()
    }

    // ── Locations ───────────────────────────────────────────────────────

    /// Applies a location report, accumulating the odometer, and returns
    /// the updated entry. The entry is marked dirty for the flusher.
    pub async fn record_location(
        &self,
        unit_id: UnitId,
        coordinate: Coordinate,
        at: DateTime<Utc>,
    ) -> UnitLocation {
        let mut locations = self.locations.write().await;
        let entry = locations
            .entry(unit_id)
            .and_modify(|loc| loc.apply_move(coordinate, at))
            .or_insert_with(|| UnitLocation::first_report(unit_id, coordinate, at));
        entry.clone()
    }

    pub async fn location_of(&self, unit_id: UnitId) -> Option<UnitLocation> {
        self.locations.read().await.get(&unit_id).cloned()
    }

    /// Snapshot of all dirty location entries.
    pub async fn dirty_locations(&self) -> Vec<UnitLocation> {
        self.locations
            .read()
            .await
            .values()
            .filter(|loc| loc.dirty)
            .cloned()
            .collect()
    }

    /// Clears the dirty bit of an entry, unless it was updated again
    /// after the given snapshot timestamp.
    pub async fn clear_dirty(&self, unit_id: UnitId, as_of: DateTime<Utc>) {
        let mut locations = self.locations.write().await;
        if let Some(loc) = locations.get_mut(&unit_id) {
            if loc.updated_at == as_of {
                loc.dirty = false;
            }
        }
    }

    // ── Statuses ────────────────────────────────────────────────────────

    pub async fn set_latest_status(&self, trip_id: TripId, status: LatestStatus) {
        self.latest_status.write().await.insert(trip_id, status);
    }

    pub async fn latest_status(&self, trip_id: TripId) -> Option<LatestStatus> {
        self.latest_status.read().await.get(&trip_id).copied()
    }

    // ── Coupons ─────────────────────────────────────────────────────────

    pub async fn set_coupon_for_trip(&self, trip_id: TripId, coupon: Coupon) {
        self.coupon_by_trip.write().await.insert(trip_id, coupon);
    }

    /// The coupon whose discount is fixed to this trip, if any. Stable
    /// once set.
    pub async fn coupon_for_trip(&self, trip_id: TripId) -> Option<Coupon> {
        self.coupon_by_trip.read().await.get(&trip_id).cloned()
    }

    // ── Ride aggregates ─────────────────────────────────────────────────

    pub async fn stats_of_unit(&self, unit_id: UnitId) -> RideStats {
        self.ride_stats
            .read()
            .await
            .get(&unit_id)
            .copied()
            .unwrap_or_default()
    }

    pub async fn record_evaluation(&self, unit_id: UnitId, evaluation: i64) {
        self.ride_stats
            .write()
            .await
            .entry(unit_id)
            .or_default()
            .record(evaluation);
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    /// Active, free units with a known location — the matcher's
    /// candidate set. Locks `units → locations`.
    pub async fn free_units_with_location(&self) -> Vec<(UnitId, Coordinate)> {
        let units = self.units.read().await;
        let locations = self.locations.read().await;
        units
            .values()
            .filter(|unit| unit.is_active && unit.is_free)
            .filter_map(|unit| {
                locations
                    .get(&unit.id)
                    .map(|loc| (unit.id, loc.coordinate))
            })
            .collect()
    }

    /// Units eligible for the nearby listing: active, free, within the
    /// L1 radius, and whose latest bound trip (if any) is COMPLETED.
    ///
    /// Locks `units → locations → latest status → latest trip per unit`
    /// for one consistent view.
    pub async fn nearby_units(&self, center: Coordinate, radius: i64) -> Vec<NearbyUnit> {
        let units = self.units.read().await;
        let locations = self.locations.read().await;
        let latest_status = self.latest_status.read().await;
        let latest_trip = self.latest_trip_by_unit.read().await;

        let mut nearby = Vec::new();
        for unit in units.values() {
            if !unit.is_active || !unit.is_free {
                continue;
            }
            let Some(location) = locations.get(&unit.id) else {
                continue;
            };
            if center.distance_to(location.coordinate) > radius {
                continue;
            }
            if let Some(trip_id) = latest_trip.get(&unit.id) {
                if let Some(status) = latest_status.get(trip_id) {
                    if status.status != TripStatusKind::Completed {
                        continue;
                    }
                }
            }
            nearby.push(NearbyUnit {
                id: unit.id,
                name: unit.name.clone(),
                model: unit.model.clone(),
                coordinate: location.coordinate,
            });
        }
        nearby
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::OwnerId;

    fn make_user(token: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            username: "rider".into(),
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            date_of_birth: "1990-01-01".into(),
            access_token: token.into(),
            invitation_code: "code".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn make_unit(active: bool, free: bool) -> Unit {
        let now = Utc::now();
        Unit {
            id: UnitId::new(),
            owner_id: OwnerId::new(),
            name: "U".into(),
            model: "M".into(),
            is_active: active,
            is_free: free,
            access_token: UnitId::new().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn make_trip(user_id: UserId, unit_id: Option<UnitId>) -> Trip {
        let now = Utc::now();
        Trip {
            id: TripId::new(),
            user_id,
            unit_id,
            pickup: Coordinate::new(0, 0),
            destination: Coordinate::new(5, 5),
            evaluation: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn token_lookup_resolves_users_and_units() {
        let cache = IndexCache::new();
        let user = make_user("tok-user");
        let user_id = user.id;
        cache.insert_user(user).await;

        let unit = make_unit(true, true);
        let unit_token = unit.access_token.clone();
        let unit_id = unit.id;
        cache.insert_unit(unit).await;

        assert_eq!(cache.user_by_token("tok-user").await.map(|u| u.id), Some(user_id));
        assert_eq!(cache.unit_by_token(&unit_token).await.map(|u| u.id), Some(unit_id));
        assert!(cache.user_by_token("unknown").await.is_none());
    }

    #[tokio::test]
    async fn bind_trip_unit_updates_latest_binding() {
        let cache = IndexCache::new();
        let user = make_user("t");
        let user_id = user.id;
        cache.insert_user(user).await;

        let unit = make_unit(true, true);
        let unit_id = unit.id;
        cache.insert_unit(unit).await;

        let trip = make_trip(user_id, None);
        let trip_id = trip.id;
        cache.insert_trip(trip).await;

        let at = Utc::now();
        cache.bind_trip_unit(trip_id, unit_id, at).await;

        let bound = cache.trip_by_id(trip_id).await.unwrap_or_else(|| {
            panic!("trip missing");
        });
        assert_eq!(bound.unit_id, Some(unit_id));

        let latest = cache.latest_trip_of_unit(unit_id).await;
        assert_eq!(latest.map(|t| t.id), Some(trip_id));
    }

    #[tokio::test]
    async fn dirty_tracking_survives_concurrent_update() {
        let cache = IndexCache::new();
        let unit_id = UnitId::new();
        let t0 = Utc::now();
        cache.record_location(unit_id, Coordinate::new(1, 1), t0).await;

        let snapshot = cache.dirty_locations().await;
        assert_eq!(snapshot.len(), 1);

        // A second report lands before the flusher clears the bit.
        let t1 = t0 + chrono::Duration::milliseconds(5);
        cache.record_location(unit_id, Coordinate::new(2, 2), t1).await;

        cache.clear_dirty(unit_id, t0).await;
        let still_dirty = cache.location_of(unit_id).await.unwrap_or_else(|| {
            panic!("location missing");
        });
        assert!(still_dirty.dirty, "newer report must stay dirty");

        cache.clear_dirty(unit_id, t1).await;
        let clean = cache.location_of(unit_id).await.unwrap_or_else(|| {
            panic!("location missing");
        });
        assert!(!clean.dirty);
    }

    #[tokio::test]
    async fn nearby_excludes_busy_inactive_and_far_units() {
        let cache = IndexCache::new();
        let now = Utc::now();

        // Eligible at distance 7.
        let u1 = make_unit(true, true);
        let u1_id = u1.id;
        cache.insert_unit(u1).await;
        cache.record_location(u1_id, Coordinate::new(3, 4), now).await;

        // Busy.
        let u2 = make_unit(true, false);
        let u2_id = u2.id;
        cache.insert_unit(u2).await;
        cache.record_location(u2_id, Coordinate::new(1, 1), now).await;

        // Too far.
        let u3 = make_unit(true, true);
        let u3_id = u3.id;
        cache.insert_unit(u3).await;
        cache.record_location(u3_id, Coordinate::new(20, 0), now).await;

        // Switched off.
        let u4 = make_unit(false, true);
        let u4_id = u4.id;
        cache.insert_unit(u4).await;
        cache.record_location(u4_id, Coordinate::new(0, 1), now).await;

        let nearby = cache.nearby_units(Coordinate::new(0, 0), 10).await;
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].id, u1_id);
    }

    #[tokio::test]
    async fn nearby_excludes_unit_with_unfinished_latest_trip() {
        let cache = IndexCache::new();
        let now = Utc::now();

        let unit = make_unit(true, true);
        let unit_id = unit.id;
        cache.insert_unit(unit).await;
        cache.record_location(unit_id, Coordinate::new(1, 0), now).await;

        let user = make_user("t");
        let user_id = user.id;
        cache.insert_user(user).await;
        let trip = make_trip(user_id, Some(unit_id));
        let trip_id = trip.id;
        cache.insert_trip(trip).await;
        cache.bind_trip_unit(trip_id, unit_id, now).await;
        cache
            .set_latest_status(
                trip_id,
                LatestStatus {
                    id: StatusId::new(),
                    status: TripStatusKind::Carrying,
                    created_at: now,
                },
            )
            .await;

        assert!(cache.nearby_units(Coordinate::new(0, 0), 10).await.is_empty());

        cache
            .set_latest_status(
                trip_id,
                LatestStatus {
                    id: StatusId::new(),
                    status: TripStatusKind::Completed,
                    created_at: now,
                },
            )
            .await;
        assert_eq!(cache.nearby_units(Coordinate::new(0, 0), 10).await.len(), 1);
    }

    #[tokio::test]
    async fn install_replaces_previous_view() {
        let cache = IndexCache::new();
        cache.insert_user(make_user("old")).await;

        let fresh = make_user("new");
        let seed = CacheSeed {
            users: vec![fresh],
            ..CacheSeed::default()
        };
        cache.install(seed).await;

        assert!(cache.user_by_token("old").await.is_none());
        assert!(cache.user_by_token("new").await.is_some());
    }
}

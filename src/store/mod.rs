//! MySQL persistence layer.
//!
//! [`Store`] wraps a `sqlx::MySqlPool`. Request-path writes run inside
//! explicit transactions so cache updates can share the critical
//! section; coupon selection and trip lookups during status changes use
//! `SELECT ... FOR UPDATE` to serialize with concurrent trip creation.
//! Cold-load queries rebuild the whole [`CacheSeed`] for startup and
//! `/api/initialize`.

pub mod rows;

use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, MySqlPool};

use crate::cache::{CacheSeed, LatestStatus};
use crate::config::DispatchConfig;
use crate::domain::{
    Coupon, OwnerId, Trip, TripId, TripStatusRow, Unit, UnitId, UnitLocation, User, UserId,
};
use crate::error::DispatchError;
use rows::{CouponRow, LocationRow, RideStatsRow, StatusRow, TripRow, UnitRow, UserRow};

/// A store transaction. Committed explicitly; rolls back on drop.
pub type StoreTx = sqlx::Transaction<'static, MySql>;

/// MySQL-backed durable store.
#[derive(Debug, Clone)]
pub struct Store {
    pool: MySqlPool,
}

impl Store {
    /// Connects a pool according to the configuration.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx` error if the database is
    /// unreachable.
    pub async fn connect(config: &DispatchConfig) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.mysql_url())
            .await?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool (tests, tooling).
    #[must_use]
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Opens a transaction.
    pub async fn begin(&self) -> Result<StoreTx, DispatchError> {
        Ok(self.pool.begin().await?)
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub async fn payment_gateway_url(&self) -> Result<Option<String>, DispatchError> {
        let url = sqlx::query_scalar::<_, String>(
            "SELECT value FROM settings WHERE name = 'payment_gateway_url'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(url)
    }

    pub async fn set_payment_gateway_url(&self, url: &str) -> Result<(), DispatchError> {
        sqlx::query("UPDATE settings SET value = ? WHERE name = 'payment_gateway_url'")
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Riders & coupons ────────────────────────────────────────────────

    pub async fn insert_user(&self, tx: &mut StoreTx, user: &User) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO users (id, username, firstname, lastname, date_of_birth, access_token, \
             invitation_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.date_of_birth)
        .bind(&user.access_token)
        .bind(&user.invitation_code)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn user_by_invitation_code(
        &self,
        tx: &mut StoreTx,
        code: &str,
    ) -> Result<Option<User>, DispatchError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE invitation_code = ?")
            .bind(code)
            .fetch_optional(&mut **tx)
            .await?;
        row.map(UserRow::into_domain).transpose()
    }

    pub async fn insert_coupon(
        &self,
        tx: &mut StoreTx,
        user_id: UserId,
        code: &str,
        discount: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DispatchError> {
        sqlx::query("INSERT INTO coupons (user_id, code, discount, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id.to_string())
            .bind(code)
            .bind(discount)
            .bind(at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Counts redemptions of one invitation coupon code, locking the
    /// matching rows against concurrent registrations.
    pub async fn invitation_coupon_uses(
        &self,
        tx: &mut StoreTx,
        code: &str,
    ) -> Result<i64, DispatchError> {
        let rows = sqlx::query_as::<_, CouponRow>(
            "SELECT * FROM coupons WHERE code = ? LIMIT 4 FOR UPDATE",
        )
        .bind(code)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.len() as i64)
    }

    pub async fn unused_coupon_by_code(
        &self,
        tx: &mut StoreTx,
        user_id: UserId,
        code: &str,
        for_update: bool,
    ) -> Result<Option<Coupon>, DispatchError> {
        let sql = if for_update {
            "SELECT * FROM coupons WHERE user_id = ? AND code = ? AND used_by IS NULL FOR UPDATE"
        } else {
            "SELECT * FROM coupons WHERE user_id = ? AND code = ? AND used_by IS NULL"
        };
        let row = sqlx::query_as::<_, CouponRow>(sql)
            .bind(user_id.to_string())
            .bind(code)
            .fetch_optional(&mut **tx)
            .await?;
        row.map(CouponRow::into_domain).transpose()
    }

    /// Oldest unused coupon of a user; the `created_at ASC` order is
    /// load-bearing for discount selection.
    pub async fn oldest_unused_coupon(
        &self,
        tx: &mut StoreTx,
        user_id: UserId,
        for_update: bool,
    ) -> Result<Option<Coupon>, DispatchError> {
        let sql = if for_update {
            "SELECT * FROM coupons WHERE user_id = ? AND used_by IS NULL \
             ORDER BY created_at LIMIT 1 FOR UPDATE"
        } else {
            "SELECT * FROM coupons WHERE user_id = ? AND used_by IS NULL \
             ORDER BY created_at LIMIT 1"
        };
        let row = sqlx::query_as::<_, CouponRow>(sql)
            .bind(user_id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
        row.map(CouponRow::into_domain).transpose()
    }

    pub async fn mark_coupon_used(
        &self,
        tx: &mut StoreTx,
        user_id: UserId,
        code: &str,
        trip_id: TripId,
    ) -> Result<(), DispatchError> {
        sqlx::query("UPDATE coupons SET used_by = ? WHERE user_id = ? AND code = ?")
            .bind(trip_id.to_string())
            .bind(user_id.to_string())
            .bind(code)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn coupon_used_by(
        &self,
        tx: &mut StoreTx,
        trip_id: TripId,
    ) -> Result<Option<Coupon>, DispatchError> {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE used_by = ?")
            .bind(trip_id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
        row.map(CouponRow::into_domain).transpose()
    }

    // ── Payment tokens ──────────────────────────────────────────────────

    pub async fn insert_payment_token(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<(), DispatchError> {
        sqlx::query("INSERT INTO payment_tokens (user_id, token) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn payment_token(
        &self,
        tx: &mut StoreTx,
        user_id: UserId,
    ) -> Result<Option<String>, DispatchError> {
        let token = sqlx::query_scalar::<_, String>(
            "SELECT token FROM payment_tokens WHERE user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(token)
    }

    // ── Trips ───────────────────────────────────────────────────────────

    pub async fn trips_of_user(
        &self,
        tx: &mut StoreTx,
        user_id: UserId,
    ) -> Result<Vec<Trip>, DispatchError> {
        let trip_rows = sqlx::query_as::<_, TripRow>(
            "SELECT * FROM rides WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&mut **tx)
        .await?;
        trip_rows.into_iter().map(TripRow::into_domain).collect()
    }

    /// Number of the user's trips whose latest status is not COMPLETED.
    pub async fn active_trip_count(
        &self,
        tx: &mut StoreTx,
        user_id: UserId,
    ) -> Result<i64, DispatchError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM rides WHERE user_id = ? AND \
             (SELECT status FROM ride_statuses WHERE ride_id = rides.id \
              ORDER BY created_at DESC LIMIT 1) != 'COMPLETED'",
        )
        .bind(user_id.to_string())
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    pub async fn insert_trip(&self, tx: &mut StoreTx, trip: &Trip) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO rides (id, user_id, pickup_latitude, pickup_longitude, \
             destination_latitude, destination_longitude, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(trip.id.to_string())
        .bind(trip.user_id.to_string())
        .bind(trip.pickup.latitude)
        .bind(trip.pickup.longitude)
        .bind(trip.destination.latitude)
        .bind(trip.destination.longitude)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn trip_count_of_user(
        &self,
        tx: &mut StoreTx,
        user_id: UserId,
    ) -> Result<i64, DispatchError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rides WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&mut **tx)
            .await?;
        Ok(count)
    }

    /// Loads a trip and locks its row for the rest of the transaction.
    pub async fn trip_for_update(
        &self,
        tx: &mut StoreTx,
        trip_id: TripId,
    ) -> Result<Option<Trip>, DispatchError> {
        let row = sqlx::query_as::<_, TripRow>("SELECT * FROM rides WHERE id = ? FOR UPDATE")
            .bind(trip_id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
        row.map(TripRow::into_domain).transpose()
    }

    pub async fn bind_trip_unit(
        &self,
        tx: &mut StoreTx,
        trip_id: TripId,
        unit_id: UnitId,
        at: DateTime<Utc>,
    ) -> Result<(), DispatchError> {
        sqlx::query("UPDATE rides SET chair_id = ?, updated_at = ? WHERE id = ?")
            .bind(unit_id.to_string())
            .bind(at)
            .bind(trip_id.to_string())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Records the evaluation; returns the number of rows touched so the
    /// caller can distinguish a vanished trip.
    pub async fn set_trip_evaluation(
        &self,
        tx: &mut StoreTx,
        trip_id: TripId,
        evaluation: i64,
        at: DateTime<Utc>,
    ) -> Result<u64, DispatchError> {
        let result = sqlx::query("UPDATE rides SET evaluation = ?, updated_at = ? WHERE id = ?")
            .bind(evaluation)
            .bind(at)
            .bind(trip_id.to_string())
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Oldest trips still waiting for a unit.
    pub async fn pending_trips(
        &self,
        tx: &mut StoreTx,
        limit: i64,
    ) -> Result<Vec<Trip>, DispatchError> {
        let trip_rows = sqlx::query_as::<_, TripRow>(
            "SELECT * FROM rides WHERE chair_id IS NULL ORDER BY created_at LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&mut **tx)
        .await?;
        trip_rows.into_iter().map(TripRow::into_domain).collect()
    }

    // ── Statuses ────────────────────────────────────────────────────────

    pub async fn insert_trip_status(
        &self,
        tx: &mut StoreTx,
        row: &TripStatusRow,
    ) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO ride_statuses (id, ride_id, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(row.id.to_string())
        .bind(row.trip_id.to_string())
        .bind(row.status.as_str())
        .bind(row.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn latest_status_of_trip(
        &self,
        tx: &mut StoreTx,
        trip_id: TripId,
    ) -> Result<Option<TripStatusRow>, DispatchError> {
        let row = sqlx::query_as::<_, StatusRow>(
            "SELECT * FROM ride_statuses WHERE ride_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(trip_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;
        row.map(StatusRow::into_domain).transpose()
    }

    // ── Units ───────────────────────────────────────────────────────────

    pub async fn owner_id_by_register_token(
        &self,
        token: &str,
    ) -> Result<Option<OwnerId>, DispatchError> {
        let id = sqlx::query_scalar::<_, String>(
            "SELECT id FROM owners WHERE chair_register_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        id.map(|id| {
            id.parse()
                .map_err(|_| DispatchError::Internal(format!("malformed owner id in store: {id}")))
        })
        .transpose()
    }

    pub async fn owner_name(&self, tx: &mut StoreTx, id: OwnerId) -> Result<Option<String>, DispatchError> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM owners WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
        Ok(name)
    }

    pub async fn insert_unit(&self, unit: &Unit) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO chairs (id, owner_id, name, model, is_active, is_free, access_token, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(unit.id.to_string())
        .bind(unit.owner_id.to_string())
        .bind(&unit.name)
        .bind(&unit.model)
        .bind(unit.is_active)
        .bind(unit.is_free)
        .bind(&unit.access_token)
        .bind(unit.created_at)
        .bind(unit.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_unit_active(&self, unit_id: UnitId, active: bool) -> Result<(), DispatchError> {
        sqlx::query("UPDATE chairs SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(unit_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_unit_free(&self, unit_id: UnitId, free: bool) -> Result<(), DispatchError> {
        sqlx::query("UPDATE chairs SET is_free = ? WHERE id = ?")
            .bind(free)
            .bind(unit_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_unit_free_in_tx(
        &self,
        tx: &mut StoreTx,
        unit_id: UnitId,
        free: bool,
    ) -> Result<(), DispatchError> {
        sqlx::query("UPDATE chairs SET is_free = ? WHERE id = ?")
            .bind(free)
            .bind(unit_id.to_string())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    // ── Locations ───────────────────────────────────────────────────────

    pub async fn upsert_location(
        &self,
        tx: &mut StoreTx,
        location: &UnitLocation,
    ) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO chair_locations_latest \
             (chair_id, latitude, longitude, total_distance, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE latitude = ?, longitude = ?, total_distance = ?, \
             updated_at = ?",
        )
        .bind(location.unit_id.to_string())
        .bind(location.coordinate.latitude)
        .bind(location.coordinate.longitude)
        .bind(location.total_distance)
        .bind(location.updated_at)
        .bind(location.coordinate.latitude)
        .bind(location.coordinate.longitude)
        .bind(location.total_distance)
        .bind(location.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ── Cold load ───────────────────────────────────────────────────────

    /// Reads everything the cache mirrors. Used at startup and on
    /// `/api/initialize`.
    pub async fn load_cache_seed(&self) -> Result<CacheSeed, DispatchError> {
        let users = sqlx::query_as::<_, UserRow>("SELECT * FROM users")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(UserRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let units = sqlx::query_as::<_, UnitRow>("SELECT * FROM chairs")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(UnitRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let trips = sqlx::query_as::<_, TripRow>("SELECT * FROM rides ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TripRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let locations = sqlx::query_as::<_, LocationRow>("SELECT * FROM chair_locations_latest")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LocationRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let statuses = sqlx::query_as::<_, StatusRow>(
            "SELECT * FROM ride_statuses ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| {
            let row = row.into_domain()?;
            Ok((
                row.trip_id,
                LatestStatus {
                    id: row.id,
                    status: row.status,
                    created_at: row.created_at,
                },
            ))
        })
        .collect::<Result<Vec<_>, DispatchError>>()?;

        let applied_coupons =
            sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE used_by IS NOT NULL")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(CouponRow::into_domain)
                .collect::<Result<Vec<_>, _>>()?;

        let ride_stats = sqlx::query_as::<_, RideStatsRow>(
            "SELECT chair_id, COUNT(*) AS total_rides, \
             COALESCE(SUM(evaluation), 0) AS evaluation_sum \
             FROM rides WHERE chair_id IS NOT NULL AND evaluation IS NOT NULL \
             GROUP BY chair_id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(RideStatsRow::into_domain)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(CacheSeed {
            users,
            units,
            trips,
            locations,
            statuses,
            applied_coupons,
            ride_stats,
        })
    }
}

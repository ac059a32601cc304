//! Core records: riders, units, trips, statuses, locations, coupons.

use chrono::{DateTime, Utc};

use super::coordinate::Coordinate;
use super::ids::{OwnerId, StatusId, TripId, UnitId, UserId};
use super::status::TripStatusKind;

/// A rider account.
#[derive(Debug, Clone)]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub date_of_birth: String,
    /// Opaque 32-hex-char session token.
    pub access_token: String,
    /// Code this user hands out to invite others.
    pub invitation_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name used in unit-facing notifications.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// A dispatchable unit.
#[derive(Debug, Clone)]
pub struct Unit {
    /// Stable identifier.
    pub id: UnitId,
    pub owner_id: OwnerId,
    pub name: String,
    pub model: String,
    /// Operator toggle: the unit is switched on.
    pub is_active: bool,
    /// Dispatch flag: the unit is eligible for a new assignment.
    pub is_free: bool,
    /// Opaque 32-hex-char session token.
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single trip lifecycle.
#[derive(Debug, Clone)]
pub struct Trip {
    /// Stable identifier.
    pub id: TripId,
    pub user_id: UserId,
    /// Bound unit; `None` until the matcher assigns one.
    pub unit_id: Option<UnitId>,
    pub pickup: Coordinate,
    pub destination: Coordinate,
    /// Rider evaluation in 1..=5, set exactly once at completion.
    pub evaluation: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the append-only trip status chain.
#[derive(Debug, Clone)]
pub struct TripStatusRow {
    pub id: StatusId,
    pub trip_id: TripId,
    pub status: TripStatusKind,
    pub created_at: DateTime<Utc>,
    /// When the rider stream first delivered this row, if ever.
    pub app_sent_at: Option<DateTime<Utc>>,
    /// When the unit stream first delivered this row, if ever.
    pub unit_sent_at: Option<DateTime<Utc>>,
}

/// Latest known position of a unit plus its odometer.
#[derive(Debug, Clone)]
pub struct UnitLocation {
    pub unit_id: UnitId,
    pub coordinate: Coordinate,
    /// Sum of L1 deltas since the first report. Never decreases.
    pub total_distance: i64,
    pub updated_at: DateTime<Utc>,
    /// Set on every in-memory update, cleared by the write-behind flusher.
    pub dirty: bool,
}

impl UnitLocation {
    /// First report for a unit.
    #[must_use]
    pub fn first_report(unit_id: UnitId, coordinate: Coordinate, at: DateTime<Utc>) -> Self {
        Self {
            unit_id,
            coordinate,
            total_distance: 0,
            updated_at: at,
            dirty: true,
        }
    }

    /// Applies a subsequent report, accumulating the odometer.
    pub fn apply_move(&mut self, to: Coordinate, at: DateTime<Utc>) {
        self.total_distance += self.coordinate.distance_to(to);
        self.coordinate = to;
        self.updated_at = at;
        self.dirty = true;
    }
}

/// A discount coupon. `(user_id, code)` is the primary key.
#[derive(Debug, Clone)]
pub struct Coupon {
    pub user_id: UserId,
    pub code: String,
    /// Discount amount applied to the metered fare.
    pub discount: i64,
    /// Trip this coupon discounted, once spent.
    pub used_by: Option<TripId>,
    pub created_at: DateTime<Utc>,
}

/// Signup campaign coupon code.
pub const COUPON_SIGNUP: &str = "CP_NEW2024";
/// Signup campaign discount.
pub const COUPON_SIGNUP_DISCOUNT: i64 = 3000;
/// Discount for registering with an invitation code.
pub const COUPON_INVITED_DISCOUNT: i64 = 1500;
/// Reward discount granted to the inviter.
pub const COUPON_REWARD_DISCOUNT: i64 = 1000;
/// Maximum redemptions of one invitation code.
pub const INVITATION_MAX_USES: i64 = 3;

/// Per-unit aggregate over completed, evaluated trips.
#[derive(Debug, Clone, Copy, Default)]
pub struct RideStats {
    /// Completed trips that carry an evaluation.
    pub total_rides: i64,
    /// Sum of those evaluations.
    pub evaluation_sum: i64,
}

impl RideStats {
    /// Records one completed evaluation.
    pub fn record(&mut self, evaluation: i64) {
        self.total_rides += 1;
        self.evaluation_sum += evaluation;
    }

    /// Mean evaluation, `0.0` when no trips qualify.
    #[must_use]
    pub fn average(&self) -> f64 {
        if self.total_rides == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let average = self.evaluation_sum as f64 / self.total_rides as f64;
        average
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_odometer_accumulates_l1_deltas() {
        let at = Utc::now();
        let mut loc = UnitLocation::first_report(UnitId::new(), Coordinate::new(0, 0), at);
        assert_eq!(loc.total_distance, 0);

        loc.apply_move(Coordinate::new(3, 4), at);
        assert_eq!(loc.total_distance, 7);

        loc.apply_move(Coordinate::new(3, 4), at);
        assert_eq!(loc.total_distance, 7);

        loc.apply_move(Coordinate::new(0, 0), at);
        assert_eq!(loc.total_distance, 14);
        assert!(loc.dirty);
    }

    #[test]
    fn ride_stats_average() {
        let mut stats = RideStats::default();
        assert_eq!(stats.average(), 0.0);

        stats.record(5);
        stats.record(4);
        assert_eq!(stats.total_rides, 2);
        assert_eq!(stats.average(), 4.5);
    }

    #[test]
    fn user_display_name_joins_first_and_last() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: "rider1".into(),
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            date_of_birth: "1815-12-10".into(),
            access_token: "t".into(),
            invitation_code: "inv".into(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(user.display_name(), "Ada Lovelace");
    }
}

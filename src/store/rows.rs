//! Row types for `sqlx` reads and their conversions into domain records.
//!
//! Identifiers live as ULID strings in MySQL; conversion failures mean
//! store corruption and map to an internal error.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::{
    Coordinate, Coupon, RideStats, Trip, TripId, TripStatusRow, Unit, UnitId, UnitLocation, User,
};
use crate::error::DispatchError;

fn parse_id<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, DispatchError> {
    value
        .parse()
        .map_err(|_| DispatchError::Internal(format!("malformed {what} id in store: {value}")))
}

/// `users` table row.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub date_of_birth: String,
    pub access_token: String,
    pub invitation_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_domain(self) -> Result<User, DispatchError> {
        Ok(User {
            id: parse_id(&self.id, "user")?,
            username: self.username,
            firstname: self.firstname,
            lastname: self.lastname,
            date_of_birth: self.date_of_birth,
            access_token: self.access_token,
            invitation_code: self.invitation_code,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `chairs` table row.
#[derive(Debug, FromRow)]
pub struct UnitRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub model: String,
    pub is_active: bool,
    pub is_free: bool,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnitRow {
    pub fn into_domain(self) -> Result<Unit, DispatchError> {
        Ok(Unit {
            id: parse_id(&self.id, "unit")?,
            owner_id: parse_id(&self.owner_id, "owner")?,
            name: self.name,
            model: self.model,
            is_active: self.is_active,
            is_free: self.is_free,
            access_token: self.access_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `rides` table row.
#[derive(Debug, FromRow)]
pub struct TripRow {
    pub id: String,
    pub user_id: String,
    pub chair_id: Option<String>,
    pub pickup_latitude: i64,
    pub pickup_longitude: i64,
    pub destination_latitude: i64,
    pub destination_longitude: i64,
    pub evaluation: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripRow {
    pub fn into_domain(self) -> Result<Trip, DispatchError> {
        let unit_id: Option<UnitId> = match &self.chair_id {
            Some(id) => Some(parse_id(id, "unit")?),
            None => None,
        };
        Ok(Trip {
            id: parse_id(&self.id, "trip")?,
            user_id: parse_id(&self.user_id, "user")?,
            unit_id,
            pickup: Coordinate::new(self.pickup_latitude, self.pickup_longitude),
            destination: Coordinate::new(self.destination_latitude, self.destination_longitude),
            evaluation: self.evaluation,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `ride_statuses` table row.
#[derive(Debug, FromRow)]
pub struct StatusRow {
    pub id: String,
    pub ride_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub app_sent_at: Option<DateTime<Utc>>,
    pub chair_sent_at: Option<DateTime<Utc>>,
}

impl StatusRow {
    pub fn into_domain(self) -> Result<TripStatusRow, DispatchError> {
        Ok(TripStatusRow {
            id: parse_id(&self.id, "status")?,
            trip_id: parse_id(&self.ride_id, "trip")?,
            status: self
                .status
                .parse()
                .map_err(|e| DispatchError::Internal(format!("{e}")))?,
            created_at: self.created_at,
            app_sent_at: self.app_sent_at,
            unit_sent_at: self.chair_sent_at,
        })
    }
}

/// `chair_locations_latest` table row.
#[derive(Debug, FromRow)]
pub struct LocationRow {
    pub chair_id: String,
    pub latitude: i64,
    pub longitude: i64,
    pub total_distance: i64,
    pub updated_at: DateTime<Utc>,
}

impl LocationRow {
    pub fn into_domain(self) -> Result<UnitLocation, DispatchError> {
        Ok(UnitLocation {
            unit_id: parse_id(&self.chair_id, "unit")?,
            coordinate: Coordinate::new(self.latitude, self.longitude),
            total_distance: self.total_distance,
            updated_at: self.updated_at,
            dirty: false,
        })
    }
}

/// `coupons` table row.
#[derive(Debug, FromRow)]
pub struct CouponRow {
    pub user_id: String,
    pub code: String,
    pub discount: i64,
    pub used_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CouponRow {
    pub fn into_domain(self) -> Result<Coupon, DispatchError> {
        let used_by: Option<TripId> = match &self.used_by {
            Some(id) => Some(parse_id(id, "trip")?),
            None => None,
        };
        Ok(Coupon {
            user_id: parse_id(&self.user_id, "user")?,
            code: self.code,
            discount: self.discount,
            used_by,
            created_at: self.created_at,
        })
    }
}

/// Aggregated ride statistics row, grouped per unit.
#[derive(Debug, FromRow)]
pub struct RideStatsRow {
    pub chair_id: String,
    pub total_rides: i64,
    pub evaluation_sum: i64,
}

impl RideStatsRow {
    pub fn into_domain(self) -> Result<(UnitId, RideStats), DispatchError> {
        Ok((
            parse_id(&self.chair_id, "unit")?,
            RideStats {
                total_rides: self.total_rides,
                evaluation_sum: self.evaluation_sum,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StatusId, UserId};

    #[test]
    fn malformed_id_maps_to_internal() {
        let row = UserRow {
            id: "not-a-ulid!".into(),
            username: "u".into(),
            firstname: "f".into(),
            lastname: "l".into(),
            date_of_birth: "d".into(),
            access_token: "t".into(),
            invitation_code: "i".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            row.into_domain(),
            Err(DispatchError::Internal(_))
        ));
    }

    #[test]
    fn status_row_parses_kind() {
        let row = StatusRow {
            id: StatusId::new().to_string(),
            ride_id: TripId::new().to_string(),
            status: "ENROUTE".into(),
            created_at: Utc::now(),
            app_sent_at: None,
            chair_sent_at: None,
        };
        let parsed = row.into_domain();
        assert!(parsed.is_ok());
    }

    #[test]
    fn trip_row_maps_nullable_unit() {
        let row = TripRow {
            id: TripId::new().to_string(),
            user_id: UserId::new().to_string(),
            chair_id: None,
            pickup_latitude: 0,
            pickup_longitude: 0,
            destination_latitude: 3,
            destination_longitude: 4,
            evaluation: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let trip = row.into_domain();
        let Ok(trip) = trip else {
            panic!("conversion failed");
        };
        assert!(trip.unit_id.is_none());
        assert_eq!(trip.pickup.distance_to(trip.destination), 7);
    }
}

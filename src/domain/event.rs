//! Status events carried by the notification bus.
//!
//! Every trip-status append (and every matcher binding) produces one
//! payload per party. Payloads are serialized as-is into SSE `data:`
//! frames; the rider-side `fare` field is recomputed at delivery time
//! against the trip's applied coupon.

use serde::Serialize;

use super::coordinate::Coordinate;
use super::ids::{StatusId, TripId, UnitId, UserId};
use super::status::TripStatusKind;

/// Payload pushed to a rider's notification stream.
#[derive(Debug, Clone, Serialize)]
pub struct RiderNotification {
    /// Status row this payload announces. Not part of the wire frame;
    /// used for delivery acknowledgment.
    #[serde(skip)]
    pub status_id: StatusId,
    pub ride_id: TripId,
    pub pickup_coordinate: Coordinate,
    pub destination_coordinate: Coordinate,
    /// Discounted fare; recomputed from the applied coupon at delivery.
    pub fare: i64,
    pub status: TripStatusKind,
    /// Bound unit, once the matcher has assigned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chair: Option<NotificationUnit>,
    /// Trip creation, Unix milliseconds.
    pub created_at: i64,
    /// Last trip mutation, Unix milliseconds.
    pub updated_at: i64,
}

/// Unit block inside a rider notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationUnit {
    pub id: UnitId,
    pub name: String,
    pub model: String,
    pub stats: NotificationUnitStats,
}

/// Aggregate shown to the rider next to the bound unit.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationUnitStats {
    pub total_rides_count: i64,
    pub total_evaluation_avg: f64,
}

/// Payload pushed to a unit's notification stream.
#[derive(Debug, Clone, Serialize)]
pub struct UnitNotification {
    /// Status row this payload announces. Not part of the wire frame.
    #[serde(skip)]
    pub status_id: StatusId,
    pub ride_id: TripId,
    pub user: NotificationRider,
    pub pickup_coordinate: Coordinate,
    pub destination_coordinate: Coordinate,
    pub status: TripStatusKind,
}

/// Rider block inside a unit notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRider {
    pub id: UserId,
    pub name: String,
}

/// Which event a [`SentSignal`] acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentKind {
    /// First delivery on the rider stream.
    RiderStream,
    /// First delivery on the unit stream.
    UnitStream,
    /// The evaluation transaction committed.
    EvaluationFlushed,
}

/// Acknowledgment consumed by the status-ack syncer.
///
/// A COMPLETED status needs all three kinds before the bound unit is
/// released back to the free pool.
#[derive(Debug, Clone)]
pub struct SentSignal {
    pub status_id: StatusId,
    pub trip_id: TripId,
    pub unit_id: Option<UnitId>,
    pub status: TripStatusKind,
    pub kind: SentKind,
}

//! Domain layer: identifiers, grid coordinates, core records, the trip
//! status machine, and the event payloads pushed to subscribers.

pub mod coordinate;
pub mod event;
pub mod ids;
pub mod models;
pub mod status;

pub use coordinate::Coordinate;
pub use ids::{OwnerId, StatusId, TripId, UnitId, UserId};
pub use models::{Coupon, RideStats, Trip, TripStatusRow, Unit, UnitLocation, User};
pub use status::TripStatusKind;

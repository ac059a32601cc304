//! Integer grid coordinates and the L1 (taxicab) metric.
//!
//! All positions in the system live on an integer grid; distance between
//! two points is the Manhattan distance. There is no geographic routing.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A point on the dispatch grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    /// Grid latitude.
    pub latitude: i64,
    /// Grid longitude.
    pub longitude: i64,
}

impl Coordinate {
    /// Creates a coordinate from its two axes.
    #[must_use]
    pub const fn new(latitude: i64, longitude: i64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// L1 distance to another point.
    #[must_use]
    pub const fn distance_to(&self, other: Coordinate) -> i64 {
        (self.latitude - other.latitude).abs() + (self.longitude - other.longitude).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_manhattan() {
        let a = Coordinate::new(0, 0);
        let b = Coordinate::new(3, 4);
        assert_eq!(a.distance_to(b), 7);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(-2, 5);
        let b = Coordinate::new(7, -1);
        assert_eq!(a.distance_to(b), b.distance_to(a));
        assert_eq!(a.distance_to(b), 15);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = Coordinate::new(42, -17);
        assert_eq!(a.distance_to(a), 0);
    }

    #[test]
    fn serde_field_names() {
        let json = serde_json::to_string(&Coordinate::new(1, 2)).unwrap_or_default();
        assert_eq!(json, r#"{"latitude":1,"longitude":2}"#);
    }
}

//! Fare computation.
//!
//! The tariff is fixed: a flat initial fare plus a per-grid-unit metered
//! component over the L1 pickup→destination distance. Coupon discounts
//! apply to the metered component only; the initial fare is never
//! discounted.

use crate::domain::Coordinate;

/// Flat component charged on every trip.
pub const INITIAL_FARE: i64 = 500;
/// Metered charge per grid unit of L1 distance.
pub const FARE_PER_DISTANCE: i64 = 100;

/// Metered component for a pickup→destination pair.
#[must_use]
pub fn metered_fare(pickup: Coordinate, destination: Coordinate) -> i64 {
    FARE_PER_DISTANCE * pickup.distance_to(destination)
}

/// Undiscounted total fare.
#[must_use]
pub fn base_fare(pickup: Coordinate, destination: Coordinate) -> i64 {
    INITIAL_FARE + metered_fare(pickup, destination)
}

/// Total fare after applying a discount to the metered component.
///
/// The discount saturates at zero: a coupon can never reduce the total
/// below the initial fare.
#[must_use]
pub fn discounted_total(pickup: Coordinate, destination: Coordinate, discount: i64) -> i64 {
    let metered = metered_fare(pickup, destination);
    INITIAL_FARE + (metered - discount).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_fare_over_seven_units() {
        let fare = base_fare(Coordinate::new(0, 0), Coordinate::new(3, 4));
        assert_eq!(fare, 1200);
    }

    #[test]
    fn undiscounted_total_equals_base_fare() {
        let pickup = Coordinate::new(0, 0);
        let dest = Coordinate::new(3, 4);
        assert_eq!(discounted_total(pickup, dest, 0), base_fare(pickup, dest));
    }

    #[test]
    fn discount_never_touches_initial_fare() {
        // Metered 1000, discount 3000: the metered part bottoms out at
        // zero and the initial fare remains.
        let total = discounted_total(Coordinate::new(0, 0), Coordinate::new(10, 0), 3000);
        assert_eq!(total, INITIAL_FARE);
    }

    #[test]
    fn partial_discount_reduces_metered_component() {
        let total = discounted_total(Coordinate::new(0, 0), Coordinate::new(10, 0), 300);
        assert_eq!(total, 500 + 700);
    }

    #[test]
    fn zero_distance_trip_charges_initial_fare() {
        let point = Coordinate::new(5, 5);
        assert_eq!(base_fare(point, point), INITIAL_FARE);
    }
}

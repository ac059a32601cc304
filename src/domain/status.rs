//! Trip status machine.
//!
//! A trip advances through an append-only chain of statuses; only the
//! transitions encoded in [`TripStatusKind::can_advance_to`] are legal.
//! The two automatic transitions (`Enroute → Pickup`, `Carrying →
//! Arrived`) fire from unit location updates and nowhere else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The status of a trip at one point of its lifecycle.
///
/// Wire and store encoding is the SCREAMING_SNAKE_CASE name
/// (e.g. `"MATCHING"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatusKind {
    /// Waiting for the matcher to bind a unit.
    Matching,
    /// A unit accepted and is heading to the pickup point.
    Enroute,
    /// The unit is at the pickup point.
    Pickup,
    /// The rider is on board.
    Carrying,
    /// The unit is at the destination.
    Arrived,
    /// Evaluation posted and payment settled.
    Completed,
    /// The trip was abandoned before completion.
    Canceled,
}

impl TripStatusKind {
    /// Store / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Matching => "MATCHING",
            Self::Enroute => "ENROUTE",
            Self::Pickup => "PICKUP",
            Self::Carrying => "CARRYING",
            Self::Arrived => "ARRIVED",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Returns `true` for statuses that end a trip.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Returns `true` if `next` is a legal successor of `self`.
    ///
    /// The full transition table:
    ///
    /// ```text
    /// MATCHING → ENROUTE     unit accepts
    /// ENROUTE  → PICKUP      auto: unit location == pickup
    /// PICKUP   → CARRYING    unit acknowledges pickup complete
    /// CARRYING → ARRIVED     auto: unit location == destination
    /// ARRIVED  → COMPLETED   evaluation posted and payment settled
    /// ```
    #[must_use]
    pub const fn can_advance_to(&self, next: TripStatusKind) -> bool {
        matches!(
            (self, next),
            (Self::Matching, Self::Enroute)
                | (Self::Enroute, Self::Pickup)
                | (Self::Pickup, Self::Carrying)
                | (Self::Carrying, Self::Arrived)
                | (Self::Arrived, Self::Completed)
        )
    }
}

impl fmt::Display for TripStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized status string from the store or a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trip status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TripStatusKind {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MATCHING" => Ok(Self::Matching),
            "ENROUTE" => Ok(Self::Enroute),
            "PICKUP" => Ok(Self::Pickup),
            "CARRYING" => Ok(Self::Carrying),
            "ARRIVED" => Ok(Self::Arrived),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const ALL: [TripStatusKind; 7] = [
        TripStatusKind::Matching,
        TripStatusKind::Enroute,
        TripStatusKind::Pickup,
        TripStatusKind::Carrying,
        TripStatusKind::Arrived,
        TripStatusKind::Completed,
        TripStatusKind::Canceled,
    ];

    #[test]
    fn legal_path_advances() {
        let path = [
            TripStatusKind::Matching,
            TripStatusKind::Enroute,
            TripStatusKind::Pickup,
            TripStatusKind::Carrying,
            TripStatusKind::Arrived,
            TripStatusKind::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!TripStatusKind::Matching.can_advance_to(TripStatusKind::Pickup));
        assert!(!TripStatusKind::Enroute.can_advance_to(TripStatusKind::Carrying));
        assert!(!TripStatusKind::Pickup.can_advance_to(TripStatusKind::Arrived));
        assert!(!TripStatusKind::Carrying.can_advance_to(TripStatusKind::Completed));
    }

    #[test]
    fn carrying_requires_pickup() {
        for from in ALL {
            let legal = from == TripStatusKind::Pickup;
            assert_eq!(from.can_advance_to(TripStatusKind::Carrying), legal);
        }
    }

    #[test]
    fn terminal_states_advance_nowhere() {
        for from in [TripStatusKind::Completed, TripStatusKind::Canceled] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_advance_to(to));
            }
        }
    }

    #[test]
    fn repeating_a_state_is_rejected() {
        for s in ALL {
            assert!(!s.can_advance_to(s));
        }
    }

    #[test]
    fn string_round_trip() {
        for s in ALL {
            let parsed: TripStatusKind = s.as_str().parse().ok().unwrap_or_else(|| {
                panic!("parse failed for {s}");
            });
            assert_eq!(parsed, s);
        }
        assert!("RIDING".parse::<TripStatusKind>().is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&TripStatusKind::Enroute).unwrap_or_default();
        assert_eq!(json, r#""ENROUTE""#);
    }
}

//! Type-safe ULID identifiers for the dispatch domain.
//!
//! Every externally visible entity (riders, units, trips, status rows,
//! owners) is keyed by a ULID, string-encoded on the wire and in the
//! store. Newtype wrappers keep the id spaces from being confused with
//! one another.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! ulid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generates a fresh identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Wraps an existing [`Ulid`].
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Ulid::from_str(s)?))
            }
        }

        impl From<Ulid> for $name {
            fn from(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }
    };
}

ulid_id! {
    /// Identifier of a rider account.
    UserId
}

ulid_id! {
    /// Identifier of a dispatchable unit.
    UnitId
}

ulid_id! {
    /// Identifier of a trip.
    TripId
}

ulid_id! {
    /// Identifier of an appended trip-status row.
    StatusId
}

ulid_id! {
    /// Identifier of a unit owner.
    OwnerId
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        let a = TripId::new();
        let b = TripId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_ulid_format() {
        let id = UnitId::new();
        let s = format!("{id}");
        assert_eq!(s.len(), 26); // canonical ULID string length
    }

    #[test]
    fn string_round_trip() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().ok().unwrap_or_else(|| {
            panic!("parse failed");
        });
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_round_trip() {
        let id = StatusId::new();
        let json = serde_json::to_string(&id).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        let deserialized: StatusId = serde_json::from_str(&json).ok().unwrap_or_else(|| {
            panic!("deserialization failed");
        });
        assert_eq!(id, deserialized);
    }

    #[test]
    fn ordering_is_lexicographic_over_strings() {
        // ULID encoding preserves byte order, which the matcher relies on
        // for deterministic tie-breaking.
        let mut ids: Vec<UnitId> = (0..8).map(|_| UnitId::new()).collect();
        let mut by_string = ids.clone();
        ids.sort();
        by_string.sort_by_key(|id| id.to_string());
        assert_eq!(ids, by_string);
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = UnitId::new();
        let mut map = HashMap::new();
        map.insert(id, "test");
        assert_eq!(map.get(&id), Some(&"test"));
    }
}

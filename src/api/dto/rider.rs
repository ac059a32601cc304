//! Rider-facing DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Coordinate;

/// Request body for `POST /api/app/users`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub date_of_birth: String,
    /// Another rider's invitation code, if joining through one.
    #[serde(default)]
    pub invitation_code: Option<String>,
}

/// Response body for `POST /api/app/users`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterUserResponse {
    pub id: String,
    /// Code this rider can hand out to invite others.
    pub invitation_code: String,
}

/// Request body for `POST /api/app/payment-methods`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterPaymentMethodRequest {
    /// Opaque token issued by the payment provider.
    pub token: String,
}

/// Request body for `POST /api/app/rides` and the fare estimate.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTripRequest {
    pub pickup_coordinate: Option<Coordinate>,
    pub destination_coordinate: Option<Coordinate>,
}

/// Response body for `POST /api/app/rides`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateTripResponse {
    pub ride_id: String,
    /// Discounted fare the rider will pay.
    pub fare: i64,
}

/// Response body for `POST /api/app/rides/estimated-fare`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EstimateFareResponse {
    /// Discounted total.
    pub fare: i64,
    /// Amount the best available coupon would shave off.
    pub discount: i64,
}

/// Request body for `POST /api/app/rides/{ride_id}/evaluation`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PostEvaluationRequest {
    /// Rating in 1..=5.
    pub evaluation: i64,
}

/// Response body for the evaluation endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostEvaluationResponse {
    /// Completion time, Unix milliseconds.
    pub completed_at: i64,
}

/// Response body for `GET /api/app/rides`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TripListResponse {
    pub rides: Vec<TripListItem>,
}

/// One completed trip in the history listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct TripListItem {
    pub id: String,
    pub pickup_coordinate: Coordinate,
    pub destination_coordinate: Coordinate,
    pub chair: TripListItemUnit,
    pub fare: i64,
    pub evaluation: i64,
    /// Trip creation, Unix milliseconds.
    pub requested_at: i64,
    /// Trip completion, Unix milliseconds.
    pub completed_at: i64,
}

/// Unit block of a history item.
#[derive(Debug, Serialize, ToSchema)]
pub struct TripListItemUnit {
    pub id: String,
    /// Owner display name.
    pub owner: String,
    pub name: String,
    pub model: String,
}

/// Query parameters for `GET /api/app/nearby-chairs`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NearbyUnitsQuery {
    pub latitude: Option<i64>,
    pub longitude: Option<i64>,
    /// L1 search radius; defaults to 50.
    pub distance: Option<i64>,
}

/// Response body for `GET /api/app/nearby-chairs`.
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyUnitsResponse {
    pub chairs: Vec<NearbyUnitDto>,
    /// Snapshot time, Unix milliseconds.
    pub retrieved_at: i64,
}

/// One unit in the nearby listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyUnitDto {
    pub id: String,
    pub name: String,
    pub model: String,
    pub current_coordinate: Coordinate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_trip_request_tolerates_missing_fields() {
        let parsed: CreateTripRequest = serde_json::from_str("{}").unwrap_or_else(|e| {
            panic!("parse failed: {e}");
        });
        assert!(parsed.pickup_coordinate.is_none());
        assert!(parsed.destination_coordinate.is_none());
    }

    #[test]
    fn register_request_accepts_optional_invitation() {
        let json = r#"{"username":"u","firstname":"f","lastname":"l","date_of_birth":"2000-01-01"}"#;
        let parsed: RegisterUserRequest = serde_json::from_str(json).unwrap_or_else(|e| {
            panic!("parse failed: {e}");
        });
        assert!(parsed.invitation_code.is_none());
    }
}

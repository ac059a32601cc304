//! Unit-facing DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/chair/chairs`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUnitRequest {
    pub name: String,
    pub model: String,
    /// Register token issued to the unit's owner.
    pub chair_register_token: String,
}

/// Response body for `POST /api/chair/chairs`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterUnitResponse {
    pub id: String,
    pub owner_id: String,
}

/// Request body for `POST /api/chair/activity`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UnitActivityRequest {
    pub is_active: bool,
}

/// Response body for `POST /api/chair/coordinate`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostCoordinateResponse {
    /// When the report was recorded, Unix milliseconds.
    pub recorded_at: i64,
}

/// Request body for `POST /api/chair/rides/{ride_id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UnitStatusRequest {
    /// Requested status: `ENROUTE` or `CARRYING`.
    pub status: String,
}

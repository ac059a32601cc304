//! Unit endpoints: registration, activity, location reports, status
//! changes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::api::auth::CHAIR_SESSION_COOKIE;
use crate::api::dto::{
    PostCoordinateResponse, RegisterUnitRequest, RegisterUnitResponse, UnitActivityRequest,
    UnitStatusRequest,
};
use crate::app_state::AppState;
use crate::domain::{Coordinate, TripId, TripStatusKind, Unit};
use crate::error::{DispatchError, ErrorResponse};

/// `POST /api/chair/chairs` — Register a unit under an owner.
///
/// # Errors
///
/// Returns [`DispatchError::Unauthorized`] on an unknown register
/// token.
#[utoipa::path(
    post,
    path = "/api/chair/chairs",
    tag = "Unit",
    request_body = RegisterUnitRequest,
    responses(
        (status = 201, description = "Unit registered", body = RegisterUnitResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Unknown register token", body = ErrorResponse),
    )
)]
pub async fn register_unit(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterUnitRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    if req.name.is_empty() || req.model.is_empty() || req.chair_register_token.is_empty() {
        return Err(DispatchError::BadRequest(
            "some of required fields(name, model, chair_register_token) are empty".to_string(),
        ));
    }

    let unit = state
        .dispatch
        .register_unit(&req.name, &req.model, &req.chair_register_token)
        .await?;

    let jar = jar.add(
        Cookie::build((CHAIR_SESSION_COOKIE, unit.access_token.clone()))
            .path("/")
            .build(),
    );
    let response = RegisterUnitResponse {
        id: unit.id.to_string(),
        owner_id: unit.owner_id.to_string(),
    };
    Ok((jar, (StatusCode::CREATED, Json(response))))
}

/// `POST /api/chair/activity` — Operator on/off toggle.
///
/// # Errors
///
/// Returns [`DispatchError::Internal`] on store failures.
#[utoipa::path(
    post,
    path = "/api/chair/activity",
    tag = "Unit",
    request_body = UnitActivityRequest,
    responses(
        (status = 204, description = "Activity updated"),
    )
)]
pub async fn post_activity(
    State(state): State<AppState>,
    Extension(unit): Extension<Unit>,
    Json(req): Json<UnitActivityRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    state.dispatch.set_unit_activity(unit.id, req.is_active).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/chair/coordinate` — Location report.
///
/// Updates the in-memory location (persisted by the write-behind
/// flusher) and fires the automatic PICKUP / ARRIVED transitions when
/// the unit reaches the relevant point of its bound trip.
///
/// # Errors
///
/// Returns [`DispatchError::Internal`] on store failures during an
/// automatic transition.
#[utoipa::path(
    post,
    path = "/api/chair/coordinate",
    tag = "Unit",
    request_body = Coordinate,
    responses(
        (status = 200, description = "Location recorded", body = PostCoordinateResponse),
    )
)]
pub async fn post_coordinate(
    State(state): State<AppState>,
    Extension(unit): Extension<Unit>,
    Json(coordinate): Json<Coordinate>,
) -> Result<impl IntoResponse, DispatchError> {
    let recorded_at = state.dispatch.record_coordinate(&unit, coordinate).await?;
    Ok(Json(PostCoordinateResponse {
        recorded_at: recorded_at.timestamp_millis(),
    }))
}

/// `POST /api/chair/rides/{ride_id}/status` — Unit-initiated status
/// change (`ENROUTE`, `CARRYING`).
///
/// Validates the assignment and precondition, then queues the
/// transition for the write-behind worker.
///
/// # Errors
///
/// Returns [`DispatchError::BadRequest`] on an unsupported status, a
/// foreign trip, or CARRYING before PICKUP.
#[utoipa::path(
    post,
    path = "/api/chair/rides/{ride_id}/status",
    tag = "Unit",
    params(("ride_id" = String, Path, description = "Trip identifier")),
    request_body = UnitStatusRequest,
    responses(
        (status = 204, description = "Status change queued"),
        (status = 400, description = "Invalid status or precondition failed", body = ErrorResponse),
        (status = 404, description = "Unknown trip", body = ErrorResponse),
    )
)]
pub async fn post_trip_status(
    State(state): State<AppState>,
    Path(ride_id): Path<String>,
    Extension(unit): Extension<Unit>,
    Json(req): Json<UnitStatusRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    let status: TripStatusKind = req
        .status
        .parse()
        .map_err(|_| DispatchError::BadRequest("invalid status".to_string()))?;

    let trip_id: TripId = ride_id
        .parse()
        .map_err(|_| DispatchError::NotFound("ride not found".to_string()))?;

    state.dispatch.request_unit_status(&unit, trip_id, status).await?;
    Ok(StatusCode::NO_CONTENT)
}

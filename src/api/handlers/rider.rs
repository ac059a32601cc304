//! Rider endpoints: registration, payment methods, trips, fares,
//! evaluation, nearby units.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;

use crate::api::auth::APP_SESSION_COOKIE;
use crate::api::dto::{
    CreateTripRequest, CreateTripResponse, EstimateFareResponse, NearbyUnitDto,
    NearbyUnitsQuery, NearbyUnitsResponse, PostEvaluationRequest, PostEvaluationResponse,
    RegisterPaymentMethodRequest, RegisterUserRequest, RegisterUserResponse, TripListItem,
    TripListItemUnit, TripListResponse,
};
use crate::app_state::AppState;
use crate::domain::{TripId, User};
use crate::error::{DispatchError, ErrorResponse};

/// `POST /api/app/users` — Register a rider.
///
/// Grants the signup coupon and settles the invitation chain in one
/// transaction; the session cookie is set on success.
///
/// # Errors
///
/// Returns [`DispatchError::BadRequest`] on missing fields or an
/// unusable invitation code.
#[utoipa::path(
    post,
    path = "/api/app/users",
    tag = "Rider",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Rider registered", body = RegisterUserResponse),
        (status = 400, description = "Missing fields or unusable invitation code", body = ErrorResponse),
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    if req.username.is_empty()
        || req.firstname.is_empty()
        || req.lastname.is_empty()
        || req.date_of_birth.is_empty()
    {
        return Err(DispatchError::BadRequest(
            "required fields(username, firstname, lastname, date_of_birth) are empty".to_string(),
        ));
    }

    let user = state
        .dispatch
        .register_user(
            &req.username,
            &req.firstname,
            &req.lastname,
            &req.date_of_birth,
            req.invitation_code.as_deref(),
        )
        .await?;

    let jar = jar.add(
        Cookie::build((APP_SESSION_COOKIE, user.access_token.clone()))
            .path("/")
            .build(),
    );
    let response = RegisterUserResponse {
        id: user.id.to_string(),
        invitation_code: user.invitation_code,
    };
    Ok((jar, (StatusCode::CREATED, Json(response))))
}

/// `POST /api/app/payment-methods` — Store the rider's payment token.
///
/// # Errors
///
/// Returns [`DispatchError::BadRequest`] on an empty token.
#[utoipa::path(
    post,
    path = "/api/app/payment-methods",
    tag = "Rider",
    request_body = RegisterPaymentMethodRequest,
    responses(
        (status = 204, description = "Payment token stored"),
        (status = 400, description = "Empty token", body = ErrorResponse),
    )
)]
pub async fn register_payment_method(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<RegisterPaymentMethodRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    if req.token.is_empty() {
        return Err(DispatchError::BadRequest(
            "token is required but was empty".to_string(),
        ));
    }
    state
        .dispatch
        .register_payment_token(user.id, &req.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/app/rides` — The rider's completed trips.
///
/// # Errors
///
/// Returns [`DispatchError::Internal`] on store failures.
#[utoipa::path(
    get,
    path = "/api/app/rides",
    tag = "Rider",
    responses(
        (status = 200, description = "Completed trip history", body = TripListResponse),
    )
)]
pub async fn list_trips(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, DispatchError> {
    let views = state.dispatch.completed_trips(&user).await?;

    let rides = views
        .into_iter()
        .map(|view| TripListItem {
            id: view.trip.id.to_string(),
            pickup_coordinate: view.trip.pickup,
            destination_coordinate: view.trip.destination,
            chair: TripListItemUnit {
                id: view.unit.id.to_string(),
                owner: view.owner_name,
                name: view.unit.name,
                model: view.unit.model,
            },
            fare: view.fare,
            evaluation: view.trip.evaluation.unwrap_or_default(),
            requested_at: view.trip.created_at.timestamp_millis(),
            completed_at: view.trip.updated_at.timestamp_millis(),
        })
        .collect();

    Ok(Json(TripListResponse { rides }))
}

/// `POST /api/app/rides` — Request a trip.
///
/// # Errors
///
/// Returns [`DispatchError::Conflict`] while another trip is in flight.
#[utoipa::path(
    post,
    path = "/api/app/rides",
    tag = "Rider",
    request_body = CreateTripRequest,
    responses(
        (status = 202, description = "Trip accepted for matching", body = CreateTripResponse),
        (status = 400, description = "Missing coordinates", body = ErrorResponse),
        (status = 409, description = "A trip is already in flight", body = ErrorResponse),
    )
)]
pub async fn create_trip(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateTripRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    let (Some(pickup), Some(destination)) = (req.pickup_coordinate, req.destination_coordinate)
    else {
        return Err(DispatchError::BadRequest(
            "required fields(pickup_coordinate, destination_coordinate) are empty".to_string(),
        ));
    };

    let (trip_id, fare) = state.dispatch.create_trip(&user, pickup, destination).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateTripResponse {
            ride_id: trip_id.to_string(),
            fare,
        }),
    ))
}

/// `POST /api/app/rides/estimated-fare` — Preview the discounted fare.
///
/// # Errors
///
/// Returns [`DispatchError::BadRequest`] on missing coordinates.
#[utoipa::path(
    post,
    path = "/api/app/rides/estimated-fare",
    tag = "Rider",
    request_body = CreateTripRequest,
    responses(
        (status = 200, description = "Fare estimate", body = EstimateFareResponse),
        (status = 400, description = "Missing coordinates", body = ErrorResponse),
    )
)]
pub async fn estimate_fare(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateTripRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    let (Some(pickup), Some(destination)) = (req.pickup_coordinate, req.destination_coordinate)
    else {
        return Err(DispatchError::BadRequest(
            "required fields(pickup_coordinate, destination_coordinate) are empty".to_string(),
        ));
    };

    let (fare, discount) = state
        .dispatch
        .estimate_fare(user.id, pickup, destination)
        .await?;

    Ok(Json(EstimateFareResponse { fare, discount }))
}

/// `POST /api/app/rides/{ride_id}/evaluation` — Rate the trip and pay.
///
/// # Errors
///
/// Returns [`DispatchError::BadRequest`] before ARRIVED,
/// [`DispatchError::UpstreamFailed`] when the payment gateway stays
/// down.
#[utoipa::path(
    post,
    path = "/api/app/rides/{ride_id}/evaluation",
    tag = "Rider",
    params(("ride_id" = String, Path, description = "Trip identifier")),
    request_body = PostEvaluationRequest,
    responses(
        (status = 200, description = "Trip completed", body = PostEvaluationResponse),
        (status = 400, description = "Precondition failed", body = ErrorResponse),
        (status = 404, description = "Unknown trip", body = ErrorResponse),
        (status = 502, description = "Payment gateway failed", body = ErrorResponse),
    )
)]
pub async fn post_evaluation(
    State(state): State<AppState>,
    Path(ride_id): Path<String>,
    Json(req): Json<PostEvaluationRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    if !(1..=5).contains(&req.evaluation) {
        return Err(DispatchError::BadRequest(
            "evaluation must be between 1 and 5".to_string(),
        ));
    }

    let trip_id: TripId = ride_id
        .parse()
        .map_err(|_| DispatchError::NotFound("ride not found".to_string()))?;

    let completed_at = state.dispatch.post_evaluation(trip_id, req.evaluation).await?;

    Ok(Json(PostEvaluationResponse {
        completed_at: completed_at.timestamp_millis(),
    }))
}

/// `GET /api/app/nearby-chairs` — Free units around a point.
///
/// # Errors
///
/// Returns [`DispatchError::BadRequest`] on missing coordinates.
#[utoipa::path(
    get,
    path = "/api/app/nearby-chairs",
    tag = "Rider",
    params(
        ("latitude" = i64, Query, description = "Center latitude"),
        ("longitude" = i64, Query, description = "Center longitude"),
        ("distance" = Option<i64>, Query, description = "L1 radius, default 50"),
    ),
    responses(
        (status = 200, description = "Nearby free units", body = NearbyUnitsResponse),
        (status = 400, description = "Missing coordinates", body = ErrorResponse),
    )
)]
pub async fn nearby_units(
    State(state): State<AppState>,
    Query(query): Query<NearbyUnitsQuery>,
) -> Result<impl IntoResponse, DispatchError> {
    let (Some(latitude), Some(longitude)) = (query.latitude, query.longitude) else {
        return Err(DispatchError::BadRequest(
            "latitude or longitude is empty".to_string(),
        ));
    };
    let radius = query.distance.unwrap_or(50);
    let center = crate::domain::Coordinate::new(latitude, longitude);

    let chairs = state
        .dispatch
        .nearby_units(center, radius)
        .await
        .into_iter()
        .map(|unit| NearbyUnitDto {
            id: unit.id.to_string(),
            name: unit.name,
            model: unit.model,
            current_coordinate: unit.coordinate,
        })
        .collect();

    Ok(Json(NearbyUnitsResponse {
        chairs,
        retrieved_at: Utc::now().timestamp_millis(),
    }))
}

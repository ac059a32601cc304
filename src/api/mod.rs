//! HTTP layer: routes, DTOs, session middleware, and stream endpoints.
//!
//! Public endpoints (registration, initialize, health) sit next to two
//! authenticated groups: rider routes behind the `app_session` cookie
//! and unit routes behind `chair_session`.

pub mod auth;
pub mod dto;
pub mod handlers;

use axum::routing::{get, post};
use axum::{middleware, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI documentation for the dispatch REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "transit-dispatch",
        version = "0.1.0",
        description = "Dispatch core for an on-demand rider/vehicle service: matching, trip state machine, SSE fan-out, write-behind persistence.",
        license(name = "MIT"),
    ),
    tags(
        (name = "System", description = "Health check and test-harness reset"),
        (name = "Rider", description = "Registration, trips, fares, evaluation"),
        (name = "Unit", description = "Registration, activity, locations, status changes"),
    ),
    paths(
        handlers::system::initialize,
        handlers::system::health,
        handlers::rider::register_user,
        handlers::rider::register_payment_method,
        handlers::rider::list_trips,
        handlers::rider::create_trip,
        handlers::rider::estimate_fare,
        handlers::rider::post_evaluation,
        handlers::rider::nearby_units,
        handlers::unit::register_unit,
        handlers::unit::post_activity,
        handlers::unit::post_coordinate,
        handlers::unit::post_trip_status,
    ),
    components(schemas(
        crate::domain::Coordinate,
        crate::error::ErrorResponse,
        handlers::system::InitializeRequest,
        handlers::system::InitializeResponse,
        handlers::system::HealthResponse,
        dto::RegisterUserRequest,
        dto::RegisterUserResponse,
        dto::RegisterPaymentMethodRequest,
        dto::CreateTripRequest,
        dto::CreateTripResponse,
        dto::EstimateFareResponse,
        dto::PostEvaluationRequest,
        dto::PostEvaluationResponse,
        dto::TripListResponse,
        dto::TripListItem,
        dto::TripListItemUnit,
        dto::NearbyUnitsResponse,
        dto::NearbyUnitDto,
        dto::RegisterUnitRequest,
        dto::RegisterUnitResponse,
        dto::UnitActivityRequest,
        dto::PostCoordinateResponse,
        dto::UnitStatusRequest,
    ))
)]
#[derive(Debug)]
pub struct ApiDoc;

/// Builds the complete router, wiring the session middleware onto the
/// authenticated route groups.
pub fn build_router(state: AppState) -> Router {
    let rider_routes = Router::new()
        .route("/api/app/payment-methods", post(handlers::rider::register_payment_method))
        .route(
            "/api/app/rides",
            get(handlers::rider::list_trips).post(handlers::rider::create_trip),
        )
        .route("/api/app/rides/estimated-fare", post(handlers::rider::estimate_fare))
        .route(
            "/api/app/rides/{ride_id}/evaluation",
            post(handlers::rider::post_evaluation),
        )
        .route("/api/app/notification", get(handlers::stream::rider_notifications))
        .route("/api/app/nearby-chairs", get(handlers::rider::nearby_units))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_rider));

    let unit_routes = Router::new()
        .route("/api/chair/activity", post(handlers::unit::post_activity))
        .route("/api/chair/coordinate", post(handlers::unit::post_coordinate))
        .route("/api/chair/notification", get(handlers::stream::unit_notifications))
        .route(
            "/api/chair/rides/{ride_id}/status",
            post(handlers::unit::post_trip_status),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_unit));

    Router::new()
        .route("/api/initialize", post(handlers::system::initialize))
        .route("/health", get(handlers::system::health))
        .route("/api/app/users", post(handlers::rider::register_user))
        .route("/api/chair/chairs", post(handlers::unit::register_unit))
        .merge(rider_routes)
        .merge(unit_routes)
        .with_state(state)
}

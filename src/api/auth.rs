//! Cookie session middleware.
//!
//! Riders authenticate with the `app_session` cookie, units with
//! `chair_session`; both carry 32-hex-char opaque tokens resolved
//! through the cache. The resolved record is stored as a request
//! extension for the handlers.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;

use crate::app_state::AppState;
use crate::error::DispatchError;

/// Rider session cookie name.
pub const APP_SESSION_COOKIE: &str = "app_session";
/// Unit session cookie name.
pub const CHAIR_SESSION_COOKIE: &str = "chair_session";

/// Requires a valid rider session; injects [`crate::domain::User`].
pub async fn require_rider(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, DispatchError> {
    let token = jar
        .get(APP_SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| {
            DispatchError::Unauthorized(format!("{APP_SESSION_COOKIE} cookie is required"))
        })?;

    let user = state
        .dispatch
        .cache()
        .user_by_token(&token)
        .await
        .ok_or_else(|| DispatchError::Unauthorized("invalid access token".to_string()))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Requires a valid unit session; injects [`crate::domain::Unit`].
pub async fn require_unit(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, DispatchError> {
    let token = jar
        .get(CHAIR_SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| {
            DispatchError::Unauthorized(format!("{CHAIR_SESSION_COOKIE} cookie is required"))
        })?;

    let unit = state
        .dispatch
        .cache()
        .unit_by_token(&token)
        .await
        .ok_or_else(|| DispatchError::Unauthorized("invalid access token".to_string()))?;

    request.extensions_mut().insert(unit);
    Ok(next.run(request).await)
}

//! Dispatch error types with HTTP status code mapping.
//!
//! [`DispatchError`] is the central error type. Request handlers surface
//! it directly; background workers log it and continue. Internal detail
//! never reaches the wire.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// JSON error body. All error responses follow this shape:
/// ```json
/// {"message": "evaluation must be between 1 and 5"}
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum.
///
/// | Variant        | HTTP status              |
/// |----------------|--------------------------|
/// | BadRequest     | 400 Bad Request          |
/// | Unauthorized   | 401 Unauthorized         |
/// | NotFound       | 404 Not Found            |
/// | Conflict       | 409 Conflict             |
/// | UpstreamFailed | 502 Bad Gateway          |
/// | Internal       | 500 Internal Server Error|
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Malformed request or violated precondition.
    #[error("{0}")]
    BadRequest(String),

    /// Session token missing or unresolvable.
    #[error("{0}")]
    Unauthorized(String),

    /// Trip, unit, or status not present.
    #[error("{0}")]
    NotFound(String),

    /// A concurrent trip is already in flight.
    #[error("{0}")]
    Conflict(String),

    /// The payment gateway kept failing upstream.
    #[error("payment gateway failed: {0}")]
    UpstreamFailed(String),

    /// Store or invariant failure. Never recovered in handlers.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UpstreamFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for DispatchError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let mut response = axum::Json(ErrorResponse { message }).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        assert_eq!(
            DispatchError::BadRequest(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::Unauthorized(String::new()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DispatchError::NotFound(String::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DispatchError::Conflict(String::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DispatchError::UpstreamFailed(String::new()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            DispatchError::Internal(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn sqlx_errors_become_internal() {
        let err: DispatchError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DispatchError::Internal(_)));
    }
}

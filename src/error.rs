use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::backend::BackendError;
use crate::booking::BookingError;
use crate::forms::FormError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Form(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Booking(err) => {
                let status = match err {
                    BookingError::InsufficientSeats { .. }
                    | BookingError::TripCancelled
                    | BookingError::TripDeparted
                    | BookingError::AlreadyCancelled
                    | BookingError::StillActive => StatusCode::CONFLICT,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
            ApiError::Backend(BackendError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                "Session expired, please log in again".to_string(),
            ),
            // the booking api's own validation messages go back to the rider
            ApiError::Backend(BackendError::Status { status, detail }) if status.is_client_error() => {
                let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_REQUEST);
                (status, detail)
            }
            ApiError::Backend(BackendError::Config(msg)) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            ApiError::Backend(err) => {
                tracing::error!("Booking API call failed: {}", err);
                (StatusCode::BAD_GATEWAY, "Booking service unavailable".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

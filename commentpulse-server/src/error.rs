//! HTTP error mapping
//!
//! Wraps the core error taxonomy into axum responses. Every failure body has
//! the same shape as the success envelope: `{"success": false, "error": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use commentpulse_core::Error;
use serde_json::json;

/// Error wrapper implementing `IntoResponse` for handlers.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            // Rejected before any write; the producer must fix the payload
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            // Retryable: the store is unreachable or timed out
            Error::StoreUnavailable(_) | Error::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Aggregation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentpulse_core::ValidationErrorKind;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError(Error::validation(
            ValidationErrorKind::MissingField,
            "eventId must not be empty",
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_unavailable_maps_to_503() {
        let err = ApiError(Error::StoreUnavailable("timed out".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_aggregation_maps_to_500() {
        let err = ApiError(Error::Aggregation("scan failed".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

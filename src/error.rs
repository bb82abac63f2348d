//! Error types for the ReviewLens server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// A failure surfaced at a route boundary with the route's own message
    #[error("{message}: {source}")]
    Endpoint {
        message: &'static str,
        with_details: bool,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Wrap the error with the message shown to clients of an endpoint
    pub fn at_endpoint(self, message: &'static str) -> Self {
        AppError::Endpoint {
            message,
            with_details: false,
            source: Box::new(self),
        }
    }

    /// Same as [`AppError::at_endpoint`], but the cause is echoed as `details`
    pub fn at_endpoint_with_details(self, message: &'static str) -> Self {
        AppError::Endpoint {
            message,
            with_details: true,
            source: Box::new(self),
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Endpoint {
                message,
                with_details,
                source,
            } => {
                tracing::error!("{}: {}", message, source);
                ErrorResponse {
                    error: message.to_string(),
                    details: with_details.then(|| source.to_string()),
                }
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ErrorResponse {
                    error: "Database error".to_string(),
                    details: None,
                }
            }
            AppError::Store(msg) | AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    details: None,
                }
            }
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_message_is_kept() {
        let err =
            AppError::Store("connection refused".into()).at_endpoint("Failed to fetch bot data");
        assert_eq!(
            err.to_string(),
            "Failed to fetch bot data: Store error: connection refused"
        );
    }

    #[test]
    fn test_every_error_is_a_500() {
        let response = AppError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::Store("down".into())
            .at_endpoint_with_details("Failed to fetch helpful reviews")
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! API error type and its JSON response mapping

use std::any::Any;

use axum::Json;
use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;
use tubegate_core::PipelineError;

/// Errors returned by API handlers.
///
/// Every variant renders as `{"error": <message>}`. Client errors carry a
/// message meant for the caller; server errors are logged in full and
/// answered with a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `video_id` absent or empty on the metadata endpoint.
    #[error("missing video ID parameter")]
    MissingVideoId,

    /// `video_id` or `resolution` absent or empty on the download endpoint.
    #[error("missing required parameters")]
    MissingParameters,

    /// Query string could not be decoded.
    #[error("invalid query string: {reason}")]
    InvalidQuery {
        /// Decoder detail
        reason: String,
    },

    /// Failure reported by the pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Failure inside the HTTP layer itself.
    #[error("internal error: {reason}")]
    Internal {
        /// Diagnostic detail, never sent to the caller
        reason: String,
    },

    /// No route matched.
    #[error("API endpoint not found")]
    NotFound,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingVideoId
            | ApiError::MissingParameters
            | ApiError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(error) if error.is_user_error() => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Message placed in the response body.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Pipeline(error) => error.user_message(),
            ApiError::Internal { .. } => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response<Body> {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status, self);
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self);
        }

        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Converts a handler panic into a logged 500 response.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Internal {
        reason: format!("handler panicked: {detail}"),
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_errors_are_client_errors() {
        let response =
            ApiError::from(PipelineError::validation("invalid resolution")).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "invalid resolution" })
        );
    }

    #[tokio::test]
    async fn test_upstream_detail_is_hidden() {
        let response =
            ApiError::from(PipelineError::upstream("yt-dlp: signature extraction failed"))
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "internal server error" })
        );
    }

    #[tokio::test]
    async fn test_panic_response() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "internal server error" })
        );
    }

    #[test]
    fn test_parameter_errors() {
        assert_eq!(ApiError::MissingVideoId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::MissingParameters.user_message(),
            "missing required parameters"
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }
}

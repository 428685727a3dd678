//! Tubegate Core - Video metadata and streaming pipeline
//!
//! This crate provides the building blocks behind the Tubegate HTTP façade:
//! URL validation, the extractor abstraction that talks to YouTube, the
//! metadata responder, the download streamer, and configuration management.

pub mod config;
pub mod extractor;
pub mod mode;
pub mod pipeline;
pub mod tracing_setup;
pub mod validation;

// Re-export main types for convenient access
pub use config::{ExtractorConfig, PipelineConfig, ServerConfig, TubegateConfig};
pub use extractor::{ExtractedStream, ExtractedVideo, ExtractorError, VideoExtractor};
pub use mode::RuntimeMode;
pub use pipeline::{StreamDescriptor, StreamSource, VideoMetadata, VideoService};

/// Errors surfaced by the request-to-stream pipeline.
///
/// Two tiers: validation failures are safe to show to callers, upstream
/// failures carry diagnostic detail that stays in the logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("{message}")]
    Validation { message: String },

    #[error("upstream failure: {reason}")]
    Upstream { reason: String },
}

impl PipelineError {
    /// Creates a validation error with a caller-facing message.
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation {
            message: message.into(),
        }
    }

    /// Creates an upstream error carrying internal detail.
    pub fn upstream(reason: impl Into<String>) -> Self {
        PipelineError::Upstream {
            reason: reason.into(),
        }
    }

    /// Returns a message suitable for the HTTP response body.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation { message } => message.clone(),
            PipelineError::Upstream { .. } => "internal server error".to_string(),
        }
    }

    /// Checks if this error was caused by the request or the requested content.
    pub fn is_user_error(&self) -> bool {
        matches!(self, PipelineError::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

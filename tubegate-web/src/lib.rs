//! Tubegate Web - JSON API Server

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! HTTP façade over the Tubegate pipeline: video metadata as JSON and
//! progressive MP4 downloads streamed straight through to the client.

pub mod errors;
pub mod handlers;
pub mod server;

// Re-export main types
pub use errors::ApiError;
pub use server::{AppState, build_router, run_server};

//! End-to-end tests for Tubegate
//!
//! These tests drive the full router, from query parsing through the
//! pipeline to the streamed response body, against scripted and
//! development extractors. `live_server` binds a real socket.

mod common;
mod download_streaming;
mod http_surface;
mod live_server;
mod logging;

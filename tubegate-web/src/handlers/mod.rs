//! HTTP request handlers organized by functionality

pub mod api;
pub mod pages;

// Re-export handler functions
pub use api::{DownloadQuery, VideoInfoQuery, api_download, api_video_info, content_disposition};
pub use pages::{HealthStatus, health_check, index_page, not_found};

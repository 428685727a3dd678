//! Centralized configuration for Tubegate.
//!
//! All tunable parameters are defined here. Server and extractor settings
//! accept environment overrides at startup; pipeline limits are compiled-in
//! defaults. The resulting values are immutable and passed explicitly to the
//! components that need them.

use std::path::PathBuf;
use std::time::Duration;

use crate::mode::RuntimeMode;

/// Longest video, in seconds, the pipeline will describe or stream.
pub const DEFAULT_MAX_VIDEO_DURATION_SECS: u64 = 3600;

/// Size of each chunk written to a download response body.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024; // 1 MiB

/// Domains accepted by the URL validator.
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &["youtube.com", "youtu.be"];

/// Central configuration for all Tubegate components.
#[derive(Debug, Clone, Default)]
pub struct TubegateConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub extractor: ExtractorConfig,
    pub runtime_mode: RuntimeMode,
}

/// HTTP listener and logging configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Raises console logging to debug level
    pub debug: bool,
    /// Directory holding the persistent log file
    pub log_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` string used to bind the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Limits applied by the metadata responder and download streamer.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Videos longer than this are rejected
    pub max_duration_secs: u64,
    /// Domains accepted by the URL validator
    pub allowed_domains: Vec<String>,
    /// Download body chunk size in bytes
    pub chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: DEFAULT_MAX_VIDEO_DURATION_SECS,
            allowed_domains: DEFAULT_ALLOWED_DOMAINS
                .iter()
                .map(|domain| domain.to_string())
                .collect(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Settings for the yt-dlp backed extractor.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Path or name of the yt-dlp binary
    pub ytdlp_path: String,
    /// Upper bound on a single metadata extraction
    pub extraction_timeout: Duration,
    /// Socket timeout handed to yt-dlp
    pub socket_timeout: Duration,
    /// Connect timeout for fetching stream bytes
    pub connect_timeout: Duration,
    /// User agent for stream requests when yt-dlp does not provide one
    pub user_agent: &'static str,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            extraction_timeout: Duration::from_secs(60),
            socket_timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(15),
            user_agent: "tubegate/0.1.0",
        }
    }
}

impl TubegateConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Reads `HOST`, `PORT`, `DEBUG`, `TUBEGATE_MODE`, `TUBEGATE_LOG_DIR`,
    /// `TUBEGATE_YTDLP_PATH` and `TUBEGATE_EXTRACTOR_TIMEOUT`. Unparseable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            if !host.trim().is_empty() {
                config.server.host = host.trim().to_string();
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.trim().parse::<u16>() {
                config.server.port = port;
            }
        }

        if let Ok(debug) = std::env::var("DEBUG") {
            config.server.debug = debug.trim().eq_ignore_ascii_case("true");
        }

        if let Ok(log_dir) = std::env::var("TUBEGATE_LOG_DIR") {
            if !log_dir.trim().is_empty() {
                config.server.log_dir = PathBuf::from(log_dir.trim());
            }
        }

        if let Ok(mode) = std::env::var("TUBEGATE_MODE") {
            if let Ok(mode) = mode.parse::<RuntimeMode>() {
                config.runtime_mode = mode;
            }
        }

        if let Ok(path) = std::env::var("TUBEGATE_YTDLP_PATH") {
            if !path.trim().is_empty() {
                config.extractor.ytdlp_path = path.trim().to_string();
            }
        }

        if let Ok(timeout) = std::env::var("TUBEGATE_EXTRACTOR_TIMEOUT") {
            if let Ok(seconds) = timeout.trim().parse::<u64>() {
                config.extractor.extraction_timeout = Duration::from_secs(seconds);
            }
        }

        config
    }

    /// Creates a configuration for offline development.
    pub fn for_development() -> Self {
        Self {
            runtime_mode: RuntimeMode::Development,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = TubegateConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert!(!config.server.debug);
        assert_eq!(config.pipeline.max_duration_secs, 3600);
        assert_eq!(config.pipeline.chunk_size, 1_048_576);
        assert_eq!(
            config.pipeline.allowed_domains,
            vec!["youtube.com".to_string(), "youtu.be".to_string()]
        );
        assert_eq!(config.extractor.ytdlp_path, "yt-dlp");
        assert_eq!(config.runtime_mode, RuntimeMode::Production);
        assert_eq!(config.server.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn test_development_preset() {
        let config = TubegateConfig::for_development();
        assert!(config.runtime_mode.is_development());
        assert_eq!(config.pipeline.max_duration_secs, 3600);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("HOST", "127.0.0.1");
            std::env::set_var("PORT", "8080");
            std::env::set_var("DEBUG", "True");
            std::env::set_var("TUBEGATE_MODE", "development");
            std::env::set_var("TUBEGATE_YTDLP_PATH", "/opt/bin/yt-dlp");
            std::env::set_var("TUBEGATE_EXTRACTOR_TIMEOUT", "90");
            std::env::set_var("TUBEGATE_LOG_DIR", "/var/log/tubegate");
        }

        let config = TubegateConfig::from_env();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.debug);
        assert_eq!(config.runtime_mode, RuntimeMode::Development);
        assert_eq!(config.extractor.ytdlp_path, "/opt/bin/yt-dlp");
        assert_eq!(config.extractor.extraction_timeout, Duration::from_secs(90));
        assert_eq!(config.server.log_dir, PathBuf::from("/var/log/tubegate"));

        // Cleanup
        unsafe {
            std::env::remove_var("HOST");
            std::env::remove_var("PORT");
            std::env::remove_var("DEBUG");
            std::env::remove_var("TUBEGATE_MODE");
            std::env::remove_var("TUBEGATE_YTDLP_PATH");
            std::env::remove_var("TUBEGATE_EXTRACTOR_TIMEOUT");
            std::env::remove_var("TUBEGATE_LOG_DIR");
        }
    }
}

//! CLI command implementations

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::Subcommand;
use tubegate_core::tracing_setup::{CliLogLevel, init_tracing};
use tubegate_core::validation::extract_video_id;
use tubegate_core::{RuntimeMode, TubegateConfig, VideoService};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Server {
        /// Host to bind to (overrides HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Runtime mode: production or development (overrides TUBEGATE_MODE)
        #[arg(long)]
        mode: Option<RuntimeMode>,
        /// Log at debug level (same as DEBUG=true)
        #[arg(long)]
        debug: bool,
        /// Directory for the persistent log file (overrides TUBEGATE_LOG_DIR)
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Print metadata and downloadable streams for a video as JSON
    Info {
        /// Video ID or YouTube URL
        video: String,
        /// Runtime mode: production or development
        #[arg(long)]
        mode: Option<RuntimeMode>,
    },
    /// Check whether a URL is an accepted YouTube video URL
    Validate {
        /// URL to check
        url: String,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the failure of the command that ran
pub async fn handle_command(command: Commands, log_level: CliLogLevel) -> anyhow::Result<()> {
    match command {
        Commands::Server {
            host,
            port,
            mode,
            debug,
            log_dir,
        } => {
            let mut config = TubegateConfig::from_env();
            apply_server_overrides(&mut config, host, port, mode, debug, log_dir);
            start_server(config, log_level).await
        }
        Commands::Info { video, mode } => {
            init_console_tracing(log_level);
            let mut config = TubegateConfig::from_env();
            if let Some(mode) = mode {
                config.runtime_mode = mode;
            }
            show_info(&config, &video).await
        }
        Commands::Validate { url } => validate_url(&url),
    }
}

fn apply_server_overrides(
    config: &mut TubegateConfig,
    host: Option<String>,
    port: Option<u16>,
    mode: Option<RuntimeMode>,
    debug: bool,
    log_dir: Option<PathBuf>,
) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(mode) = mode {
        config.runtime_mode = mode;
    }
    if debug {
        config.server.debug = true;
    }
    if let Some(log_dir) = log_dir {
        config.server.log_dir = log_dir;
    }
}

/// Start the HTTP server
///
/// # Errors
/// - Logging could not be initialized
/// - Extractor initialization or listener binding failed
pub async fn start_server(config: TubegateConfig, log_level: CliLogLevel) -> anyhow::Result<()> {
    let console_level = if config.server.debug {
        tracing::Level::DEBUG
    } else {
        log_level.as_tracing_level()
    };

    let log_file = init_tracing(console_level, Some(&config.server.log_dir))
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
    tracing::debug!("Writing logs to {}", log_file.display());

    tubegate_web::run_server(config)
        .await
        .map_err(|e| anyhow!("server error: {e}"))
}

/// Print video metadata as pretty JSON
///
/// # Errors
/// - Extractor could not be initialized
/// - Video rejected or extraction failed
pub async fn show_info(config: &TubegateConfig, video: &str) -> anyhow::Result<()> {
    let service = VideoService::from_runtime_mode(config.runtime_mode, config)
        .context("failed to initialize extractor")?;

    let metadata = service.get_video_info(video).await.map_err(|e| {
        if e.is_user_error() {
            anyhow!("{}", e.user_message())
        } else {
            anyhow!("{e}")
        }
    })?;

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

/// Report whether a URL is accepted
///
/// # Errors
/// Returns an error when the URL is rejected, so the exit status reflects the result
pub fn validate_url(url: &str) -> anyhow::Result<()> {
    match extract_video_id(url) {
        Some(video_id) => {
            println!("valid: video ID {video_id}");
            Ok(())
        }
        None => Err(anyhow!("invalid YouTube URL: {url}")),
    }
}

fn init_console_tracing(log_level: CliLogLevel) {
    tracing_subscriber::fmt()
        .with_max_level(log_level.as_tracing_level())
        .with_writer(std::io::stderr)
        .init();
}

//! Tubegate CLI - Command-line interface
//!
//! Runs the HTTP server and offers one-shot metadata and URL checks.

mod commands;

use clap::Parser;
use tubegate_core::tracing_setup::CliLogLevel;

#[derive(Parser)]
#[command(name = "tubegate")]
#[command(about = "YouTube metadata and progressive MP4 streaming service")]
struct Cli {
    /// Console log level
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::handle_command(cli.command, cli.log_level).await
}

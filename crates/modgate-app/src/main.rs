//! Modgate - content moderation service.
//!
//! This is the main binary:
//! - `modgate serve` runs the HTTP API (with embedded workers by default)
//! - `modgate worker` runs background workers only

use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use modgate_app::{runtime, Cli, Command};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "modgate", "modgate").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging to the console and a daily-rotated file.
fn init_logging(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = cli.effective_log_level();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("modgate={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("modgate")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Keep the guard alive for the duration of the program
    let _log_guard = init_logging(&cli);

    tracing::info!("Starting Modgate {}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Command::Serve(ref args) => runtime::serve(&cli, args).await,
        Command::Worker => runtime::work(&cli).await,
    };

    if let Err(ref e) = result {
        tracing::error!("Modgate stopped with an error: {:#}", e);
    }

    tracing::info!("Modgate shutting down");
    result
}

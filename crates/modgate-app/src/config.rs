//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use modgate_core::{OpenAiConfig, DEFAULT_MODERATION_MODEL, DEFAULT_OPENAI_BASE_URL};
use modgate_server::{ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use modgate_storage::{Database, SharedStore};
use modgate_worker::WorkerConfig;

/// Modgate - content moderation service
#[derive(Parser, Debug)]
#[command(name = "modgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(long, env = "DEBUG", global = true)]
    pub debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Records database file
    #[arg(long, env = "DATABASE_PATH", global = true)]
    pub database_path: Option<PathBuf>,

    /// Shared cache and task queue file
    #[arg(long, env = "STORE_PATH", global = true)]
    pub store_path: Option<PathBuf>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL, global = true)]
    pub openai_base_url: String,

    /// Moderation model
    #[arg(long, env = "MODERATION_MODEL", default_value = DEFAULT_MODERATION_MODEL, global = true)]
    pub moderation_model: String,

    /// Seconds a cached result stays valid
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 3600, global = true)]
    pub cache_ttl_secs: u64,

    /// Number of concurrent workers
    #[arg(long, env = "WORKERS", default_value_t = 4, global = true)]
    pub workers: usize,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API, with embedded workers unless --no-workers
    Serve(ServeArgs),
    /// Run workers only
    Worker,
}

/// Options for `serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind to
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Do not start workers in this process
    #[arg(long)]
    pub no_workers: bool,
}

impl Cli {
    /// Effective log level.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }

    /// Records database path, defaulting to the app data directory.
    pub fn database_path(&self) -> modgate_storage::Result<PathBuf> {
        match self.database_path {
            Some(ref path) => Ok(path.clone()),
            None => Database::default_db_path(),
        }
    }

    /// Shared store path, defaulting to the app data directory.
    pub fn store_path(&self) -> modgate_storage::Result<PathBuf> {
        match self.store_path {
            Some(ref path) => Ok(path.clone()),
            None => SharedStore::default_store_path(),
        }
    }

    /// Provider configuration.
    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self.openai_api_key.clone(),
            ..OpenAiConfig::default()
        }
        .with_base_url(self.openai_base_url.as_str())
        .with_model(self.moderation_model.as_str())
    }

    /// Cache time-to-live.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Worker pool configuration.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::default().with_concurrency(self.workers)
    }
}

impl ServeArgs {
    /// Server configuration.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_host(self.host.as_str())
            .with_port(self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "modgate",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--no-workers",
            "--workers",
            "2",
        ])
        .unwrap();

        let Command::Serve(ref args) = cli.command else {
            panic!("expected serve");
        };
        assert!(args.no_workers);
        assert_eq!(args.server_config().host, "127.0.0.1");
        assert_eq!(args.server_config().port, 9000);
        assert_eq!(cli.worker_config().concurrency, 2);
    }

    #[test]
    fn test_provider_settings() {
        let cli = Cli::try_parse_from([
            "modgate",
            "worker",
            "--openai-api-key",
            "sk-test",
            "--openai-base-url",
            "http://localhost:9999/v1/",
            "--moderation-model",
            "omni-moderation-latest",
            "--cache-ttl-secs",
            "60",
        ])
        .unwrap();

        let config = cli.openai_config();
        assert!(config.has_credential());
        assert_eq!(config.base_url, "http://localhost:9999/v1");
        assert_eq!(config.model, "omni-moderation-latest");
        assert_eq!(cli.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_debug_overrides_level() {
        let cli = Cli::try_parse_from(["modgate", "worker", "--debug", "--log-level", "warn"]).unwrap();
        assert_eq!(cli.effective_log_level(), "debug");
    }

    #[test]
    fn test_explicit_paths() {
        let cli = Cli::try_parse_from([
            "modgate",
            "worker",
            "--database-path",
            "/tmp/records.db",
            "--store-path",
            "/tmp/store.db",
        ])
        .unwrap();

        assert_eq!(cli.database_path().unwrap(), PathBuf::from("/tmp/records.db"));
        assert_eq!(cli.store_path().unwrap(), PathBuf::from("/tmp/store.db"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["modgate"]).is_err());
    }
}

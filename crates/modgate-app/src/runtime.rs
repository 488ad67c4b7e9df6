//! Process wiring for the `serve` and `worker` commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use modgate_core::{ClassificationGateway, OpenAiProvider};
use modgate_server::{AppState, Server};
use modgate_storage::{Database, KeyValueStore, SharedStore};
use modgate_worker::{
    Metrics, ResultCache, StatsAggregator, TaskBroker, TaskContext, TaskExecutor, WorkerPool,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Cli, ServeArgs};

/// How often expired cache entries are deleted.
const STORE_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Opened and verified backing stores.
pub struct Services {
    pub db: Database,
    pub store: SharedStore,
    pub metrics: Metrics,
}

impl Services {
    /// Opens both databases, running migrations, and pings each.
    pub fn open(cli: &Cli) -> anyhow::Result<Self> {
        let db_path = cli.database_path()?;
        let db = Database::with_path(&db_path)
            .with_context(|| format!("failed to open records database at {:?}", db_path))?;
        db.ping().context("records database did not answer")?;

        let store_path = cli.store_path()?;
        let store = SharedStore::with_path(&store_path)
            .with_context(|| format!("failed to open shared store at {:?}", store_path))?;
        store.ping().context("shared store did not answer")?;

        let metrics = Metrics::new()?;

        info!(records = ?db_path, store = ?store_path, "Storage ready");
        Ok(Self { db, store, metrics })
    }

    /// Builds the task executor against these stores.
    pub fn executor(&self, cli: &Cli) -> anyhow::Result<TaskExecutor> {
        let config = cli.openai_config();
        if !config.has_credential() {
            warn!("OpenAI API key not configured; classification calls will fail");
        }

        let provider = OpenAiProvider::new(config)?;
        let kv: Arc<dyn KeyValueStore> = Arc::new(self.store.clone());

        Ok(TaskExecutor::new(TaskContext {
            cache: ResultCache::with_ttl(kv.clone(), cli.cache_ttl()),
            stats: StatsAggregator::new(kv),
            metrics: self.metrics.clone(),
            db: self.db.clone(),
            gateway: ClassificationGateway::new(Arc::new(provider)),
        }))
    }

    fn broker(&self) -> Arc<dyn TaskBroker> {
        Arc::new(self.store.clone())
    }

    fn spawn_workers(&self, cli: &Cli) -> anyhow::Result<WorkerPool> {
        Ok(WorkerPool::spawn(
            cli.worker_config(),
            self.broker(),
            self.executor(cli)?,
        ))
    }
}

/// Runs the API server, with embedded workers unless disabled.
pub async fn serve(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    let services = Services::open(cli)?;

    let pool = if args.no_workers {
        info!("Embedded workers disabled");
        None
    } else {
        Some(services.spawn_workers(cli)?)
    };
    let sweeper = spawn_store_sweeper(services.store.clone());

    let state = AppState::with_stores(
        services.db.clone(),
        services.store.clone(),
        services.metrics.clone(),
        cli.openai_api_key.clone(),
    );
    let server = Server::with_state(args.server_config(), state)?;
    let result = server.run_until(shutdown_signal()).await;

    sweeper.abort();
    if let Some(pool) = pool {
        pool.shutdown().await;
    }

    result.map_err(Into::into)
}

/// Runs workers until interrupted.
pub async fn work(cli: &Cli) -> anyhow::Result<()> {
    let services = Services::open(cli)?;
    let pool = services.spawn_workers(cli)?;
    let sweeper = spawn_store_sweeper(services.store.clone());

    shutdown_signal().await;

    sweeper.abort();
    pool.shutdown().await;
    Ok(())
}

fn spawn_store_sweeper(store: SharedStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STORE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired() {
                Ok(0) => {}
                Ok(n) => debug!(removed = n, "Purged expired cache entries"),
                Err(e) => warn!("Failed to purge expired cache entries: {}", e),
            }
        }
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}

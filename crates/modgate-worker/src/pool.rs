//! Worker pool.
//!
//! A fixed number of tokio tasks, each claiming deliveries from a
//! [`TaskBroker`] and running them through a [`TaskExecutor`]. Each delivery
//! runs in its own child task so a panic fails that task instead of killing
//! the worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::{Delivery, TaskBroker};
use crate::executor::{Outcome, TaskExecutor};

/// Heartbeats older than this mean the worker is gone.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(30);

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Sleep between claims when the queue is empty.
    pub poll_interval: Duration,
    /// How often each worker refreshes its heartbeat.
    pub heartbeat_interval: Duration,
    /// Running tasks claimed longer ago than this are requeued.
    pub visibility_timeout: Duration,
    /// How often stale tasks are swept.
    pub maintenance_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_millis(250),
            heartbeat_interval: Duration::from_secs(10),
            visibility_timeout: Duration::from_secs(300),
            maintenance_interval: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Sets the number of workers (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the idle poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the heartbeat interval.
    pub fn with_heartbeat_interval(mut self, heartbeat_interval: Duration) -> Self {
        self.heartbeat_interval = heartbeat_interval;
        self
    }
}

/// Handle to a running set of workers.
pub struct WorkerPool {
    worker_ids: Vec<String>,
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    /// Starts the workers and the stale-task sweeper.
    pub fn spawn(
        config: WorkerConfig,
        broker: Arc<dyn TaskBroker>,
        executor: TaskExecutor,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let instance = Uuid::new_v4().simple().to_string();

        let mut worker_ids = Vec::with_capacity(config.concurrency);
        let mut handles = Vec::with_capacity(config.concurrency + 1);

        for i in 0..config.concurrency.max(1) {
            let id = format!("worker-{}-{}", &instance[..8], i);
            worker_ids.push(id.clone());
            handles.push(tokio::spawn(run_worker(
                id,
                broker.clone(),
                executor.clone(),
                config.clone(),
                rx.clone(),
            )));
        }

        handles.push(tokio::spawn(run_sweeper(broker, config.clone(), rx)));

        info!(workers = worker_ids.len(), "Worker pool started");

        Self {
            worker_ids,
            handles,
            shutdown,
        }
    }

    /// Identifiers of the workers in this pool.
    pub fn worker_ids(&self) -> &[String] {
        &self.worker_ids
    }

    /// Signals every worker to stop and waits for them.
    ///
    /// In-flight tasks finish first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }

        info!("Worker pool stopped");
    }
}

async fn run_worker(
    id: String,
    broker: Arc<dyn TaskBroker>,
    executor: TaskExecutor,
    config: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(worker_id = %id, "Worker started");
    let mut last_heartbeat: Option<Instant> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }

        if last_heartbeat.map_or(true, |t| t.elapsed() >= config.heartbeat_interval) {
            beat(&id, broker.as_ref());
            last_heartbeat = Some(Instant::now());
        }

        match broker.claim(&id) {
            Ok(Some(delivery)) => {
                process(&id, broker.as_ref(), &executor, config.heartbeat_interval, delivery).await
            }
            Ok(None) => {
                if !idle(&mut shutdown, config.poll_interval).await {
                    break;
                }
            }
            Err(e) => {
                warn!(worker_id = %id, "Failed to claim task: {}", e);
                if !idle(&mut shutdown, config.poll_interval).await {
                    break;
                }
            }
        }
    }

    if let Err(e) = broker.deregister(&id) {
        warn!(worker_id = %id, "Failed to deregister worker: {}", e);
    }
    debug!(worker_id = %id, "Worker stopped");
}

/// Runs one delivery to a stored result.
///
/// The worker keeps sending heartbeats while the task runs, however long
/// the classification call takes.
async fn process(
    id: &str,
    broker: &dyn TaskBroker,
    executor: &TaskExecutor,
    heartbeat_interval: Duration,
    delivery: Delivery,
) {
    let Delivery {
        handle,
        content,
        attempt,
    } = delivery;
    debug!(worker_id = %id, task_id = %handle, attempt, "Running task");

    let task_executor = executor.clone();
    let mut child = tokio::spawn(async move { task_executor.execute(&content).await });

    let mut heartbeat = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let joined = loop {
        tokio::select! {
            joined = &mut child => break joined,
            _ = heartbeat.tick() => beat(id, broker),
        }
    };

    let stored = match joined {
        Ok(outcome) => {
            if let Outcome::Failed(ref message) = outcome {
                debug!(task_id = %handle, "Task finished with error payload: {}", message);
            }
            broker.complete(&handle, &outcome.into_payload())
        }
        Err(e) => {
            error!(task_id = %handle, "Task aborted: {}", e);
            broker.fail(&handle, &format!("task aborted: {}", e))
        }
    };

    if let Err(e) = stored {
        error!(task_id = %handle, "Failed to store task result: {}", e);
    }
}

fn beat(id: &str, broker: &dyn TaskBroker) {
    if let Err(e) = broker.heartbeat(id) {
        warn!(worker_id = %id, "Heartbeat failed: {}", e);
    }
}

async fn run_sweeper(
    broker: Arc<dyn TaskBroker>,
    config: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        match broker.requeue_stale(config.visibility_timeout) {
            Ok(0) => {}
            Ok(n) => info!(requeued = n, "Requeued stale tasks"),
            Err(e) => warn!("Failed to requeue stale tasks: {}", e),
        }

        if !idle(&mut shutdown, config.maintenance_interval).await {
            break;
        }
    }
}

/// Sleeps for `period` unless shutdown arrives first. Returns false on shutdown.
async fn idle(shutdown: &mut watch::Receiver<bool>, period: Duration) -> bool {
    if *shutdown.borrow() {
        return false;
    }

    let changed = tokio::select! {
        _ = tokio::time::sleep(period) => return true,
        changed = shutdown.changed() => changed,
    };

    changed.is_ok() && !*shutdown.borrow()
}

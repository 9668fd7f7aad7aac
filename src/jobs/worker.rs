use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::FormResult;
use crate::jobs::queue::JobQueue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolOptions {
    pub workers: usize,
    /// Wait between polls of an empty queue.
    pub poll_interval: Duration,
    /// Stop a worker the first time the queue is empty.
    pub once: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self { workers: 1, poll_interval: Duration::from_secs(60), once: false }
    }
}

/// Jobs finished by a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl PoolSummary {
    fn merge(self, other: PoolSummary) -> Self {
        Self { succeeded: self.succeeded + other.succeeded, failed: self.failed + other.failed }
    }
}

/// Pull URLs from `queue` on `options.workers` threads and hand each to
/// `run_job`. Each job gets its own browser inside `run_job`; workers share
/// only the queue. Returns when every worker has stopped, which without
/// `once` is never.
pub fn run_pool<F>(queue: &dyn JobQueue, options: &PoolOptions, run_job: F) -> PoolSummary
where
    F: Fn(&str) -> FormResult<()> + Sync,
{
    let workers = options.workers.max(1);
    info!(workers, once = options.once, "starting job workers");

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let run_job = &run_job;
                thread::Builder::new()
                    .name(format!("worker-{}", id))
                    .spawn_scoped(scope, move || work(id, queue, options, run_job))
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| match handle {
                Ok(h) => h.join().map_err(|_| error!("worker panicked")).ok(),
                Err(e) => {
                    error!(error = %e, "worker thread could not be spawned");
                    None
                }
            })
            .fold(PoolSummary::default(), PoolSummary::merge)
    })
}

fn work<F>(id: usize, queue: &dyn JobQueue, options: &PoolOptions, run_job: &F) -> PoolSummary
where
    F: Fn(&str) -> FormResult<()>,
{
    let mut summary = PoolSummary::default();
    loop {
        let next = queue.next_job().unwrap_or_else(|e| {
            warn!(worker = id, error = %e, "could not fetch next job");
            None
        });
        let Some(url) = next else {
            if options.once {
                info!(worker = id, "queue empty, worker stopping");
                return summary;
            }
            debug!(worker = id, wait = ?options.poll_interval, "no jobs, sleeping");
            thread::sleep(options.poll_interval);
            continue;
        };

        info!(worker = id, url = %url, "job started");
        let success = match run_job(&url) {
            Ok(()) => {
                info!(worker = id, url = %url, "job succeeded");
                summary.succeeded += 1;
                true
            }
            Err(e) => {
                error!(worker = id, url = %url, error = %e, "job failed");
                summary.failed += 1;
                false
            }
        };
        if let Err(e) = queue.report(&url, success) {
            error!(worker = id, url = %url, error = %e, "could not report job result");
        }
    }
}

//! Worker pool (spec §4.F): `hardware_concurrency - 1` OS threads, each
//! with a channel mask, running the claim/check/execute/complete loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::job::ChannelMask;
use crate::scheduler::SchedulerCore;

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// A fixed set of worker threads polling a shared `SchedulerCore`.
pub struct WorkerPool {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` threads, each with `channel_mask`, sharing
    /// `scheduler`.
    pub fn start(scheduler: Arc<SchedulerCore>, worker_count: usize, channel_mask: ChannelMask) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handles = (0..worker_count)
            .map(|index| {
                let scheduler = Arc::clone(&scheduler);
                let stop = Arc::clone(&stop);
                std::thread::Builder::new()
                    .name(format!("flowforge-worker-{index}"))
                    .spawn(move || worker_loop(index, scheduler, stop, channel_mask))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { stop, handles }
    }

    /// The default worker count: `hardware_concurrency - 1`, floored at 1.
    pub fn default_worker_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1)
    }

    /// Signals every worker to stop after its current step, then joins them.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(index: usize, scheduler: Arc<SchedulerCore>, stop: Arc<AtomicBool>, mask: ChannelMask) {
    debug!(worker = index, "worker started");
    while !stop.load(Ordering::SeqCst) {
        let Some(job_id) = scheduler.claim_blocking(mask, POLL_TIMEOUT) else {
            continue;
        };

        if !scheduler.depgraph.are_dependencies_resolved(job_id, &scheduler.history) {
            if let Err(err) = scheduler.requeue(job_id) {
                warn!(worker = index, job_id = %job_id, error = %err, "failed to re-enqueue job with unmet dependencies");
            }
            std::thread::sleep(POLL_TIMEOUT);
            continue;
        }

        let executed = scheduler.registry.with_job(job_id, |job| job.execute());
        if let Err(err) = executed {
            warn!(worker = index, job_id = %job_id, error = %err, "job vanished before execute");
            continue;
        }

        if let Err(err) = scheduler.mark_completed(job_id) {
            warn!(worker = index, job_id = %job_id, error = %err, "failed to mark job completed");
        }

        std::thread::sleep(POLL_TIMEOUT);
    }
    debug!(worker = index, "worker stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};

    use super::*;
    use crate::job::{JobBehavior, JobStatus, ShellJob};

    #[test]
    fn worker_pool_drains_a_single_job() {
        let scheduler = Arc::new(SchedulerCore::new());
        scheduler.registry.register(
            "echo",
            Box::new(|| Some(Box::new(ShellJob::new("true")) as Box<dyn JobBehavior>)),
        );
        let created = scheduler.registry.create("echo", json!({"command": "true"})).unwrap();
        scheduler.enqueue(created.job_id).unwrap();

        let pool = WorkerPool::start(Arc::clone(&scheduler), 1, ChannelMask::default());

        let mut waited = Duration::ZERO;
        while scheduler.status(created.job_id) != JobStatus::Completed && waited < Duration::from_secs(2) {
            std::thread::sleep(Duration::from_millis(20));
            waited += Duration::from_millis(20);
        }

        pool.stop();
        assert_eq!(scheduler.status(created.job_id), JobStatus::Completed);
        let _: Value = scheduler.await_job(created.job_id);
        assert_eq!(scheduler.status(created.job_id), JobStatus::Retired);
    }
}

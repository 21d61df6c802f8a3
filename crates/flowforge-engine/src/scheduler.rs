//! Scheduler core (spec §4.E): owns the queued/running/completed queues and
//! implements enqueue/claim/complete/wait. Each queue has its own lock;
//! operations touching more than one take them in the fixed order
//! `queued -> running -> completed`, and never hold a queue lock while
//! calling into another queue operation. `history`, `registry`, and
//! `depgraph` are independent components with their own internal locking.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::depgraph::DependencyGraph;
use crate::error::{EngineError, EngineResult};
use crate::history::HistoryLog;
use crate::job::{ChannelMask, JobId, JobStatus};
use crate::registry::JobRegistry;

pub struct SchedulerCore {
    queued: Mutex<VecDeque<JobId>>,
    running: Mutex<Vec<JobId>>,
    completed: Mutex<Vec<JobId>>,
    ready_signal: Condvar,
    pub registry: JobRegistry,
    pub history: HistoryLog,
    pub depgraph: DependencyGraph,
}

impl SchedulerCore {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            running: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            ready_signal: Condvar::new(),
            registry: JobRegistry::new(),
            history: HistoryLog::new(),
            depgraph: DependencyGraph::new(),
        }
    }

    /// Asserts the job exists, appends a `Queued` history entry (or
    /// transitions an existing one), pushes onto the ready queue, and wakes
    /// one waiting worker.
    pub fn enqueue(&self, job_id: JobId) -> EngineResult<()> {
        if !self.registry.contains(job_id) {
            return Err(EngineError::NoSuchJob(job_id.0));
        }
        let job_type = self.registry.with_job(job_id, |job| job.job_type.clone())?;

        match self.history.lookup(job_id) {
            JobStatus::NeverSeen => self.history.append(job_id, job_type, JobStatus::Queued),
            _ => self.history.set_status(job_id, JobStatus::Queued),
        }

        self.queued.lock().unwrap().push_back(job_id);
        self.ready_signal.notify_one();
        debug!(job_id = %job_id, "enqueued");
        Ok(())
    }

    /// Scans the ready queue front-to-back for the first job whose channel
    /// mask ANDed with `worker_mask` is non-zero, removes it, moves it to
    /// running, and transitions it to `Running`. Returns `None` if no job
    /// matches.
    pub fn claim(&self, worker_mask: ChannelMask) -> Option<JobId> {
        let mut queued = self.queued.lock().unwrap();
        let position = queued.iter().position(|id| {
            self.registry
                .with_job(*id, |job| job.channel_mask.matches(worker_mask))
                .unwrap_or(false)
        })?;
        let job_id = queued.remove(position)?;
        drop(queued);

        self.running.lock().unwrap().push(job_id);
        self.history.set_status(job_id, JobStatus::Running);
        debug!(job_id = %job_id, "claimed");
        Some(job_id)
    }

    /// Like `claim`, but waits on a condition variable up to `timeout` for
    /// a fresh `Enqueue`/`MarkCompleted` signal before retrying, instead of
    /// busy-sleeping (spec §9's preference over plain polling).
    pub fn claim_blocking(&self, worker_mask: ChannelMask, timeout: Duration) -> Option<JobId> {
        if let Some(id) = self.claim(worker_mask) {
            return Some(id);
        }
        let queued = self.queued.lock().unwrap();
        let (guard, _timed_out) = self.ready_signal.wait_timeout(queued, timeout).unwrap();
        drop(guard);
        self.claim(worker_mask)
    }

    /// Moves a claimed-but-not-yet-runnable job back from `running` to
    /// `queued`, for a worker that claimed a job whose dependencies turned
    /// out to be unmet. Leaving the id in `running` while also enqueuing it
    /// would put it in both queues at once (spec §8 property 1).
    pub fn requeue(&self, job_id: JobId) -> EngineResult<()> {
        self.running.lock().unwrap().retain(|id| *id != job_id);
        self.enqueue(job_id)
    }

    /// Removes `job_id` from running, appends it to completed, transitions
    /// to `Completed`, propagates its output payload to every direct
    /// successor's input (shallow overwrite), then enqueues any successor
    /// that just became fully resolved.
    pub fn mark_completed(&self, job_id: JobId) -> EngineResult<()> {
        self.running.lock().unwrap().retain(|id| *id != job_id);
        self.completed.lock().unwrap().push(job_id);
        self.history.set_status(job_id, JobStatus::Completed);

        let output = self.registry.with_job(job_id, |job| job.output())?;
        for dependent in self.depgraph.dependents_of(job_id) {
            let _ = self
                .registry
                .with_job(dependent, |job| job.set_input(output.clone()));
        }

        for ready in self.depgraph.on_prereq_completed(job_id) {
            self.enqueue(ready)?;
        }

        info!(job_id = %job_id, "completed");
        Ok(())
    }

    /// Runs `on_complete` and transitions to `Retired` for every job
    /// currently in the completed queue, then drops the jobs. Non-blocking.
    pub fn drain_completed(&self) {
        let ids: Vec<JobId> = self.completed.lock().unwrap().drain(..).collect();
        for id in ids {
            self.retire(id);
        }
    }

    fn retire(&self, id: JobId) {
        if let Some(job) = self.registry.take_job(id) {
            job.on_complete();
        }
        self.history.set_status(id, JobStatus::Retired);
    }

    /// Blocks until `job_id` reaches `Completed`, then retires it alone and
    /// returns a result document. Once this returns success, `on_complete`
    /// has already run and status is `Retired`.
    pub fn await_job(&self, job_id: JobId) -> Value {
        loop {
            match self.history.lookup(job_id) {
                JobStatus::NeverSeen => {
                    return json!({ "status": "error", "message": EngineError::NoSuchJob(job_id.0).to_string() });
                }
                JobStatus::Retired => {
                    return json!({ "status": "error", "message": EngineError::AlreadyRetired(job_id.0).to_string() });
                }
                JobStatus::Completed => {
                    let position = {
                        let completed = self.completed.lock().unwrap();
                        completed.iter().position(|id| *id == job_id)
                    };
                    match position {
                        Some(_) => {
                            self.completed.lock().unwrap().retain(|id| *id != job_id);
                            self.retire(job_id);
                            return json!({ "status": "success", "message": format!("job {job_id} completed") });
                        }
                        None => {
                            return json!({
                                "status": "error",
                                "message": EngineError::NotFoundInCompleted(job_id.0).to_string(),
                            });
                        }
                    }
                }
                _ => std::thread::sleep(Duration::from_millis(20)),
            }
        }
    }

    pub fn status(&self, job_id: JobId) -> JobStatus {
        self.history.lookup(job_id)
    }
}

impl Default for SchedulerCore {
    fn default() -> Self {
        Self::new()
    }
}

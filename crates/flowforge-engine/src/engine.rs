//! Engine facade (spec §6): the stable API surface used by the driver and
//! by tests. Constructed explicitly — no process-wide singleton (spec §9's
//! redesign note) — and owns the scheduler core and worker pool together.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::EngineResult;
use crate::job::{ChannelMask, JobId};
use crate::registry::Factory;
use crate::runner::GraphRunner;
use crate::scheduler::SchedulerCore;
use crate::worker::WorkerPool;

/// Owns one scheduler core and, once started, one worker pool. Callers
/// talk to this type exclusively; `flowforge-cli` passes one `Arc<Engine>`
/// to itself and to the worker pool.
pub struct Engine {
    core: Arc<SchedulerCore>,
    pool: Option<WorkerPool>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            core: Arc::new(SchedulerCore::new()),
            pool: None,
        }
    }

    /// Registers a job factory under `job_type`.
    pub fn register(&self, job_type: impl Into<String>, factory: Factory) {
        self.core.registry.register(job_type, factory);
    }

    /// Creates a job of `job_type`, stamping `input` as its initial payload.
    pub fn create(&self, job_type: &str, input: Value) -> EngineResult<Value> {
        let created = self.core.registry.create(job_type, input)?;
        Ok(json!({
            "jobId": created.job_id.0,
            "status": created.status,
            "dependencies": created.dependencies.iter().map(|id| id.0).collect::<Vec<_>>(),
        }))
    }

    /// Resolves `dependent_type`/`prerequisite_type` to their most-recently
    /// created job ids and records the dependency.
    pub fn set_dependency(&self, dependent_type: &str, prerequisite_type: &str) -> EngineResult<()> {
        self.core
            .depgraph
            .set_dependency(&self.core.registry, dependent_type, prerequisite_type)
    }

    /// Pushes `job_id` onto the ready queue.
    pub fn enqueue(&self, job_id: JobId) -> EngineResult<()> {
        self.core.enqueue(job_id)
    }

    /// Current status of `job_id`, one of `never seen`, `queued`, `running`,
    /// `completed`, `retired`.
    pub fn status(&self, job_id: JobId) -> Value {
        json!({ "jobId": job_id.0, "status": self.core.status(job_id).as_str() })
    }

    /// Blocks until `job_id` completes, retires it, and returns
    /// `{status: "success"|"error", message}`.
    pub fn await_job(&self, job_id: JobId) -> Value {
        self.core.await_job(job_id)
    }

    /// Snapshot of registered job type names.
    pub fn list_types(&self) -> Value {
        json!({ "availableJobTypes": self.core.registry.list_types() })
    }

    /// Parses and runs a FlowScript source via the graph runner, using the
    /// built-in factory table plus any already-registered factories.
    pub fn run_flowscript(&self, source: &str) -> EngineResult<Vec<JobId>> {
        let graph = flowforge_lang::parse(source)?;
        let runner = GraphRunner::with_default_factories(&self.core);
        runner.run(&graph)
    }

    /// Starts the worker pool with `worker_count` threads (or the default
    /// `hardware_concurrency - 1` if `None`), each able to claim any job.
    pub fn start(&mut self, worker_count: Option<usize>) {
        if self.pool.is_some() {
            return;
        }
        let count = worker_count.unwrap_or_else(WorkerPool::default_worker_count);
        self.pool = Some(WorkerPool::start(Arc::clone(&self.core), count, ChannelMask::default()));
    }

    /// Signals every worker to stop after its current step and joins them.
    pub fn stop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.stop();
        }
    }

    /// Stops the worker pool (if running) and drains any completed jobs.
    pub fn destroy(&mut self) {
        self.stop();
        self.core.drain_completed();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobBehavior, ShellJob};

    #[test]
    fn create_then_enqueue_then_await_reports_success() {
        let engine = Engine::new();
        engine.register("echo", Box::new(|| Some(Box::new(ShellJob::new("true")) as Box<dyn JobBehavior>)));
        let created = engine.create("echo", json!({"command": "true"})).unwrap();
        let job_id = JobId(created["jobId"].as_u64().unwrap());

        engine.enqueue(job_id).unwrap();
        engine.core.claim(ChannelMask::default()).unwrap();
        engine.core.registry.with_job(job_id, |job| job.execute()).unwrap();
        engine.core.mark_completed(job_id).unwrap();

        let result = engine.await_job(job_id);
        assert_eq!(result["status"], "success");
    }

    #[test]
    fn list_types_reflects_registrations() {
        let engine = Engine::new();
        engine.register("echo", Box::new(|| Some(Box::new(ShellJob::new("true")) as Box<dyn JobBehavior>)));
        let types = engine.list_types();
        assert_eq!(types["availableJobTypes"][0], "echo");
    }

    #[test]
    fn start_stop_is_idempotent() {
        let mut engine = Engine::new();
        engine.start(Some(1));
        engine.start(Some(1));
        engine.stop();
        engine.stop();
    }
}

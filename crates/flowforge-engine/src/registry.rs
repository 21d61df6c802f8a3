//! Job registry (spec §4.B): maps a job-type name to a factory producing a
//! fresh job instance, plus the id-indexed job table.

use std::sync::atomic::AtomicU64;
use std::sync::Mutex;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::job::{Job, JobBehavior, JobId};

/// Produces a fresh job behavior for a given job type. Factories are
/// effectful: each call returns an independent instance.
pub type Factory = Box<dyn Fn() -> Option<Box<dyn JobBehavior>> + Send + Sync>;

/// Result of `Create`, per spec §4.B.
#[derive(Debug)]
pub struct Created {
    pub job_id: JobId,
    pub status: &'static str,
    pub dependencies: Vec<JobId>,
}

/// Type -> factory map plus the id-indexed job table. `Register` overwrites
/// an existing factory for the same type name (spec §9's open question,
/// resolved in favor of overwrite — see SPEC_FULL.md §5).
pub struct JobRegistry {
    id_counter: AtomicU64,
    factories: Mutex<FxHashMap<String, Factory>>,
    available_types: Mutex<Vec<String>>,
    jobs: Mutex<FxHashMap<JobId, Job>>,
    /// Last id created under each type name, for `SetDependency`'s
    /// name-to-id resolution (spec §4.D, §9).
    last_created: Mutex<FxHashMap<String, JobId>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            id_counter: AtomicU64::new(0),
            factories: Mutex::new(FxHashMap::default()),
            available_types: Mutex::new(Vec::new()),
            jobs: Mutex::new(FxHashMap::default()),
            last_created: Mutex::new(FxHashMap::default()),
        }
    }

    /// Registers a factory under `job_type`, appending it to the
    /// available-types list if not already present.
    pub fn register(&self, job_type: impl Into<String>, factory: Factory) {
        let job_type = job_type.into();
        let mut factories = self.factories.lock().unwrap();
        let is_new = !factories.contains_key(&job_type);
        factories.insert(job_type.clone(), factory);
        drop(factories);

        if is_new {
            self.available_types.lock().unwrap().push(job_type.clone());
        }
        debug!(job_type = %job_type, "registered job factory");
    }

    /// Snapshot of the available-types list, in registration order.
    pub fn list_types(&self) -> Vec<String> {
        self.available_types.lock().unwrap().clone()
    }

    /// Constructs a new job of `job_type`, stamps its input, and records it
    /// in the id-indexed job table. Returns `UnknownType` if `job_type` was
    /// never registered, `FactoryReturnedNull` if the factory produced
    /// nothing.
    pub fn create(&self, job_type: &str, input: Value) -> EngineResult<Created> {
        let behavior = {
            let factories = self.factories.lock().unwrap();
            let factory = factories
                .get(job_type)
                .ok_or_else(|| EngineError::UnknownType(job_type.to_string()))?;
            factory()
        };
        let behavior = behavior.ok_or_else(|| EngineError::FactoryReturnedNull(job_type.to_string()))?;

        let id = JobId::next(&self.id_counter);
        let job = Job::new(id, job_type, behavior);
        job.set_input(input);

        self.jobs.lock().unwrap().insert(id, job);
        self.last_created.lock().unwrap().insert(job_type.to_string(), id);

        debug!(job_type = %job_type, job_id = %id, "created job");

        Ok(Created {
            job_id: id,
            status: "created",
            dependencies: Vec::new(),
        })
    }

    /// The most-recently created job id under `job_type`, used by
    /// `SetDependency`'s type-name resolution (spec §4.D).
    pub fn last_created_id(&self, job_type: &str) -> EngineResult<JobId> {
        self.last_created
            .lock()
            .unwrap()
            .get(job_type)
            .copied()
            .ok_or_else(|| EngineError::UnknownJobTypeName(job_type.to_string()))
    }

    /// Runs `f` with exclusive access to the job stored under `id`.
    pub fn with_job<R>(&self, id: JobId, f: impl FnOnce(&mut Job) -> R) -> EngineResult<R> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&id).ok_or(EngineError::NoSuchJob(id.0))?;
        Ok(f(job))
    }

    /// Removes and returns the job stored under `id`, if any.
    pub fn take_job(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().unwrap().remove(&id)
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.jobs.lock().unwrap().contains_key(&id)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ShellJob;

    fn shell_factory() -> Factory {
        Box::new(|| Some(Box::new(ShellJob::new("true")) as Box<dyn JobBehavior>))
    }

    #[test]
    fn register_appends_to_available_types_once() {
        let registry = JobRegistry::new();
        registry.register("echo", shell_factory());
        registry.register("echo", shell_factory());
        assert_eq!(registry.list_types(), vec!["echo".to_string()]);
    }

    #[test]
    fn create_unknown_type_fails() {
        let registry = JobRegistry::new();
        let err = registry.create("missing", Value::Null).unwrap_err();
        assert!(matches!(err, EngineError::UnknownType(_)));
    }

    #[test]
    fn create_allocates_monotonic_ids() {
        let registry = JobRegistry::new();
        registry.register("echo", shell_factory());
        let first = registry.create("echo", Value::Null).unwrap();
        let second = registry.create("echo", Value::Null).unwrap();
        assert_eq!(first.job_id.0 + 1, second.job_id.0);
    }

    #[test]
    fn factory_returning_none_is_rejected() {
        let registry = JobRegistry::new();
        registry.register("dead", Box::new(|| None));
        let err = registry.create("dead", Value::Null).unwrap_err();
        assert!(matches!(err, EngineError::FactoryReturnedNull(_)));
    }

    #[test]
    fn last_created_id_resolves_by_type_name() {
        let registry = JobRegistry::new();
        registry.register("echo", shell_factory());
        let created = registry.create("echo", Value::Null).unwrap();
        assert_eq!(registry.last_created_id("echo").unwrap(), created.job_id);
    }
}

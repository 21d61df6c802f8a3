//! Per-job status history (spec §4.C). Indexed by `JobId` rather than
//! position: the runner enqueues root jobs in id order while skipping
//! interleaved non-root ids, so ids reaching `append` are not dense.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::job::{JobId, JobStatus};

struct Entry {
    job_type: String,
    status: JobStatus,
}

/// Keyed by `JobId`, guarded by a single lock — reads and writes both need a
/// consistent per-id snapshot, and history mutation is cheap enough that a
/// single `Mutex` does not become a bottleneck next to the scheduler's queue
/// locks.
pub struct HistoryLog {
    entries: Mutex<FxHashMap<JobId, Entry>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Records a job's first status, called exactly once per job at queue
    /// time. Safe to call for any id regardless of what other ids have been
    /// recorded already.
    pub fn append(&self, id: JobId, job_type: impl Into<String>, status: JobStatus) {
        self.entries.lock().unwrap().insert(
            id,
            Entry {
                job_type: job_type.into(),
                status,
            },
        );
    }

    /// Transitions an already-appended job's status in place.
    pub fn set_status(&self, id: JobId, status: JobStatus) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(&id) {
            entry.status = status;
        }
    }

    /// Current status, or `NeverSeen` if `id` has no entry yet.
    pub fn lookup(&self, id: JobId) -> JobStatus {
        self.entries
            .lock()
            .unwrap()
            .get(&id)
            .map(|e| e.status)
            .unwrap_or(JobStatus::NeverSeen)
    }

    /// The job type recorded at queue time, if any.
    pub fn job_type(&self, id: JobId) -> Option<String> {
        self.entries.lock().unwrap().get(&id).map(|e| e.job_type.clone())
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_out_of_range_is_never_seen() {
        let history = HistoryLog::new();
        assert_eq!(history.lookup(JobId(0)), JobStatus::NeverSeen);
    }

    #[test]
    fn append_then_lookup_round_trips() {
        let history = HistoryLog::new();
        history.append(JobId(0), "echo", JobStatus::Queued);
        assert_eq!(history.lookup(JobId(0)), JobStatus::Queued);
        assert_eq!(history.job_type(JobId(0)).as_deref(), Some("echo"));
    }

    #[test]
    fn set_status_transitions_in_place() {
        let history = HistoryLog::new();
        history.append(JobId(0), "echo", JobStatus::Queued);
        history.set_status(JobId(0), JobStatus::Running);
        assert_eq!(history.lookup(JobId(0)), JobStatus::Running);
    }

    #[test]
    fn sparse_ids_do_not_panic() {
        let history = HistoryLog::new();
        history.append(JobId(0), "root", JobStatus::Queued);
        history.append(JobId(5), "leaf", JobStatus::Queued);
        assert_eq!(history.lookup(JobId(5)), JobStatus::Queued);
        assert_eq!(history.lookup(JobId(3)), JobStatus::NeverSeen);
    }
}

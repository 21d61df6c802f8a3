//! Dependency graph (spec §4.D): job id -> unmet prerequisites, mutated as
//! prerequisites complete. A flat map, not a `petgraph::DiGraph` — the
//! engine only ever needs "list of unmet prerequisites for this id" and
//! "list of dependents for this id", never general graph traversal.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::history::HistoryLog;
use crate::job::{JobId, JobStatus};
use crate::registry::JobRegistry;

/// `JobId -> ordered list of unmet prerequisite JobIds`, plus the inverse
/// `prereqId -> {dependentId}` index kept in lock-step (spec §9's
/// back-reference note).
pub struct DependencyGraph {
    pending: Mutex<FxHashMap<JobId, Vec<JobId>>>,
    dependents: Mutex<FxHashMap<JobId, Vec<JobId>>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(FxHashMap::default()),
            dependents: Mutex::new(FxHashMap::default()),
        }
    }

    /// Resolves `dependent_type` and `prerequisite_type` to their
    /// most-recently created job ids and appends the prerequisite to the
    /// dependent's unmet list. Must be called only after the dependent job
    /// has been created; recreating a type under the same name silently
    /// retargets future calls (spec §4.D, §9 — documented limitation of the
    /// type-name indirection, not fixed here).
    pub fn set_dependency(
        &self,
        registry: &JobRegistry,
        dependent_type: &str,
        prerequisite_type: &str,
    ) -> crate::error::EngineResult<()> {
        let dependent = registry.last_created_id(dependent_type)?;
        let prerequisite = registry.last_created_id(prerequisite_type)?;
        self.add_edge(dependent, prerequisite);
        Ok(())
    }

    /// Adds `prerequisite` as an unmet dependency of `dependent`.
    pub fn add_edge(&self, dependent: JobId, prerequisite: JobId) {
        let mut pending = self.pending.lock().unwrap();
        let list = pending.entry(dependent).or_default();
        if !list.contains(&prerequisite) {
            list.push(prerequisite);
        }
        drop(pending);

        let mut dependents = self.dependents.lock().unwrap();
        let list = dependents.entry(prerequisite).or_default();
        if !list.contains(&dependent) {
            list.push(dependent);
        }
    }

    /// True iff `job_id` has no entry in the pending map, or every listed
    /// prerequisite has status `Completed`.
    pub fn are_dependencies_resolved(&self, job_id: JobId, history: &HistoryLog) -> bool {
        match self.pending.lock().unwrap().get(&job_id) {
            None => true,
            Some(prereqs) => prereqs
                .iter()
                .all(|id| history.lookup(*id) == JobStatus::Completed),
        }
    }

    /// For every dependent of `prereq_id`: removes it from that dependent's
    /// unmet list; if the list becomes empty, drops the entry and returns
    /// the now-ready dependent so the caller can enqueue it.
    pub fn on_prereq_completed(&self, prereq_id: JobId) -> Vec<JobId> {
        let dependents = {
            let table = self.dependents.lock().unwrap();
            table.get(&prereq_id).cloned().unwrap_or_default()
        };

        let mut ready = Vec::new();
        let mut pending = self.pending.lock().unwrap();
        for dependent in dependents {
            if let Some(list) = pending.get_mut(&dependent) {
                list.retain(|id| *id != prereq_id);
                if list.is_empty() {
                    pending.remove(&dependent);
                    ready.push(dependent);
                }
            }
        }
        ready
    }

    /// Direct dependents of `job_id` (for output propagation).
    pub fn dependents_of(&self, job_id: JobId) -> Vec<JobId> {
        self.dependents
            .lock()
            .unwrap()
            .get(&job_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_with_no_entry_is_resolved() {
        let graph = DependencyGraph::new();
        let history = HistoryLog::new();
        assert!(graph.are_dependencies_resolved(JobId(0), &history));
    }

    #[test]
    fn unmet_prerequisite_blocks_readiness() {
        let graph = DependencyGraph::new();
        let history = HistoryLog::new();
        history.append(JobId(0), "A", JobStatus::Queued);
        graph.add_edge(JobId(1), JobId(0));

        assert!(!graph.are_dependencies_resolved(JobId(1), &history));

        history.set_status(JobId(0), JobStatus::Completed);
        assert!(graph.are_dependencies_resolved(JobId(1), &history));
    }

    #[test]
    fn on_prereq_completed_drops_empty_entries_and_returns_ready() {
        let graph = DependencyGraph::new();
        graph.add_edge(JobId(1), JobId(0));
        graph.add_edge(JobId(2), JobId(0));

        let ready = graph.on_prereq_completed(JobId(0));
        assert_eq!(ready.len(), 2);
        assert!(ready.contains(&JobId(1)));
        assert!(ready.contains(&JobId(2)));
    }

    #[test]
    fn dependents_of_lists_direct_successors() {
        let graph = DependencyGraph::new();
        graph.add_edge(JobId(1), JobId(0));
        assert_eq!(graph.dependents_of(JobId(0)), vec![JobId(1)]);
    }
}

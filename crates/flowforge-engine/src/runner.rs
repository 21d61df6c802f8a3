//! Graph runner (spec §4.H): two-pass translation of a parsed FlowScript
//! graph into scheduler API calls.

use std::collections::HashMap;

use flowforge_lang::{Node, NodeType, ParsedGraph};
use serde_json::Value;

use crate::error::EngineResult;
use crate::job::{EmitJob, JobBehavior, JobId, ParseJob, ShellJob};
use crate::registry::Factory;
use crate::scheduler::SchedulerCore;

/// Walks a `ParsedGraph`, registering job factories and wiring scheduler
/// dependencies. The built-in factory table (`compileJob`, `compileParseJob`,
/// `parseOutputJob`) covers the minimal FlowScript example without
/// caller-supplied factories.
pub struct GraphRunner<'a> {
    scheduler: &'a SchedulerCore,
}

impl<'a> GraphRunner<'a> {
    pub fn new(scheduler: &'a SchedulerCore) -> Self {
        Self { scheduler }
    }

    /// Constructs a runner with the built-in factory table pre-registered.
    pub fn with_default_factories(scheduler: &'a SchedulerCore) -> Self {
        let runner = Self::new(scheduler);
        runner.register_default_factories();
        runner
    }

    fn register_default_factories(&self) {
        self.register(
            "compileJob",
            Box::new(|| Some(Box::new(ShellJob::new("make")) as Box<dyn JobBehavior>)),
        );
        self.register(
            "compileParseJob",
            Box::new(|| Some(Box::new(ParseJob::new()) as Box<dyn JobBehavior>)),
        );
        self.register(
            "parseOutputJob",
            Box::new(|| Some(Box::new(EmitJob::new()) as Box<dyn JobBehavior>)),
        );
    }

    /// Registers a caller-supplied factory under a node id's job type.
    pub fn register(&self, job_type: impl Into<String>, factory: Factory) {
        self.scheduler.registry.register(job_type, factory);
    }

    /// Pass 1 captures Data-node payloads and leaves Job nodes to Pass 2,
    /// which creates each job (seeding its input from Data-node
    /// dependencies), wires dependencies on other Job nodes (resolving
    /// through Status nodes transitively), and enqueues roots whose only
    /// dependencies are Data nodes.
    pub fn run(&self, graph: &ParsedGraph) -> EngineResult<Vec<JobId>> {
        let mut data_payloads: HashMap<&str, &Value> = HashMap::new();
        for node in graph.nodes_in_order() {
            if node.node_type == NodeType::Data {
                if let Some(payload) = &node.input_data {
                    data_payloads.insert(node.id.as_str(), payload);
                }
            }
        }

        let mut created_ids = Vec::new();
        for node in graph.nodes_in_order() {
            if node.node_type != NodeType::Job {
                continue;
            }

            let input = Self::merge_data_inputs(node, &data_payloads);
            let created = self.scheduler.registry.create(&node.id, input)?;
            created_ids.push(created.job_id);

            let mut only_data_deps = true;
            for dep in &node.dependencies {
                if let Some(prereq_type) = self.resolve_prerequisite(graph, dep) {
                    self.scheduler
                        .depgraph
                        .set_dependency(&self.scheduler.registry, &node.id, &prereq_type)?;
                    only_data_deps = false;
                }
            }

            if only_data_deps {
                self.scheduler.enqueue(created.job_id)?;
            }
        }

        Ok(created_ids)
    }

    fn merge_data_inputs(node: &Node, data_payloads: &HashMap<&str, &Value>) -> Value {
        let mut merged = serde_json::Map::new();
        for dep in &node.dependencies {
            if let Some(Value::Object(map)) = data_payloads.get(dep.as_str()) {
                for (key, value) in map {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        Value::Object(merged)
    }

    /// Resolves `dep` to the job-type name of a scheduler prerequisite,
    /// following through a Status node's single dependency transitively.
    /// Returns `None` when `dep` is a Data node (handled by input merging).
    fn resolve_prerequisite(&self, graph: &ParsedGraph, dep: &str) -> Option<String> {
        let node = graph.get(dep)?;
        match node.node_type {
            NodeType::Data => None,
            NodeType::Status => node
                .dependencies
                .first()
                .and_then(|next| self.resolve_prerequisite(graph, next)),
            NodeType::Job | NodeType::Undefined => Some(dep.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;

    #[test]
    fn linear_chain_wires_in_order() {
        let source = r#"
            digraph {
              { node [shape="box"]; A; B; C; }
              A -> B;
              B -> C;
            }
        "#;
        let graph = flowforge_lang::parse(source).unwrap();
        let scheduler = SchedulerCore::new();
        let runner = GraphRunner::new(&scheduler);
        for id in ["A", "B", "C"] {
            runner.register(id, Box::new(|| Some(Box::new(crate::job::ShellJob::new("true")) as Box<dyn JobBehavior>)));
        }
        let created = runner.run(&graph).unwrap();
        assert_eq!(created.len(), 3);

        let a = scheduler.registry.last_created_id("A").unwrap();
        let b = scheduler.registry.last_created_id("B").unwrap();
        let c = scheduler.registry.last_created_id("C").unwrap();

        assert_eq!(scheduler.status(a), JobStatus::Queued);
        assert!(!scheduler.depgraph.are_dependencies_resolved(b, &scheduler.history));
        assert!(!scheduler.depgraph.are_dependencies_resolved(c, &scheduler.history));
    }

    #[test]
    fn data_node_seeds_job_input() {
        let source = r#"
            digraph {
              { node [shape="circle"]; cfg [data='{"command":"echo hi"}']; }
              { node [shape="box"]; compileJob; }
              cfg -> compileJob;
            }
        "#;
        let graph = flowforge_lang::parse(source).unwrap();
        let scheduler = SchedulerCore::new();
        let runner = GraphRunner::with_default_factories(&scheduler);
        runner.run(&graph).unwrap();

        let job_id = scheduler.registry.last_created_id("compileJob").unwrap();
        assert_eq!(scheduler.status(job_id), JobStatus::Queued);
        let input = scheduler.registry.with_job(job_id, |job| job.input()).unwrap();
        assert_eq!(input["command"], "echo hi");
    }

    #[test]
    fn status_node_short_circuits_to_its_dependency() {
        let source = r#"
            digraph {
              { node [shape="box"]; A; B; }
              { node [shape="diamond"]; S; }
              A -> S;
              S -> B;
            }
        "#;
        let graph = flowforge_lang::parse(source).unwrap();
        let scheduler = SchedulerCore::new();
        let runner = GraphRunner::new(&scheduler);
        for id in ["A", "B"] {
            runner.register(id, Box::new(|| Some(Box::new(crate::job::ShellJob::new("true")) as Box<dyn JobBehavior>)));
        }
        runner.run(&graph).unwrap();

        let a = scheduler.registry.last_created_id("A").unwrap();
        let b = scheduler.registry.last_created_id("B").unwrap();
        assert_eq!(scheduler.depgraph.dependents_of(a), vec![b]);
    }
}

//! Concurrent dependency-aware job scheduler.
//!
//! A [`registry::JobRegistry`] maps job-type names to factories; a
//! [`depgraph::DependencyGraph`] tracks unmet prerequisites; a
//! [`scheduler::SchedulerCore`] owns the queued/running/completed queues;
//! a [`worker::WorkerPool`] runs jobs on OS threads; [`runner::GraphRunner`]
//! translates a parsed FlowScript graph into calls against all of the above.
//! [`engine::Engine`] is the facade callers use.
//!
//! ```
//! use flowforge_engine::Engine;
//!
//! let mut engine = Engine::new();
//! engine.run_flowscript(r#"
//!     digraph {
//!       { node [shape="circle"]; inputs [data='{"command":"true"}']; }
//!       { node [shape="box"]; compileJob; }
//!       inputs -> compileJob;
//!     }
//! "#).unwrap();
//! ```

mod depgraph;
mod engine;
mod error;
mod history;
mod job;
mod registry;
mod runner;
mod scheduler;
mod worker;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use job::{
    ChannelMask, EmitJob, FlowScriptParseJob, Job, JobBehavior, JobId, JobStatus, ParseJob, ShellJob,
};
pub use registry::Factory;
pub use runner::GraphRunner;

//! Job contract (spec §4.A): per-job identity, payloads, execute step and
//! completion hook, plus the four concrete job kinds a graph runner wires up.

use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{json, Value};

use crate::error::EngineError;

/// Unique identifier for a job, allocated monotonically from a single counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl JobId {
    pub(crate) fn next(counter: &AtomicU64) -> Self {
        Self(counter.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a job. Transitions form a strict DAG:
/// `NeverSeen -> Queued -> Running -> Completed -> Retired`. No backward
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    NeverSeen,
    Queued,
    Running,
    Completed,
    Retired,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NeverSeen => "never seen",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Retired => "retired",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bitmask tagging a job with the worker categories permitted to run it.
/// Workers carry a companion mask and match by bitwise AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMask(pub u64);

impl ChannelMask {
    pub const ALL: ChannelMask = ChannelMask(u64::MAX);

    pub fn matches(&self, worker_mask: ChannelMask) -> bool {
        self.0 & worker_mask.0 != 0
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// The behavior a job contributes: side-effecting `execute`, pure
/// `on_complete`. `execute` must never panic across this boundary — a
/// failure is captured into the output payload instead.
pub trait JobBehavior: Send {
    fn execute(&mut self, input: &Value) -> Value;

    fn on_complete(&self, _output: &Value) {}
}

/// A scheduled unit of work. Input and output are serialized behind their
/// own locks; every other field is immutable after construction.
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub channel_mask: ChannelMask,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    input: Mutex<Value>,
    output: Mutex<Value>,
    behavior: Box<dyn JobBehavior>,
}

impl Job {
    pub fn new(id: JobId, job_type: impl Into<String>, behavior: Box<dyn JobBehavior>) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            channel_mask: ChannelMask::default(),
            name: None,
            created_at: Utc::now(),
            input: Mutex::new(Value::Null),
            output: Mutex::new(Value::Null),
            behavior,
        }
    }

    pub fn with_channel_mask(mut self, mask: ChannelMask) -> Self {
        self.channel_mask = mask;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn set_input(&self, input: Value) {
        *self.input.lock().unwrap() = input;
    }

    pub fn input(&self) -> Value {
        self.input.lock().unwrap().clone()
    }

    pub fn output(&self) -> Value {
        self.output.lock().unwrap().clone()
    }

    /// Runs the execute step against the current input, capturing the
    /// result as the output payload.
    pub fn execute(&mut self) {
        let input = self.input();
        let output = self.behavior.execute(&input);
        *self.output.lock().unwrap() = output;
    }

    /// Runs the post-completion hook against the current output payload.
    pub fn on_complete(&self) {
        let output = self.output();
        self.behavior.on_complete(&output);
    }
}

/// Spawns a subprocess with stderr merged into stdout. Empty combined output
/// reports `"compiled with no errors"`, otherwise `"failed to compile"`.
pub struct ShellJob {
    default_command: String,
}

impl ShellJob {
    pub fn new(default_command: impl Into<String>) -> Self {
        Self {
            default_command: default_command.into(),
        }
    }
}

impl Default for ShellJob {
    fn default() -> Self {
        Self::new("true")
    }
}

impl JobBehavior for ShellJob {
    fn execute(&mut self, input: &Value) -> Value {
        let command = input
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or(&self.default_command)
            .to_string();

        match Command::new("sh").arg("-c").arg(&command).output() {
            Ok(out) => {
                let mut combined = out.stdout;
                combined.extend_from_slice(&out.stderr);
                let text = String::from_utf8_lossy(&combined).into_owned();
                let status = if text.is_empty() {
                    "compiled with no errors"
                } else {
                    "failed to compile"
                };
                json!({ "status": status, "output": text })
            }
            Err(source) => {
                let spawn_err = EngineError::SubprocessSpawnFailed { command, source };
                json!({ "status": "failed to compile", "output": spawn_err.to_string() })
            }
        }
    }
}

/// Regex-classifies diagnostic lines (`file:line:col: error: message`) into
/// structured errors, grouped by file.
pub struct ParseJob {
    pattern: Regex,
}

impl ParseJob {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(
                r"(?m)^(?P<file>[^:\n]+):(?P<line>\d+):(?P<col>\d+):\s*(?:error|warning):\s*(?P<desc>.+)$",
            )
            .expect("diagnostic pattern is valid"),
        }
    }
}

impl Default for ParseJob {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBehavior for ParseJob {
    fn execute(&mut self, input: &Value) -> Value {
        let raw = input.get("output").and_then(Value::as_str).unwrap_or("");
        let mut by_file: rustc_hash::FxHashMap<String, Vec<Value>> = rustc_hash::FxHashMap::default();

        for caps in self.pattern.captures_iter(raw) {
            let file = caps["file"].to_string();
            let line_number: i64 = caps["line"].parse().unwrap_or(0);
            let column_number: i64 = caps["col"].parse().unwrap_or(0);
            let description = caps["desc"].to_string();

            by_file.entry(file).or_default().push(json!({
                "lineNumber": line_number,
                "columnNumber": column_number,
                "errorDescription": description,
            }));
        }

        if by_file.is_empty() && raw.to_lowercase().contains("undefined reference") {
            by_file
                .entry("Linker Error".to_string())
                .or_default()
                .push(json!({
                    "lineNumber": 0,
                    "columnNumber": 0,
                    "errorDescription": raw.trim(),
                }));
        }

        let map: serde_json::Map<String, Value> = by_file
            .into_iter()
            .map(|(file, entries)| (file, Value::Array(entries)))
            .collect();

        json!({ "errors": Value::Object(map) })
    }
}

/// Appends a structured error document, enriching each entry with a
/// source snippet spanning two lines on either side of the reported line.
pub struct EmitJob;

impl EmitJob {
    pub fn new() -> Self {
        Self
    }

    fn snippet(path: &str, line_number: i64) -> Vec<String> {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Vec::new();
        };
        let lines: Vec<&str> = contents.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }
        let center = (line_number - 1).max(0) as usize;
        let start = center.saturating_sub(2);
        let end = (center + 2).min(lines.len() - 1);
        lines[start..=end].iter().map(|line| line.to_string()).collect()
    }
}

impl Default for EmitJob {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBehavior for EmitJob {
    fn execute(&mut self, input: &Value) -> Value {
        let mut enriched = serde_json::Map::new();

        if let Some(Value::Object(files)) = input.get("errors") {
            for (file, entries) in files {
                let mut out_entries = Vec::new();
                if let Value::Array(entries) = entries {
                    for entry in entries {
                        let line_number = entry.get("lineNumber").and_then(Value::as_i64).unwrap_or(0);
                        let snippet = if file == "Linker Error" {
                            Vec::new()
                        } else {
                            Self::snippet(file, line_number)
                        };
                        let mut entry = entry.clone();
                        if let Value::Object(map) = &mut entry {
                            map.insert("codeSnippet".to_string(), json!(snippet));
                        }
                        out_entries.push(entry);
                    }
                }
                enriched.insert(file.clone(), Value::Array(out_entries));
            }
        }

        json!({ "errorReport": Value::Object(enriched) })
    }
}

/// Invokes the FlowScript parser on the input's `source` field.
pub struct FlowScriptParseJob;

impl FlowScriptParseJob {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FlowScriptParseJob {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBehavior for FlowScriptParseJob {
    fn execute(&mut self, input: &Value) -> Value {
        let source = input.get("source").and_then(Value::as_str).unwrap_or("");
        match flowforge_lang::parse(source) {
            Ok(graph) => json!({ "status": "success", "nodeCount": graph.len() }),
            Err(err) => json!({ "status": "error", "message": err.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_monotonic() {
        let counter = AtomicU64::new(0);
        let a = JobId::next(&counter);
        let b = JobId::next(&counter);
        assert_eq!(a.0, 0);
        assert_eq!(b.0, 1);
    }

    #[test]
    fn channel_mask_matches_by_bitwise_and() {
        let job_mask = ChannelMask(0b0101);
        assert!(job_mask.matches(ChannelMask(0b0001)));
        assert!(!job_mask.matches(ChannelMask(0b1010)));
        assert!(ChannelMask::default().matches(ChannelMask(1)));
    }

    #[test]
    fn shell_job_reports_no_errors_on_empty_output() {
        let mut job = ShellJob::new("true");
        let output = job.execute(&json!({ "command": "true" }));
        assert_eq!(output["status"], "compiled with no errors");
    }

    #[test]
    fn shell_job_reports_failure_on_nonempty_output() {
        let mut job = ShellJob::new("true");
        let output = job.execute(&json!({ "command": "echo hi" }));
        assert_eq!(output["status"], "failed to compile");
        assert_eq!(output["output"], "hi\n");
    }

    #[test]
    fn parse_job_classifies_diagnostics_by_file() {
        let mut job = ParseJob::new();
        let raw = "src/main.rs:12:5: error: mismatched types\nsrc/lib.rs:3:1: error: unused import\n";
        let output = job.execute(&json!({ "output": raw }));
        let errors = &output["errors"];
        assert_eq!(errors["src/main.rs"][0]["lineNumber"], 12);
        assert_eq!(errors["src/lib.rs"][0]["columnNumber"], 1);
    }

    #[test]
    fn parse_job_classifies_linker_errors() {
        let mut job = ParseJob::new();
        let raw = "undefined reference to `foo'\n";
        let output = job.execute(&json!({ "output": raw }));
        assert!(output["errors"]["Linker Error"].is_array());
    }

    #[test]
    fn emit_job_attaches_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.rs");
        std::fs::write(&path, "a\nb\nc\nd\ne\nf\ng\n").unwrap();

        let mut job = EmitJob::new();
        let input = json!({
            "errors": {
                path.to_str().unwrap(): [
                    { "lineNumber": 4, "columnNumber": 1, "errorDescription": "oops" }
                ]
            }
        });
        let output = job.execute(&input);
        let snippet = output["errorReport"][path.to_str().unwrap()][0]["codeSnippet"]
            .as_array()
            .unwrap();
        assert_eq!(snippet.len(), 5);
    }

    #[test]
    fn flowscript_parse_job_reports_success() {
        let mut job = FlowScriptParseJob::new();
        let source = r#"digraph { { node [shape="box"]; A; } }"#;
        let output = job.execute(&json!({ "source": source }));
        assert_eq!(output["status"], "success");
        assert_eq!(output["nodeCount"], 1);
    }

    #[test]
    fn flowscript_parse_job_reports_error() {
        let mut job = FlowScriptParseJob::new();
        let output = job.execute(&json!({ "source": "digraph { A -> B; }" }));
        assert_eq!(output["status"], "error");
    }
}

//! Error taxonomy for the job engine (spec §7). Every error is returned,
//! never thrown across a job's `execute` boundary: a failed `execute` still
//! completes its job, with the failure captured in the output payload.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// `Create` was asked for a type with no registered factory.
    #[error("unknown job type: {0}")]
    UnknownType(String),

    /// A registered factory returned no job.
    #[error("factory for {0} returned no job")]
    FactoryReturnedNull(String),

    /// `Status` / `AwaitJob` / `Enqueue` referenced a job id never created.
    #[error("no such job: {0}")]
    NoSuchJob(u64),

    /// `AwaitJob` called on a job that was already retired.
    #[error("job {0} was already retired")]
    AlreadyRetired(u64),

    /// A job reached `Completed` but could not be found in the completed
    /// queue at retirement time.
    #[error("job {0} not found in completed queue")]
    NotFoundInCompleted(u64),

    /// `SetDependency` named a job type with no job created under it yet.
    #[error("no job has been created under type: {0}")]
    UnknownJobTypeName(String),

    /// FlowScript failed to parse.
    #[error("flowscript parse error: {0}")]
    FlowScriptParse(#[from] flowforge_lang::ParseError),

    /// A subprocess could not be spawned.
    #[error("failed to spawn subprocess '{command}': {source}")]
    SubprocessSpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

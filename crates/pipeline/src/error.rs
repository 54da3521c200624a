use mdocx_core::{BatchResult, CoreError, JobId};
use mdocx_worker::EngineError;

/// Errors surfaced to callers of the dispatcher.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Job already running: {active}")]
    AlreadyRunning { active: JobId },

    /// The engine could not be started. Carries the full message.
    #[error("{0}")]
    Spawn(String),

    /// The engine exited non-zero. Carries the engine diagnostic.
    #[error("{0}")]
    Process(String),

    #[error("Conversion cancelled")]
    Cancelled,

    /// Some files of a batch failed. Never raised by the batch itself.
    #[error("{failed} of {total} files failed to convert")]
    PartialBatchFailure { failed: usize, total: usize },

    #[error("{0}")]
    Inactive(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Classify a finished batch: `Ok` when every file converted.
    pub fn check_batch(result: &BatchResult) -> Result<(), JobError> {
        if result.errors.is_empty() {
            return Ok(());
        }
        Err(JobError::PartialBatchFailure {
            failed: result.errors.len(),
            total: result.total_files,
        })
    }
}

impl From<CoreError> for JobError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => JobError::Validation(msg),
            other => JobError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for JobError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => JobError::Cancelled,
            EngineError::Spawn { .. } => JobError::Spawn(err.to_string()),
            EngineError::Inactive { .. } => JobError::Inactive(err.to_string()),
            EngineError::Failed { .. } | EngineError::Io(_) => JobError::Process(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

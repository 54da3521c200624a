use mdocx_core::job_events::{
    CHANNEL_BATCH_COMPLETE, CHANNEL_BATCH_PROGRESS, CHANNEL_CONVERSION_CANCELLED,
    CHANNEL_CONVERSION_COMPLETE, CHANNEL_CONVERSION_ERROR, CHANNEL_CONVERSION_PROGRESS,
    CHANNEL_MERGE_COMPLETE, CHANNEL_MERGE_PROGRESS,
};
use mdocx_core::progress::BatchProgress;
use mdocx_core::{
    BatchResult, ConversionOutcome, JobId, JobMode, MergeResult, ProgressEvent, Timestamp,
};
use serde::{Deserialize, Serialize};

/// An event emitted on behalf of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: JobId,
    pub mode: JobMode,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: JobEventKind,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum JobEventKind {
    /// Checkpoint for single and merge jobs.
    Progress(ProgressEvent),

    /// Per-file checkpoint for batch jobs, with running tallies.
    BatchProgress(BatchProgress),

    /// Single-file job finished successfully.
    SingleCompleted(ConversionOutcome),

    /// Batch job finished; individual files may have failed.
    BatchCompleted(BatchResult),

    /// Merge job finished. Carries `success: false` when the engine failed.
    MergeCompleted(MergeResult),

    /// Job failed with the engine's diagnostic text.
    Failed { message: String },

    /// Job was cancelled by user request.
    Cancelled,
}

impl JobEventKind {
    /// Terminal events are the last event a job ever emits.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_) | Self::BatchProgress(_))
    }

    /// Percentage carried by progress checkpoints.
    pub fn percentage(&self) -> Option<u8> {
        match self {
            Self::Progress(p) => Some(p.percentage),
            Self::BatchProgress(b) => Some(b.progress.percentage),
            _ => None,
        }
    }
}

impl JobEvent {
    pub fn new(job_id: JobId, mode: JobMode, kind: JobEventKind) -> Self {
        Self {
            job_id,
            mode,
            timestamp: chrono::Utc::now(),
            kind,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Channel name observers subscribe to for this event.
    pub fn channel(&self) -> &'static str {
        match (&self.kind, self.mode) {
            (JobEventKind::Progress(_), JobMode::Single) => CHANNEL_CONVERSION_PROGRESS,
            (JobEventKind::Progress(_), JobMode::Merge) => CHANNEL_MERGE_PROGRESS,
            (JobEventKind::Progress(_), JobMode::Batch) => CHANNEL_BATCH_PROGRESS,
            (JobEventKind::BatchProgress(_), _) => CHANNEL_BATCH_PROGRESS,
            (JobEventKind::SingleCompleted(_), _) => CHANNEL_CONVERSION_COMPLETE,
            (JobEventKind::BatchCompleted(_), _) => CHANNEL_BATCH_COMPLETE,
            (JobEventKind::MergeCompleted(_), _) => CHANNEL_MERGE_COMPLETE,
            (JobEventKind::Failed { .. }, _) => CHANNEL_CONVERSION_ERROR,
            (JobEventKind::Cancelled, _) => CHANNEL_CONVERSION_CANCELLED,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

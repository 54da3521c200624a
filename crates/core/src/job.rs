//! Job model and lifecycle state machine.
//!
//! ```text
//! pending -> running -> { completed | partially_completed | failed | cancelled }
//! ```
//!
//! `pending` and `running` are transient; the other four are terminal and
//! never change once reached.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::options::ConversionOptions;
use crate::types::{new_job_id, JobId, Timestamp};

/// Which of the three conversion flows a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// One input file to one output file.
    Single,
    /// Independent per-file conversions into a shared output directory.
    Batch,
    /// All inputs combined into one output file by a single engine call.
    Merge,
}

impl JobMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    PartiallyCompleted,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially_completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Whether `self -> next` is an allowed edge of the state machine.
    ///
    /// A pending job may be cancelled before it starts; terminal states
    /// accept no further transitions.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Cancelled),
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversion request and its lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub mode: JobMode,
    /// Input paths in submission order.
    pub inputs: Vec<PathBuf>,
    /// Output file for single/merge jobs, output directory for batch jobs.
    pub output: PathBuf,
    pub options: ConversionOptions,
    pub state: JobState,
    pub created_at: Timestamp,
}

impl Job {
    /// Create a job in the `pending` state.
    pub fn new(
        mode: JobMode,
        inputs: Vec<PathBuf>,
        output: PathBuf,
        options: ConversionOptions,
    ) -> Self {
        Self {
            id: new_job_id(),
            mode,
            inputs,
            output,
            options,
            state: JobState::Pending,
            created_at: chrono::Utc::now(),
        }
    }

    /// Move the job to `next`, rejecting edges the state machine forbids.
    pub fn transition(&mut self, next: JobState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn total_files(&self) -> usize {
        self.inputs.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Progress payloads emitted while a job runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::results::FileFailure;

/// Coarse phase a job is in when a progress event is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Preparing,
    Converting,
    Finalizing,
    Completed,
    Error,
}

/// A progress checkpoint for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// 1-indexed file about to be processed; 0 before any file is touched.
    pub current_file: usize,
    pub total_files: usize,
    pub current_file_name: String,
    /// Integer percentage in `0..=100`.
    pub percentage: u8,
    pub stage: ProgressStage,
}

/// Batch checkpoint: the progress event plus the running tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    #[serde(flatten)]
    pub progress: ProgressEvent,
    /// Output paths written so far.
    pub processed_files: Vec<PathBuf>,
    /// Failures recorded so far.
    pub errors: Vec<FileFailure>,
}

/// `round(current / total * 100)`, rounding halves up, clamped to 100.
///
/// Returns 0 for an empty batch.
pub fn batch_percentage(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = (current * 200 + total) / (2 * total);
    rounded.min(100) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

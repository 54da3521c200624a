//! Progress reporter for a single job.
//!
//! Emits only checkpoints the orchestrator actually observes. The engine
//! reports no progress of its own, so:
//!
//! - single: one `converting` checkpoint at start, then the terminal event;
//! - batch: one checkpoint *before* each file, `round(i / n * 100)`;
//! - merge: one `preparing` checkpoint at 0%, then the terminal event.

use std::path::PathBuf;
use std::sync::Arc;

use mdocx_core::progress::{batch_percentage, BatchProgress};
use mdocx_core::{
    BatchResult, ConversionOutcome, FileFailure, JobId, JobMode, MergeResult, ProgressEvent,
    ProgressStage,
};

use crate::bus::EventBus;
use crate::event::{JobEvent, JobEventKind};

/// Publishes one job's events and enforces their ordering.
///
/// Percentages never go backwards and nothing is published after the
/// terminal event.
pub struct ProgressReporter {
    job_id: JobId,
    mode: JobMode,
    bus: Arc<EventBus>,
    last_percentage: u8,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(job_id: JobId, mode: JobMode, bus: Arc<EventBus>) -> Self {
        Self {
            job_id,
            mode,
            bus,
            last_percentage: 0,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Single mode: the engine is about to run on `file_name`.
    pub fn single_started(&mut self, file_name: &str) {
        self.progress(ProgressEvent {
            current_file: 1,
            total_files: 1,
            current_file_name: file_name.to_string(),
            percentage: 0,
            stage: ProgressStage::Converting,
        });
    }

    /// Batch mode: file `current` (1-indexed) of `total` is about to be
    /// attempted.
    pub fn batch_file_started(
        &mut self,
        current: usize,
        total: usize,
        file_name: &str,
        processed_files: &[PathBuf],
        errors: &[FileFailure],
    ) {
        let progress = ProgressEvent {
            current_file: current,
            total_files: total,
            current_file_name: file_name.to_string(),
            percentage: self.clamp(batch_percentage(current, total)),
            stage: ProgressStage::Converting,
        };
        self.last_percentage = progress.percentage;
        self.emit(JobEventKind::BatchProgress(BatchProgress {
            progress,
            processed_files: processed_files.to_vec(),
            errors: errors.to_vec(),
        }));
    }

    /// Merge mode: the single engine call covering `total` inputs is about
    /// to start.
    pub fn merge_preparing(&mut self, total: usize) {
        self.progress(ProgressEvent {
            current_file: 0,
            total_files: total,
            current_file_name: String::new(),
            percentage: 0,
            stage: ProgressStage::Preparing,
        });
    }

    pub fn single_completed(&mut self, outcome: ConversionOutcome) {
        self.emit(JobEventKind::SingleCompleted(outcome));
    }

    pub fn batch_completed(&mut self, result: BatchResult) {
        self.emit(JobEventKind::BatchCompleted(result));
    }

    pub fn merge_completed(&mut self, result: MergeResult) {
        self.emit(JobEventKind::MergeCompleted(result));
    }

    pub fn failed(&mut self, message: impl Into<String>) {
        self.emit(JobEventKind::Failed {
            message: message.into(),
        });
    }

    pub fn cancelled(&mut self) {
        self.emit(JobEventKind::Cancelled);
    }

    // ---- private helpers ----

    fn progress(&mut self, mut event: ProgressEvent) {
        event.percentage = self.clamp(event.percentage);
        self.last_percentage = event.percentage;
        self.emit(JobEventKind::Progress(event));
    }

    fn clamp(&self, percentage: u8) -> u8 {
        percentage.min(100).max(self.last_percentage)
    }

    fn emit(&mut self, kind: JobEventKind) {
        if self.finished {
            tracing::warn!(
                job_id = %self.job_id,
                event = ?kind,
                "Dropping event published after the terminal event",
            );
            return;
        }
        if kind.is_terminal() {
            self.finished = true;
        }
        self.bus.publish(JobEvent::new(self.job_id, self.mode, kind));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

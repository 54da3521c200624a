//! Batch and merge result aggregation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use mdocx_core::{BatchResult, FileFailure, FileResult, JobState, MergeResult};

/// Extension of generated documents.
pub const OUTPUT_EXTENSION: &str = "docx";

/// Output path for one batch input: the input's stem plus `.docx`, inside
/// `output_dir`.
///
/// Only the last extension is replaced, so `notes.v2.md` becomes
/// `notes.v2.docx`.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name: OsString = input
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| input.as_os_str().to_os_string());
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    output_dir.join(name)
}

/// File name shown to users for `path`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Collects one [`FileResult`] per batch input, in order.
#[derive(Debug)]
pub struct BatchAggregator {
    output_dir: PathBuf,
    total: usize,
    results: Vec<FileResult>,
}

impl BatchAggregator {
    pub fn new(output_dir: PathBuf, total: usize) -> Self {
        Self {
            output_dir,
            total,
            results: Vec::with_capacity(total),
        }
    }

    pub fn record(&mut self, result: FileResult) {
        if !result.success {
            tracing::warn!(
                file = %result.file_name,
                error = result.error.as_deref().unwrap_or_default(),
                "Batch file failed",
            );
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[FileResult] {
        &self.results
    }

    /// Output paths of the files converted so far.
    pub fn processed_outputs(&self) -> Vec<PathBuf> {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.output_path.clone())
            .collect()
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> Vec<FileFailure> {
        self.results.iter().filter_map(FileResult::failure).collect()
    }

    pub fn finish(self) -> BatchResult {
        let outputs = self.processed_outputs();
        let errors = self.failures();
        debug_assert_eq!(outputs.len() + errors.len(), self.total);

        BatchResult {
            success: errors.is_empty(),
            message: batch_summary(outputs.len(), errors.len()),
            output_directory: self.output_dir,
            total_files: self.total,
            processed_files: outputs.len(),
            outputs,
            errors,
        }
    }
}

/// Human summary of a finished batch.
pub fn batch_summary(processed: usize, failed: usize) -> String {
    if failed == 0 {
        format!("All {processed} files converted successfully")
    } else {
        format!("{processed} processed, {failed} failed")
    }
}

/// Terminal state of a finished batch: any failure makes it partial.
pub fn batch_state(result: &BatchResult) -> JobState {
    if result.errors.is_empty() {
        JobState::Completed
    } else {
        JobState::PartiallyCompleted
    }
}

pub fn merge_succeeded(output_path: PathBuf, total_files: usize) -> MergeResult {
    MergeResult {
        success: true,
        message: format!("{total_files} files merged into a single document"),
        output_path,
        total_files,
        error: None,
    }
}

pub fn merge_failed(output_path: PathBuf, total_files: usize, error: String) -> MergeResult {
    MergeResult {
        success: false,
        message: "Merge conversion failed".to_string(),
        output_path,
        total_files,
        error: Some(error),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Outcomes produced by finished jobs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A file that failed inside a batch, with the engine's diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file_name: String,
    pub error: String,
}

/// Outcome of one file inside a batch. Exactly one per input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub file_name: String,
    pub output_path: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    pub fn converted(file_name: impl Into<String>, output_path: PathBuf) -> Self {
        Self {
            file_name: file_name.into(),
            output_path,
            success: true,
            error: None,
        }
    }

    pub fn failed(
        file_name: impl Into<String>,
        output_path: PathBuf,
        error: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            output_path,
            success: false,
            error: Some(error.into()),
        }
    }

    /// The failure record for this file, if it failed.
    pub fn failure(&self) -> Option<FileFailure> {
        if self.success {
            return None;
        }
        Some(FileFailure {
            file_name: self.file_name.clone(),
            error: self.error.clone().unwrap_or_default(),
        })
    }
}

/// Result of a single-file job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    pub success: bool,
    pub message: String,
    pub output_path: PathBuf,
}

/// Aggregate result of a batch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// `true` only when no file failed.
    pub success: bool,
    pub message: String,
    pub output_directory: PathBuf,
    pub total_files: usize,
    /// Number of files converted successfully.
    pub processed_files: usize,
    /// Output paths of the converted files, in input order.
    pub outputs: Vec<PathBuf>,
    /// Failures in input order.
    pub errors: Vec<FileFailure>,
}

impl BatchResult {
    pub fn failed_files(&self) -> usize {
        self.errors.len()
    }

    /// Every input accounted for exactly once.
    pub fn is_consistent(&self) -> bool {
        self.processed_files + self.errors.len() == self.total_files
            && self.outputs.len() == self.processed_files
    }
}

/// Result of a merge job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub success: bool,
    pub message: String,
    pub output_path: PathBuf,
    pub total_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

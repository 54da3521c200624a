//! Engine interface and result types.
//!
//! Defines [`ConversionEngine`], the seam between the job pipeline and the
//! thing that actually produces documents, along with [`EngineReport`] and
//! [`EngineError`].

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::command::Invocation;

/// Message reported for a successful single-file conversion.
pub const SUCCESS_MESSAGE: &str = "Conversion completed successfully";

/// Message reported for a successful merge conversion.
pub const MERGE_SUCCESS_MESSAGE: &str = "Merge conversion completed successfully";

/// Output of a successful engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReport {
    pub message: String,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Errors that can occur while running the engine.
#[derive(Debug)]
pub enum EngineError {
    /// The engine program could not be started.
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// The engine ran and exited non-zero (`-1` if killed by a signal).
    Failed {
        code: i32,
        /// Captured stderr, or stdout when stderr was empty.
        diagnostic: String,
        merge: bool,
    },
    /// The run was cancelled and the process killed.
    Cancelled,
    /// The engine produced no output within the inactivity window.
    Inactive { idle_ms: u64 },
    /// I/O error while waiting on the process.
    Io(std::io::Error),
}

impl EngineError {
    /// The failed-run variant for an exit code and captured streams.
    ///
    /// The diagnostic is stderr verbatim, or stdout when stderr is empty.
    pub fn from_exit(code: i32, stdout: &str, stderr: &str, merge: bool) -> Self {
        let diagnostic = if stderr.is_empty() { stdout } else { stderr };
        Self::Failed {
            code,
            diagnostic: diagnostic.to_string(),
            merge,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                write!(f, "Python process error: failed to start {program}: {source}")
            }
            Self::Failed {
                code,
                diagnostic,
                merge: false,
            } => write!(f, "Conversion failed with code {code}: {diagnostic}"),
            Self::Failed {
                code,
                diagnostic,
                merge: true,
            } => write!(f, "Merge conversion failed with code {code}: {diagnostic}"),
            Self::Cancelled => write!(f, "Conversion cancelled"),
            Self::Inactive { idle_ms } => {
                write!(f, "Conversion stalled: no engine output for {idle_ms}ms")
            }
            Self::Io(err) => write!(f, "Python process error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Something that turns one [`Invocation`] into a document.
///
/// Implementations must stop promptly and return
/// [`EngineError::Cancelled`] once `cancel` fires.
pub trait ConversionEngine: Send + Sync + 'static {
    fn convert(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<EngineReport, EngineError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Domain model for markdown-to-DOCX conversion jobs.
//!
//! Pure types and validation shared by the worker adapter, the event
//! layer, and the job pipeline. Nothing in this crate spawns processes
//! or touches the filesystem.

pub mod error;
pub mod job;
pub mod job_events;
pub mod options;
pub mod progress;
pub mod results;
pub mod types;

pub use error::CoreError;
pub use job::{Job, JobMode, JobState};
pub use options::{CodeBlockStyle, ConversionOptions, ImageHandling, Orientation, ReferenceStyle};
pub use progress::{batch_percentage, BatchProgress, ProgressEvent, ProgressStage};
pub use results::{BatchResult, ConversionOutcome, FileFailure, FileResult, MergeResult};
pub use types::{JobId, Timestamp};

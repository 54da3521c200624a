//! Channel names attached to job events.
//!
//! Observers key on these strings, so they are part of the external
//! event surface and must not change.

/// Single-file job progress.
pub const CHANNEL_CONVERSION_PROGRESS: &str = "conversion-progress";

/// Single-file job finished successfully.
pub const CHANNEL_CONVERSION_COMPLETE: &str = "conversion-complete";

/// Single-file job failed.
pub const CHANNEL_CONVERSION_ERROR: &str = "conversion-error";

/// Any job was cancelled by user request.
pub const CHANNEL_CONVERSION_CANCELLED: &str = "conversion-cancelled";

/// Batch job progress (one per file, emitted before the file is attempted).
pub const CHANNEL_BATCH_PROGRESS: &str = "batch-conversion-progress";

/// Batch job finished, carrying the aggregate result.
pub const CHANNEL_BATCH_COMPLETE: &str = "batch-conversion-complete";

/// Merge job progress (a single `preparing` checkpoint).
pub const CHANNEL_MERGE_PROGRESS: &str = "merge-conversion-progress";

/// Merge job finished, successfully or not.
pub const CHANNEL_MERGE_COMPLETE: &str = "merge-conversion-complete";

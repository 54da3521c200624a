//! Job event stream and progress reporting.
//!
//! - [`EventBus`]: in-process fan-out hub backed by
//!   `tokio::sync::broadcast`.
//! - [`JobEvent`]: the typed envelope every observer receives.
//! - [`JobEvents`]: per-job view of the bus that ends after the job's
//!   terminal event.
//! - [`ProgressReporter`]: emits a job's checkpoints in order and enforces
//!   the ordering rules (non-decreasing percentage, terminal event last).

pub mod bus;
pub mod event;
pub mod reporter;

pub use bus::{EventBus, JobEvents};
pub use event::{JobEvent, JobEventKind};
pub use reporter::ProgressReporter;

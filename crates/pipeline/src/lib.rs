//! Conversion job orchestration.
//!
//! [`JobDispatcher`] is the entry point: it validates a request, admits it
//! through the single-flight [`JobRegistry`], runs the engine, aggregates
//! per-file outcomes and publishes the job's events.

pub mod aggregator;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod registry;
pub mod state;

pub use aggregator::{output_path_for, BatchAggregator};
pub use dispatcher::JobDispatcher;
pub use error::JobError;
pub use handle::JobHandle;
pub use registry::JobRegistry;
pub use state::JobStateTracker;

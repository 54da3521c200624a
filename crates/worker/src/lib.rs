//! Worker process adapter for the external conversion engine.
//!
//! Translates one `(inputs, output, options)` request into one engine
//! subprocess and maps its exit into a typed result. The engine is a black
//! box invoked as `<program> <script> --input … --output … [flags]`.
//!
//! All subprocess handling lives here; nothing in this crate knows about
//! jobs, batches, or the registry.

pub mod command;
pub mod config;
pub mod engine;
pub mod process;

pub use command::Invocation;
pub use config::{ConfigError, EngineConfig};
pub use engine::{ConversionEngine, EngineError, EngineReport};
pub use process::ProcessEngine;

//! `mdocx` command surface.
//!
//! One-shot subcommands run a single job in the foreground; `session` reads
//! JSON requests from stdin and streams job events as JSON lines.

pub mod cli;
pub mod logging;
pub mod oneshot;
pub mod output;
pub mod session;

/// Version string reported by `get-version`.
pub fn version_string() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}

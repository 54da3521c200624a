//! Rendering of job events and results.
//!
//! JSON mode writes one object per line: `{"kind":"event",...}` for every
//! job event and `{"kind":"result",...}` for command outcomes. Human mode
//! writes short status lines.

use mdocx_core::{JobId, ProgressStage};
use mdocx_events::{JobEvent, JobEventKind};
use serde::Serialize;

/// One job event as written to stdout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLine<'a> {
    kind: &'static str,
    channel: &'static str,
    #[serde(flatten)]
    event: &'a JobEvent,
}

impl<'a> EventLine<'a> {
    pub fn new(event: &'a JobEvent) -> Self {
        Self {
            kind: "event",
            channel: event.channel(),
            event,
        }
    }
}

/// Outcome of one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultLine {
    kind: &'static str,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultLine {
    pub fn ok(command: &str, job_id: Option<JobId>, data: Option<serde_json::Value>) -> Self {
        Self {
            kind: "result",
            command: command.to_string(),
            job_id,
            ok: true,
            data,
            error: None,
        }
    }

    pub fn err(command: &str, job_id: Option<JobId>, error: impl ToString) -> Self {
        Self {
            kind: "result",
            command: command.to_string(),
            job_id,
            ok: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Serialize `value` as a single JSON line (no trailing newline).
pub fn json_line(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize output line");
        format!(r#"{{"kind":"error","error":"{e}"}}"#)
    })
}

/// Human-readable line(s) for an event.
pub fn render_human(event: &JobEvent) -> String {
    match &event.kind {
        JobEventKind::Progress(p) => match p.stage {
            ProgressStage::Preparing => {
                format!("[{:>3}%] preparing {} files", p.percentage, p.total_files)
            }
            _ => format!("[{:>3}%] converting {}", p.percentage, p.current_file_name),
        },
        JobEventKind::BatchProgress(b) => format!(
            "[{:>3}%] converting {} ({}/{})",
            b.progress.percentage,
            b.progress.current_file_name,
            b.progress.current_file,
            b.progress.total_files,
        ),
        JobEventKind::SingleCompleted(o) => {
            format!("{} -> {}", o.message, o.output_path.display())
        }
        JobEventKind::BatchCompleted(r) => {
            let mut out = format!("{} ({})", r.message, r.output_directory.display());
            for failure in &r.errors {
                out.push_str(&format!("\n  {}: {}", failure.file_name, failure.error));
            }
            out
        }
        JobEventKind::MergeCompleted(r) if r.success => {
            format!("{} -> {}", r.message, r.output_path.display())
        }
        JobEventKind::MergeCompleted(r) => format!(
            "{}: {}",
            r.message,
            r.error.as_deref().unwrap_or_default()
        ),
        JobEventKind::Failed { message } => format!("error: {message}"),
        JobEventKind::Cancelled => "cancelled".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Foreground execution of a single job.

use std::process::ExitCode;

use mdocx_core::{BatchResult, ConversionOutcome, MergeResult};
use mdocx_pipeline::{JobError, JobHandle, JobRegistry};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::output::{json_line, render_human, EventLine, ResultLine};

/// Exit status for a job that failed outright.
pub const EXIT_FAILED: u8 = 1;
/// Exit status for a batch where some files failed.
pub const EXIT_PARTIAL: u8 = 2;
/// Exit status for a job cancelled by Ctrl-C.
pub const EXIT_CANCELLED: u8 = 130;

/// How a foreground job ended, for choosing the exit status.
pub trait JobOutcome {
    fn outcome(&self) -> Result<(), JobError>;
}

impl JobOutcome for ConversionOutcome {
    fn outcome(&self) -> Result<(), JobError> {
        Ok(())
    }
}

impl JobOutcome for MergeResult {
    fn outcome(&self) -> Result<(), JobError> {
        Ok(())
    }
}

impl JobOutcome for BatchResult {
    fn outcome(&self) -> Result<(), JobError> {
        JobError::check_batch(self)
    }
}

/// Stream the job's events to stdout, cancel it when `shutdown` fires, and
/// map the final result to an exit status.
pub async fn run_job<T>(
    mut handle: JobHandle<T>,
    command: &str,
    registry: &JobRegistry,
    shutdown: CancellationToken,
    json: bool,
) -> ExitCode
where
    T: Serialize + JobOutcome,
{
    if let Some(mut events) = handle.take_events() {
        let mut cancel_sent = false;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) if json => println!("{}", json_line(&EventLine::new(&event))),
                    Some(event) => println!("{}", render_human(&event)),
                    None => break,
                },
                _ = shutdown.cancelled(), if !cancel_sent => {
                    cancel_sent = true;
                    tracing::info!(job_id = %handle.id(), "Interrupted, cancelling job");
                    registry.cancel().await;
                }
            }
        }
    }

    let job_id = Some(handle.id());
    let result = handle.wait().await;
    let (line, status) = match &result {
        Ok(value) => {
            let status = match value.outcome() {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::from(EXIT_PARTIAL),
            };
            (ResultLine::ok(command, job_id, serde_json::to_value(value).ok()), status)
        }
        Err(e) => (ResultLine::err(command, job_id, e), exit_code_for(e)),
    };

    if json {
        println!("{}", json_line(&line));
    } else if let Err(e) = &result {
        // Human mode already printed the terminal event; repeat only what
        // the event stream could not show.
        if matches!(e, JobError::Internal(_)) {
            eprintln!("error: {e}");
        }
    }
    status
}

/// Print a rejected submission and pick its exit status.
pub fn report_rejection(command: &str, err: &JobError, json: bool) -> ExitCode {
    if json {
        println!("{}", json_line(&ResultLine::err(command, None, err)));
    } else {
        eprintln!("error: {err}");
    }
    exit_code_for(err)
}

pub fn exit_code_for(err: &JobError) -> ExitCode {
    match err {
        JobError::Cancelled => ExitCode::from(EXIT_CANCELLED),
        JobError::PartialBatchFailure { .. } => ExitCode::from(EXIT_PARTIAL),
        _ => ExitCode::from(EXIT_FAILED),
    }
}

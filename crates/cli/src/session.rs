//! Line-delimited JSON session.
//!
//! Each input line is one [`Request`], tagged by `command`:
//!
//! ```json
//! {"command":"submit-single","input":"a.md","output":"a.docx","options":{"fontSize":12}}
//! {"command":"submit-batch","inputs":["a.md","b.md"],"outputDir":"out"}
//! {"command":"submit-merge","inputs":["1.md","2.md"],"output":"book.docx"}
//! {"command":"cancel"}
//! {"command":"get-version"}
//! {"command":"quit"}
//! ```
//!
//! Submissions run in the background. Their events are written as they
//! happen, followed by a `result` line once the job ends. `quit`, end of
//! input, and shutdown all run registry cleanup before returning.

use std::path::PathBuf;

use mdocx_core::ConversionOptions;
use mdocx_pipeline::{JobDispatcher, JobError, JobHandle};
use mdocx_worker::ConversionEngine;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::output::{json_line, EventLine, ResultLine};
use crate::version_string;

/// One session request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Request {
    SubmitSingle {
        input: PathBuf,
        output: PathBuf,
        #[serde(default)]
        options: ConversionOptions,
    },
    #[serde(rename_all = "camelCase")]
    SubmitBatch {
        inputs: Vec<PathBuf>,
        output_dir: PathBuf,
        #[serde(default)]
        options: ConversionOptions,
    },
    SubmitMerge {
        inputs: Vec<PathBuf>,
        output: PathBuf,
        #[serde(default)]
        options: ConversionOptions,
    },
    Cancel,
    GetVersion,
    Quit,
}

impl Request {
    pub fn command(&self) -> &'static str {
        match self {
            Self::SubmitSingle { .. } => "submit-single",
            Self::SubmitBatch { .. } => "submit-batch",
            Self::SubmitMerge { .. } => "submit-merge",
            Self::Cancel => "cancel",
            Self::GetVersion => "get-version",
            Self::Quit => "quit",
        }
    }
}

/// Run a session until `quit`, end of input, or `shutdown`.
///
/// Returns the output writer once every line has been flushed.
pub async fn run_session<E, R, W>(
    dispatcher: JobDispatcher<E>,
    input: R,
    output: W,
    shutdown: CancellationToken,
) -> anyhow::Result<W>
where
    E: ConversionEngine,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(write_lines(output, rx));
    let mut jobs = JoinSet::new();
    let mut lines = input.lines();

    tracing::info!("Session started");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.cancelled() => {
                tracing::info!("Session interrupted");
                break;
            }
        };
        let Some(line) = line else {
            tracing::debug!("Session input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<Request>(&line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed session request");
                send(&tx, &ResultLine::err("invalid", None, e));
                continue;
            }
        };

        tracing::debug!(command = request.command(), "Session request");
        match request {
            Request::SubmitSingle {
                input,
                output,
                options,
            } => {
                let submitted = dispatcher.submit_single(input, output, options).await;
                track(&mut jobs, &tx, "submit-single", submitted);
            }
            Request::SubmitBatch {
                inputs,
                output_dir,
                options,
            } => {
                let submitted = dispatcher.submit_batch(inputs, output_dir, options).await;
                track(&mut jobs, &tx, "submit-batch", submitted);
            }
            Request::SubmitMerge {
                inputs,
                output,
                options,
            } => {
                let submitted = dispatcher.submit_merge(inputs, output, options).await;
                track(&mut jobs, &tx, "submit-merge", submitted);
            }
            Request::Cancel => {
                let cancelled = dispatcher.registry().cancel().await;
                send(
                    &tx,
                    &ResultLine::ok("cancel", cancelled, Some(cancelled.is_some().into())),
                );
            }
            Request::GetVersion => {
                send(
                    &tx,
                    &ResultLine::ok("get-version", None, Some(version_string().into())),
                );
            }
            Request::Quit => {
                send(&tx, &ResultLine::ok("quit", None, None));
                break;
            }
        }
    }

    dispatcher.registry().cleanup().await;
    while jobs.join_next().await.is_some() {}

    drop(tx);
    let output = writer.await??;
    tracing::info!("Session ended");
    Ok(output)
}

// ---- private helpers ----

fn send(tx: &mpsc::UnboundedSender<String>, line: &impl Serialize) {
    // The writer only stops once every sender is gone.
    let _ = tx.send(json_line(line));
}

/// Report a rejected submission, or forward an accepted job's events and
/// result in the background.
fn track<T>(
    jobs: &mut JoinSet<()>,
    tx: &mpsc::UnboundedSender<String>,
    command: &'static str,
    submitted: Result<JobHandle<T>, JobError>,
) where
    T: Serialize + Send + 'static,
{
    match submitted {
        Ok(handle) => {
            jobs.spawn(forward_job(handle, command, tx.clone()));
        }
        Err(e) => send(tx, &ResultLine::err(command, None, e)),
    }
}

async fn forward_job<T: Serialize>(
    mut handle: JobHandle<T>,
    command: &'static str,
    tx: mpsc::UnboundedSender<String>,
) {
    if let Some(mut events) = handle.take_events() {
        while let Some(event) = events.recv().await {
            send(&tx, &EventLine::new(&event));
        }
    }

    let job_id = Some(handle.id());
    let line = match handle.wait().await {
        Ok(result) => ResultLine::ok(command, job_id, serde_json::to_value(&result).ok()),
        Err(e) => ResultLine::err(command, job_id, e),
    };
    send(&tx, &line);
}

async fn write_lines<W>(
    mut output: W,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        output.write_all(line.as_bytes()).await?;
        output.flush().await?;
    }
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

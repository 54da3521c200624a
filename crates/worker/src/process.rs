//! Subprocess-backed [`ConversionEngine`].
//!
//! Spawns `<program> <script> <args…>` with a widened `PATH` and UTF-8
//! stdio, captures both streams, and races the exit against cancellation
//! and the optional inactivity deadline. On Unix the engine runs in its own
//! process group so that anything it starts is killed along with it.

use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::command::Invocation;
use crate::config::{ConfigError, EngineConfig};
use crate::engine::{
    ConversionEngine, EngineError, EngineReport, MERGE_SUCCESS_MESSAGE, SUCCESS_MESSAGE,
};

/// Maximum stdout or stderr size kept per stream (10 MiB).
///
/// Output past the cap is still read, so the engine never blocks on a
/// full pipe, but it is discarded.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Runs the engine as a child process, one process per invocation.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    config: Arc<EngineConfig>,
    search_path: OsString,
}

impl ProcessEngine {
    /// Resolve the child `PATH` once against the current environment.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let inherited = std::env::var_os("PATH");
        let search_path = config.search_path(inherited.as_ref())?;
        Ok(Self {
            config: Arc::new(config),
            search_path,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(invocation.engine_args(&self.config.script))
            .env("PATH", &self.search_path)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

impl ConversionEngine for ProcessEngine {
    async fn convert(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> Result<EngineReport, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut cmd = self.command(&invocation);
        let start = Instant::now();

        let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
            program: self.config.program.display().to_string(),
            source,
        })?;
        let group = ProcessGroup(child.id());

        tracing::debug!(
            pid = child.id(),
            program = %self.config.program.display(),
            inputs = invocation.inputs.len(),
            merge = invocation.merge,
            "Engine process started",
        );

        let activity = Arc::new(Notify::new());
        let stdout_task = tokio::spawn(read_stream(child.stdout.take(), Arc::clone(&activity)));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take(), Arc::clone(&activity)));
        let readers = [stdout_task.abort_handle(), stderr_task.abort_handle()];

        let idle_limit = self.config.inactivity_timeout;
        let status = loop {
            tokio::select! {
                status = child.wait() => break status.map_err(EngineError::Io)?,
                _ = cancel.cancelled() => {
                    terminate(&mut child, &group, &readers).await;
                    tracing::debug!(
                        elapsed_ms = elapsed_ms(start),
                        "Engine process killed on cancel",
                    );
                    return Err(EngineError::Cancelled);
                }
                _ = activity.notified() => continue,
                _ = idle_deadline(idle_limit) => {
                    terminate(&mut child, &group, &readers).await;
                    return Err(inactive(idle_limit));
                }
            }
        };

        // Processes the engine started may still hold the pipes open after
        // it exits, so draining stays cancellable and under the deadline.
        let drained = async {
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            (stdout, stderr)
        };
        tokio::pin!(drained);
        let (stdout_bytes, stderr_bytes) = loop {
            tokio::select! {
                output = &mut drained => break output,
                _ = cancel.cancelled() => {
                    terminate(&mut child, &group, &readers).await;
                    tracing::debug!(
                        elapsed_ms = elapsed_ms(start),
                        "Engine helpers killed on cancel",
                    );
                    return Err(EngineError::Cancelled);
                }
                _ = activity.notified() => continue,
                _ = idle_deadline(idle_limit) => {
                    terminate(&mut child, &group, &readers).await;
                    return Err(inactive(idle_limit));
                }
            }
        };

        let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
        let duration_ms = elapsed_ms(start);

        if status.success() {
            let message = if invocation.merge {
                MERGE_SUCCESS_MESSAGE
            } else {
                SUCCESS_MESSAGE
            };
            tracing::debug!(duration_ms, "Engine process exited successfully");
            return Ok(EngineReport {
                message: message.to_string(),
                stdout,
                stderr,
                duration_ms,
            });
        }

        let code = status.code().unwrap_or(-1);
        tracing::debug!(code, duration_ms, "Engine process exited with failure");
        Err(EngineError::from_exit(code, &stdout, &stderr, invocation.merge))
    }
}

// ---- private helpers ----

/// The engine's process group, killed as a whole when the invocation ends.
///
/// On Unix the engine leads its own group, so this also reaches any
/// processes it started. Elsewhere only `kill_on_drop` applies.
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
    #[cfg(unix)]
    fn kill(&self) {
        let Some(pgid) = self.0.and_then(|pid| i32::try_from(pid).ok()) else {
            return;
        };
        // Safety: kill(2) takes plain integers; a group with no members left
        // just fails with ESRCH.
        unsafe { libc::kill(-pgid, libc::SIGKILL) };
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Kill the engine's whole group, reap the child and stop the readers.
async fn terminate(child: &mut Child, group: &ProcessGroup, readers: &[AbortHandle]) {
    group.kill();
    let _ = child.start_kill();
    let _ = child.wait().await;
    for reader in readers {
        reader.abort();
    }
}

fn inactive(limit: Option<Duration>) -> EngineError {
    let idle_ms = limit.map(|d| d.as_millis() as u64).unwrap_or_default();
    tracing::warn!(idle_ms, "Engine process killed after inactivity");
    EngineError::Inactive { idle_ms }
}

/// Resolves after `limit`, or never when there is no limit.
async fn idle_deadline(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Read a stream to EOF, keeping at most [`MAX_OUTPUT_BYTES`] and
/// signalling `activity` for every chunk.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>, activity: Arc<Notify>) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut reader) = handle else {
        return buf;
    };

    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                activity.notify_one();
                let room = MAX_OUTPUT_BYTES.saturating_sub(buf.len());
                buf.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! In-memory engine shared by the pipeline integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mdocx_events::EventBus;
use mdocx_pipeline::{JobDispatcher, JobRegistry};
use mdocx_worker::engine::{MERGE_SUCCESS_MESSAGE, SUCCESS_MESSAGE};
use mdocx_worker::{ConversionEngine, EngineError, EngineReport, Invocation};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// How the fake engine behaves on every call.
#[derive(Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Return immediately; fail for inputs listed in `fail_on`.
    Immediate,
    /// Run until cancelled.
    BlockUntilCancelled,
    /// Wait for `release`, ignoring cancellation, then succeed.
    Gated,
    /// Fail as if the engine program were missing.
    SpawnFailure,
}

#[derive(Clone)]
pub struct FakeEngine {
    pub behavior: Behavior,
    pub fail_on: Vec<String>,
    pub calls: Arc<AtomicUsize>,
    pub kills: Arc<AtomicUsize>,
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
    pub invocations: Arc<std::sync::Mutex<Vec<Invocation>>>,
}

impl FakeEngine {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            fail_on: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            kills: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
            invocations: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn failing_on(names: &[&str]) -> Self {
        let mut engine = Self::new(Behavior::Immediate);
        engine.fail_on = names.iter().map(|n| n.to_string()).collect();
        engine
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    fn report(merge: bool) -> EngineReport {
        EngineReport {
            message: if merge { MERGE_SUCCESS_MESSAGE } else { SUCCESS_MESSAGE }.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 1,
        }
    }
}

impl ConversionEngine for FakeEngine {
    async fn convert(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> Result<EngineReport, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations
            .lock()
            .expect("invocations lock")
            .push(invocation.clone());
        self.started.notify_one();

        match self.behavior {
            Behavior::BlockUntilCancelled => {
                cancel.cancelled().await;
                self.kills.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::Cancelled)
            }
            Behavior::Gated => {
                self.release.notified().await;
                Ok(Self::report(invocation.merge))
            }
            Behavior::SpawnFailure => Err(EngineError::Spawn {
                program: "python3".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
            }),
            Behavior::Immediate => {
                let failing = invocation.inputs.iter().find(|p| self.is_failing(p));
                match failing {
                    Some(path) => Err(EngineError::from_exit(
                        1,
                        "",
                        &format!("cannot parse {}", path.display()),
                        invocation.merge,
                    )),
                    None => Ok(Self::report(invocation.merge)),
                }
            }
        }
    }
}

impl FakeEngine {
    fn is_failing(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| self.fail_on.iter().any(|f| n == f.as_str()))
            .unwrap_or(false)
    }
}

pub fn dispatcher(engine: FakeEngine) -> JobDispatcher<FakeEngine> {
    JobDispatcher::new(
        engine,
        Arc::new(JobRegistry::new()),
        Arc::new(EventBus::default()),
    )
}

use mdocx_core::{JobId, JobMode, JobState};
use mdocx_events::JobEvents;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::JobError;

/// Caller's view of a submitted job.
///
/// Dropping the handle, or the event stream taken from it, detaches the
/// caller; the job keeps running until it finishes or is cancelled through
/// the registry.
pub struct JobHandle<T> {
    id: JobId,
    mode: JobMode,
    state: watch::Receiver<JobState>,
    events: Option<JobEvents>,
    task: JoinHandle<Result<T, JobError>>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(
        id: JobId,
        mode: JobMode,
        state: watch::Receiver<JobState>,
        events: JobEvents,
        task: JoinHandle<Result<T, JobError>>,
    ) -> Self {
        Self {
            id,
            mode,
            state,
            events: Some(events),
            task,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    /// Current state snapshot.
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// The job's event stream. Available once; later calls return `None`.
    pub fn take_events(&mut self) -> Option<JobEvents> {
        self.events.take()
    }

    /// Wait for the job's final result.
    pub async fn wait(self) -> Result<T, JobError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(JobError::Internal(format!("job task failed: {e}"))),
        }
    }
}

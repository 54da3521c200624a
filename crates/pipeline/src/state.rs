//! Observable per-job state.

use mdocx_core::{CoreError, JobState};
use tokio::sync::watch;

/// Current state of one job, shared between its task, the registry and the
/// caller's handle.
///
/// Every change goes through [`JobStateTracker::advance`], which enforces
/// the state machine atomically: whichever of completion and cancellation
/// reaches a terminal state first wins, and the loser gets an error.
#[derive(Debug)]
pub struct JobStateTracker {
    tx: watch::Sender<JobState>,
}

impl JobStateTracker {
    pub fn new(initial: JobState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> JobState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.tx.subscribe()
    }

    /// Move to `next` if the state machine allows it.
    pub fn advance(&self, next: JobState) -> Result<(), CoreError> {
        let mut rejected = None;
        self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                rejected = Some(*state);
                false
            }
        });

        match rejected {
            Some(from) => Err(CoreError::InvalidTransition { from, to: next }),
            None => Ok(()),
        }
    }
}

//! Single-flight job registry.
//!
//! [`JobRegistry`] tracks the one job allowed to run at a time. Admission,
//! release and cancellation all go through one mutex, so a cancel racing a
//! submit or a natural completion always sees a consistent slot.

use std::sync::Arc;

use mdocx_core::{Job, JobId, JobMode, JobState};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::state::JobStateTracker;

/// Bookkeeping for the running job.
struct ActiveJob {
    id: JobId,
    mode: JobMode,
    cancel: CancellationToken,
    state: Arc<JobStateTracker>,
}

/// Owns at most one running job.
///
/// Created once by the caller and shared via `Arc`; call
/// [`JobRegistry::cleanup`] before shutdown so no engine process outlives
/// the application.
#[derive(Default)]
pub struct JobRegistry {
    active: Mutex<Option<ActiveJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` as the running job and move it to `running`.
    ///
    /// Rejects with [`JobError::AlreadyRunning`] while another job holds the
    /// slot; the running job is left untouched. Returns the token that
    /// cancels the admitted job.
    pub async fn admit(
        &self,
        job: &Job,
        state: Arc<JobStateTracker>,
    ) -> Result<CancellationToken, JobError> {
        let mut slot = self.active.lock().await;

        if let Some(active) = slot.as_ref() {
            tracing::warn!(
                job_id = %job.id,
                active_job_id = %active.id,
                mode = %job.mode,
                "Rejected submission while a job is running",
            );
            return Err(JobError::AlreadyRunning { active: active.id });
        }

        state.advance(JobState::Running)?;
        let cancel = CancellationToken::new();
        *slot = Some(ActiveJob {
            id: job.id,
            mode: job.mode,
            cancel: cancel.clone(),
            state,
        });

        tracing::info!(
            job_id = %job.id,
            mode = %job.mode,
            files = job.total_files(),
            "Job admitted",
        );
        Ok(cancel)
    }

    /// Clear the slot if it still belongs to `id`.
    ///
    /// A stale release from a job that was already cancelled (and possibly
    /// replaced) is ignored. Returns whether the slot was cleared.
    pub async fn release(&self, id: JobId) -> bool {
        let mut slot = self.active.lock().await;
        match slot.as_ref() {
            Some(active) if active.id == id => {
                *slot = None;
                tracing::debug!(job_id = %id, "Job released");
                true
            }
            _ => false,
        }
    }

    /// Cancel the running job, if any.
    ///
    /// No-op when nothing is running, so repeated calls are harmless.
    /// Returns the id of the job that was cancelled.
    pub async fn cancel(&self) -> Option<JobId> {
        let Some(active) = self.active.lock().await.take() else {
            tracing::debug!("Cancel requested with no running job");
            return None;
        };

        if let Err(e) = active.state.advance(JobState::Cancelled) {
            // The job reached a terminal state just before us.
            tracing::debug!(job_id = %active.id, error = %e, "Cancel arrived after completion");
            return None;
        }

        active.cancel.cancel();
        tracing::info!(job_id = %active.id, mode = %active.mode, "Job cancelled");
        Some(active.id)
    }

    /// Cancel whatever is running before shutdown.
    pub async fn cleanup(&self) {
        match self.cancel().await {
            Some(job_id) => tracing::info!(%job_id, "Registry cleanup cancelled the running job"),
            None => tracing::debug!("Registry cleanup found nothing running"),
        }
    }

    /// Id and mode of the running job.
    pub async fn active_job(&self) -> Option<(JobId, JobMode)> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|active| (active.id, active.mode))
    }

    pub async fn is_idle(&self) -> bool {
        self.active.lock().await.is_none()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`JobEvent`]s. It is
//! shared via `Arc<EventBus>` between the dispatcher, the running job
//! tasks, and any number of observers.

use mdocx_core::JobId;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::event::JobEvent;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use mdocx_core::{JobMode, types::new_job_id};
/// use mdocx_events::{EventBus, JobEvent, JobEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(JobEvent::new(new_job_id(), JobMode::Single, JobEventKind::Cancelled));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped,
    /// so observers leaving never affects a running job.
    pub fn publish(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to every event published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the events of a single job.
    ///
    /// Subscribe before the job starts publishing, or early events are
    /// missed.
    pub fn subscribe_job(&self, job_id: JobId) -> JobEvents {
        JobEvents::new(job_id, self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// JobEvents
// ---------------------------------------------------------------------------

/// Event stream for one job.
///
/// Yields the job's events in publication order and returns `None` once the
/// terminal event has been delivered. Dropping it unsubscribes.
pub struct JobEvents {
    job_id: JobId,
    rx: broadcast::Receiver<JobEvent>,
    finished: bool,
}

impl JobEvents {
    pub fn new(job_id: JobId, rx: broadcast::Receiver<JobEvent>) -> Self {
        Self {
            job_id,
            rx,
            finished: false,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Wait for the next event of this job.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        if self.finished {
            return None;
        }

        loop {
            match self.rx.recv().await {
                Ok(event) if event.job_id == self.job_id => {
                    if event.is_terminal() {
                        self.finished = true;
                    }
                    return Some(event);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(job_id = %self.job_id, skipped, "Job event observer lagged");
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Drain every remaining event until the terminal one.
    pub async fn collect(mut self) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

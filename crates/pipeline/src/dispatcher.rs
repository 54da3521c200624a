//! Job dispatcher.
//!
//! Validates a submission, admits it through the [`JobRegistry`], then runs
//! it on a Tokio task:
//!
//! - single: one engine call, terminal `single_completed` or `failed`;
//! - batch: one engine call per input, strictly in order, per-file failures
//!   recorded and skipped;
//! - merge: one engine call covering every input, all or nothing.
//!
//! The task settles the job state first, then releases the registry slot,
//! then publishes the terminal event. A caller that sees the terminal event
//! can therefore submit the next job immediately.

use std::path::PathBuf;
use std::sync::Arc;

use mdocx_core::{
    BatchResult, ConversionOptions, ConversionOutcome, FileResult, Job, JobMode, JobState,
    MergeResult,
};
use mdocx_events::{EventBus, JobEvents, ProgressReporter};
use mdocx_worker::{ConversionEngine, EngineError, Invocation};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::aggregator::{
    batch_state, display_name, merge_failed, merge_succeeded, output_path_for, BatchAggregator,
};
use crate::error::JobError;
use crate::handle::JobHandle;
use crate::registry::JobRegistry;
use crate::state::JobStateTracker;

/// Public entry point for conversion jobs.
pub struct JobDispatcher<E> {
    engine: Arc<E>,
    registry: Arc<JobRegistry>,
    bus: Arc<EventBus>,
}

impl<E> Clone for JobDispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            registry: Arc::clone(&self.registry),
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<E: ConversionEngine> JobDispatcher<E> {
    pub fn new(engine: E, registry: Arc<JobRegistry>, bus: Arc<EventBus>) -> Self {
        Self {
            engine: Arc::new(engine),
            registry,
            bus,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Convert one file to `output`.
    pub async fn submit_single(
        &self,
        input: PathBuf,
        output: PathBuf,
        options: ConversionOptions,
    ) -> Result<JobHandle<ConversionOutcome>, JobError> {
        let job = prepare(JobMode::Single, vec![input], output, options)?;
        let (ctx, state, events) = self.start(job).await?;
        let (id, mode) = (ctx.job.id, ctx.job.mode);
        let task = tokio::spawn(run_single(Arc::clone(&self.engine), ctx));
        Ok(JobHandle::new(id, mode, state, events, task))
    }

    /// Convert each input into `output_dir`, one after another.
    pub async fn submit_batch(
        &self,
        inputs: Vec<PathBuf>,
        output_dir: PathBuf,
        options: ConversionOptions,
    ) -> Result<JobHandle<BatchResult>, JobError> {
        let job = prepare(JobMode::Batch, inputs, output_dir, options)?;
        let (ctx, state, events) = self.start(job).await?;
        let (id, mode) = (ctx.job.id, ctx.job.mode);
        let task = tokio::spawn(run_batch(Arc::clone(&self.engine), ctx));
        Ok(JobHandle::new(id, mode, state, events, task))
    }

    /// Combine every input, in order, into the single document `output`.
    pub async fn submit_merge(
        &self,
        inputs: Vec<PathBuf>,
        output: PathBuf,
        options: ConversionOptions,
    ) -> Result<JobHandle<MergeResult>, JobError> {
        let job = prepare(JobMode::Merge, inputs, output, options)?;
        let (ctx, state, events) = self.start(job).await?;
        let (id, mode) = (ctx.job.id, ctx.job.mode);
        let task = tokio::spawn(run_merge(Arc::clone(&self.engine), ctx));
        Ok(JobHandle::new(id, mode, state, events, task))
    }

    /// Admit `job`, move it to running and subscribe to its events before
    /// anything can be published.
    async fn start(
        &self,
        mut job: Job,
    ) -> Result<(JobContext, watch::Receiver<JobState>, JobEvents), JobError> {
        let state = Arc::new(JobStateTracker::new(job.state));
        let cancel = self.registry.admit(&job, Arc::clone(&state)).await?;
        job.transition(JobState::Running)?;

        let events = self.bus.subscribe_job(job.id);
        let watch = state.subscribe();
        let reporter = ProgressReporter::new(job.id, job.mode, Arc::clone(&self.bus));

        let ctx = JobContext {
            job,
            cancel,
            state,
            registry: Arc::clone(&self.registry),
            reporter,
        };
        Ok((ctx, watch, events))
    }
}

fn prepare(
    mode: JobMode,
    inputs: Vec<PathBuf>,
    output: PathBuf,
    options: ConversionOptions,
) -> Result<Job, JobError> {
    if inputs.is_empty() {
        return Err(JobError::Validation(
            "at least one input file is required".to_string(),
        ));
    }
    if output.as_os_str().is_empty() {
        return Err(JobError::Validation("an output path is required".to_string()));
    }
    options.check()?;
    Ok(Job::new(mode, inputs, output, options))
}

// ---------------------------------------------------------------------------
// Job tasks
// ---------------------------------------------------------------------------

async fn run_single<E: ConversionEngine>(
    engine: Arc<E>,
    mut ctx: JobContext,
) -> Result<ConversionOutcome, JobError> {
    let Some(input) = ctx.job.inputs.first().cloned() else {
        return ctx.fail(JobError::Internal("single job without input".into())).await;
    };
    let output = ctx.job.output.clone();

    ctx.reporter.single_started(&display_name(&input));
    let invocation = Invocation::single(input, output.clone(), ctx.job.options.clone());

    match engine.convert(invocation, ctx.cancel.clone()).await {
        Ok(report) => {
            let outcome = ConversionOutcome {
                success: true,
                message: report.message,
                output_path: output,
            };
            ctx.finish(JobState::Completed, |r| r.single_completed(outcome.clone()))
                .await?;
            Ok(outcome)
        }
        Err(e) => ctx.fail(JobError::from(e)).await,
    }
}

/// Convert the batch inputs one by one.
///
/// Engine failures, stalls included, are recorded for that file and the
/// batch moves on. An engine that cannot be spawned fails every remaining
/// file the same way, so it ends the batch as `failed` instead of reporting
/// N identical per-file errors.
async fn run_batch<E: ConversionEngine>(
    engine: Arc<E>,
    mut ctx: JobContext,
) -> Result<BatchResult, JobError> {
    let inputs = ctx.job.inputs.clone();
    let total = inputs.len();
    let mut aggregator = BatchAggregator::new(ctx.job.output.clone(), total);

    for (index, input) in inputs.into_iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            return ctx.fail(JobError::Cancelled).await;
        }

        let file_name = display_name(&input);
        let output = output_path_for(&input, &ctx.job.output);
        ctx.reporter.batch_file_started(
            index + 1,
            total,
            &file_name,
            &aggregator.processed_outputs(),
            &aggregator.failures(),
        );

        let invocation = Invocation::single(input, output.clone(), ctx.job.options.clone());
        match engine.convert(invocation, ctx.cancel.clone()).await {
            Ok(_) => {
                tracing::debug!(job_id = %ctx.job.id, file = %file_name, "Batch file converted");
                aggregator.record(FileResult::converted(file_name, output));
            }
            Err(EngineError::Cancelled) => return ctx.fail(JobError::Cancelled).await,
            Err(e @ EngineError::Spawn { .. }) => return ctx.fail(JobError::from(e)).await,
            Err(e) => aggregator.record(FileResult::failed(file_name, output, e.to_string())),
        }
    }

    let result = aggregator.finish();
    ctx.finish(batch_state(&result), |r| r.batch_completed(result.clone()))
        .await?;
    Ok(result)
}

async fn run_merge<E: ConversionEngine>(
    engine: Arc<E>,
    mut ctx: JobContext,
) -> Result<MergeResult, JobError> {
    let total = ctx.job.total_files();
    let output = ctx.job.output.clone();

    ctx.reporter.merge_preparing(total);
    let invocation = Invocation::merge(
        ctx.job.inputs.clone(),
        output.clone(),
        ctx.job.options.clone(),
    );

    match engine.convert(invocation, ctx.cancel.clone()).await {
        Ok(_) => {
            let result = merge_succeeded(output, total);
            ctx.finish(JobState::Completed, |r| r.merge_completed(result.clone()))
                .await?;
            Ok(result)
        }
        Err(EngineError::Cancelled) => ctx.fail(JobError::Cancelled).await,
        Err(e) => {
            let err = JobError::from(e);
            let result = merge_failed(output, total, err.to_string());
            ctx.finish(JobState::Failed, |r| r.merge_completed(result))
                .await?;
            Err(err)
        }
    }
}

// ---------------------------------------------------------------------------
// JobContext
// ---------------------------------------------------------------------------

/// Everything a running job task owns.
struct JobContext {
    job: Job,
    cancel: CancellationToken,
    state: Arc<JobStateTracker>,
    registry: Arc<JobRegistry>,
    reporter: ProgressReporter,
}

impl JobContext {
    /// Settle the job in `next`, release the registry slot and publish the
    /// terminal event through `emit`.
    ///
    /// If the job was cancelled in the meantime the completion is dropped
    /// and the job ends as cancelled instead.
    async fn finish(
        &mut self,
        next: JobState,
        emit: impl FnOnce(&mut ProgressReporter),
    ) -> Result<(), JobError> {
        if self.state.advance(next).is_err() {
            self.registry.release(self.job.id).await;
            tracing::debug!(
                job_id = %self.job.id,
                ignored = %next,
                "Completion ignored after cancellation",
            );
            self.reporter.cancelled();
            return Err(JobError::Cancelled);
        }
        // The tracker accepted `next`, so the local mirror follows it.
        if let Err(e) = self.job.transition(next) {
            tracing::error!(job_id = %self.job.id, error = %e, "Job state mirror diverged");
        }

        self.registry.release(self.job.id).await;
        emit(&mut self.reporter);

        tracing::info!(
            job_id = %self.job.id,
            mode = %self.job.mode,
            state = %next,
            elapsed_ms = (chrono::Utc::now() - self.job.created_at).num_milliseconds(),
            "Job finished",
        );
        Ok(())
    }

    /// End the job with `err`: cancellations settle as `cancelled`,
    /// everything else as `failed` with the error published verbatim.
    async fn fail<T>(&mut self, err: JobError) -> Result<T, JobError> {
        match err {
            JobError::Cancelled => {
                self.finish(JobState::Cancelled, |r| r.cancelled()).await?;
                Err(JobError::Cancelled)
            }
            err => {
                let message = err.to_string();
                tracing::warn!(job_id = %self.job.id, error = %message, "Job failed");
                self.finish(JobState::Failed, |r| r.failed(message)).await?;
                Err(err)
            }
        }
    }
}

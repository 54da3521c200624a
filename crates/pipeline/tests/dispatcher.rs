//! Integration tests for `JobDispatcher` against an in-memory engine.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{dispatcher, Behavior, FakeEngine};
use mdocx_core::{ConversionOptions, JobState, ProgressStage};
use mdocx_events::JobEventKind;
use mdocx_pipeline::JobError;

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|n| PathBuf::from("/docs").join(n)).collect()
}

// ---------------------------------------------------------------------------
// Test: batch of three where the second file fails
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_continues_past_failed_file() {
    let dispatcher = dispatcher(FakeEngine::failing_on(&["b.md"]));

    let mut handle = dispatcher
        .submit_batch(
            paths(&["a.md", "b.md", "c.md"]),
            PathBuf::from("/out"),
            ConversionOptions::default(),
        )
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");
    let state = handle.watch_state();

    let result = handle.wait().await.expect("batch never raises for file failures");
    let events = events.collect().await;

    assert!(!result.success);
    assert_eq!(result.total_files, 3);
    assert_eq!(result.processed_files, 2);
    assert_eq!(result.message, "2 processed, 1 failed");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].file_name, "b.md");
    assert_eq!(
        result.errors[0].error,
        "Conversion failed with code 1: cannot parse /docs/b.md"
    );
    assert_eq!(
        result.outputs,
        vec![PathBuf::from("/out/a.docx"), PathBuf::from("/out/c.docx")]
    );
    assert!(result.is_consistent());
    assert_eq!(*state.borrow(), JobState::PartiallyCompleted);
    assert_eq!(
        JobError::check_batch(&result),
        Err(JobError::PartialBatchFailure { failed: 1, total: 3 })
    );

    // Exactly N checkpoints, then the completion.
    assert_eq!(events.len(), 4);
    let checkpoints: Vec<_> = events[..3]
        .iter()
        .map(|e| match &e.kind {
            JobEventKind::BatchProgress(p) => p.clone(),
            other => panic!("expected batch checkpoint, got {other:?}"),
        })
        .collect();
    let percentages: Vec<u8> = checkpoints.iter().map(|p| p.progress.percentage).collect();
    assert_eq!(percentages, vec![33, 67, 100]);
    assert_eq!(checkpoints[1].processed_files, vec![PathBuf::from("/out/a.docx")]);
    assert!(checkpoints[1].errors.is_empty());
    assert_eq!(checkpoints[2].errors.len(), 1);
    assert_eq!(checkpoints[2].progress.current_file_name, "c.md");
    assert_matches!(&events[3].kind, JobEventKind::BatchCompleted(r) if r == &result);
    assert_eq!(events[3].channel(), "batch-conversion-complete");
}

#[tokio::test]
async fn clean_batch_completes() {
    let engine = FakeEngine::new(Behavior::Immediate);
    let dispatcher = dispatcher(engine.clone());

    let handle = dispatcher
        .submit_batch(paths(&["a.md", "b.md"]), PathBuf::from("/out"), ConversionOptions::default())
        .await
        .expect("submit");
    let state = handle.watch_state();
    let result = handle.wait().await.expect("batch");

    assert!(result.success);
    assert_eq!(*state.borrow(), JobState::Completed);
    assert_eq!(engine.calls(), 2);

    let invocations = engine.invocations.lock().expect("lock");
    assert!(invocations.iter().all(|inv| !inv.merge && inv.inputs.len() == 1));
    assert_eq!(invocations[1].output, PathBuf::from("/out/b.docx"));
}

#[tokio::test]
async fn spawn_failure_aborts_batch() {
    let engine = FakeEngine::new(Behavior::SpawnFailure);
    let dispatcher = dispatcher(engine.clone());

    let mut handle = dispatcher
        .submit_batch(paths(&["a.md", "b.md"]), PathBuf::from("/out"), ConversionOptions::default())
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");
    let state = handle.watch_state();

    let err = handle.wait().await.unwrap_err();
    assert_matches!(err, JobError::Spawn(_));
    assert_eq!(engine.calls(), 1);
    assert_eq!(*state.borrow(), JobState::Failed);

    let events = events.collect().await;
    assert_matches!(events.last().map(|e| &e.kind), Some(JobEventKind::Failed { .. }));
}

// ---------------------------------------------------------------------------
// Test: merge emits one preparing checkpoint and one completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn merge_of_two_files() {
    let engine = FakeEngine::new(Behavior::Immediate);
    let dispatcher = dispatcher(engine.clone());

    let mut handle = dispatcher
        .submit_merge(
            paths(&["1.md", "2.md"]),
            PathBuf::from("/out/book.docx"),
            ConversionOptions::default(),
        )
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");

    let result = handle.wait().await.expect("merge");
    let events = events.collect().await;

    assert!(result.success);
    assert_eq!(result.total_files, 2);
    assert_eq!(result.output_path, PathBuf::from("/out/book.docx"));
    assert_eq!(engine.calls(), 1);

    assert_eq!(events.len(), 2);
    assert_matches!(
        &events[0].kind,
        JobEventKind::Progress(p) if p.stage == ProgressStage::Preparing && p.percentage == 0
    );
    assert_eq!(events[0].channel(), "merge-conversion-progress");
    assert_matches!(&events[1].kind, JobEventKind::MergeCompleted(r) if r.success && r.total_files == 2);

    let invocations = engine.invocations.lock().expect("lock");
    assert!(invocations[0].merge);
    assert_eq!(invocations[0].inputs, paths(&["1.md", "2.md"]));
}

#[tokio::test]
async fn merge_failure_is_fatal() {
    let dispatcher = dispatcher(FakeEngine::failing_on(&["2.md"]));

    let mut handle = dispatcher
        .submit_merge(
            paths(&["1.md", "2.md"]),
            PathBuf::from("/out/book.docx"),
            ConversionOptions::default(),
        )
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");
    let state = handle.watch_state();

    let err = handle.wait().await.unwrap_err();
    assert_eq!(
        err,
        JobError::Process("Merge conversion failed with code 1: cannot parse /docs/2.md".into())
    );
    assert_eq!(*state.borrow(), JobState::Failed);

    let events = events.collect().await;
    assert_matches!(
        &events.last().expect("terminal").kind,
        JobEventKind::MergeCompleted(r) if !r.success && r.error.as_deref() == Some(err.to_string().as_str())
    );
}

// ---------------------------------------------------------------------------
// Test: single mode checkpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_success_has_two_checkpoints() {
    let dispatcher = dispatcher(FakeEngine::new(Behavior::Immediate));

    let mut handle = dispatcher
        .submit_single(
            PathBuf::from("/docs/a.md"),
            PathBuf::from("/out/a.docx"),
            ConversionOptions::default(),
        )
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");

    let outcome = handle.wait().await.expect("single");
    assert_eq!(outcome.message, "Conversion completed successfully");

    let events = events.collect().await;
    assert_eq!(events.len(), 2);
    assert_matches!(&events[0].kind, JobEventKind::Progress(p) if p.current_file_name == "a.md");
    assert_eq!(events[1].channel(), "conversion-complete");
}

#[tokio::test]
async fn single_failure_publishes_diagnostic() {
    let dispatcher = dispatcher(FakeEngine::failing_on(&["a.md"]));

    let mut handle = dispatcher
        .submit_single(
            PathBuf::from("/docs/a.md"),
            PathBuf::from("/out/a.docx"),
            ConversionOptions::default(),
        )
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");

    let err = handle.wait().await.unwrap_err();
    assert_matches!(&err, JobError::Process(msg) if msg.starts_with("Conversion failed with code 1"));

    let events = events.collect().await;
    let last = events.last().expect("terminal");
    assert_eq!(last.channel(), "conversion-error");
    assert_eq!(
        last.kind,
        JobEventKind::Failed {
            message: err.to_string()
        }
    );
}

// ---------------------------------------------------------------------------
// Test: validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_inputs_are_rejected() {
    let engine = FakeEngine::new(Behavior::Immediate);
    let dispatcher = dispatcher(engine.clone());

    let err = dispatcher
        .submit_batch(Vec::new(), PathBuf::from("/out"), ConversionOptions::default())
        .await
        .err()
        .expect("validation error");
    assert_matches!(err, JobError::Validation(_));

    let err = dispatcher
        .submit_merge(Vec::new(), PathBuf::from("/out/x.docx"), ConversionOptions::default())
        .await
        .err()
        .expect("validation error");
    assert_matches!(err, JobError::Validation(_));

    assert_eq!(engine.calls(), 0);
    assert!(dispatcher.registry().is_idle().await);
}

#[tokio::test]
async fn out_of_range_options_are_rejected() {
    let dispatcher = dispatcher(FakeEngine::new(Behavior::Immediate));
    let options = ConversionOptions {
        font_size: Some(200),
        ..Default::default()
    };

    let err = dispatcher
        .submit_single(PathBuf::from("a.md"), PathBuf::from("a.docx"), options)
        .await
        .err()
        .expect("validation error");
    assert_matches!(err, JobError::Validation(_));
}

// ---------------------------------------------------------------------------
// Test: single-flight and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_submission_is_rejected_while_running() {
    let engine = FakeEngine::new(Behavior::BlockUntilCancelled);
    let dispatcher = dispatcher(engine.clone());

    let first = dispatcher
        .submit_single(PathBuf::from("a.md"), PathBuf::from("a.docx"), ConversionOptions::default())
        .await
        .expect("submit first");
    engine.started.notified().await;

    let err = dispatcher
        .submit_single(PathBuf::from("b.md"), PathBuf::from("b.docx"), ConversionOptions::default())
        .await
        .err()
        .expect("second submission rejected");
    assert_eq!(err, JobError::AlreadyRunning { active: first.id() });
    assert_eq!(first.state(), JobState::Running);
    assert_eq!(engine.calls(), 1);
    assert_eq!(engine.kills(), 0);

    assert_eq!(dispatcher.registry().cancel().await, Some(first.id()));
    assert_eq!(first.wait().await.unwrap_err(), JobError::Cancelled);
    assert_eq!(engine.kills(), 1);

    // Slot is free again.
    let third = dispatcher
        .submit_single(PathBuf::from("c.md"), PathBuf::from("c.docx"), ConversionOptions::default())
        .await
        .expect("submit after cancel");
    engine.started.notified().await;
    dispatcher.registry().cleanup().await;
    assert_eq!(third.wait().await.unwrap_err(), JobError::Cancelled);
}

#[tokio::test]
async fn cancel_stops_running_batch() {
    let engine = FakeEngine::new(Behavior::BlockUntilCancelled);
    let dispatcher = dispatcher(engine.clone());

    let mut handle = dispatcher
        .submit_batch(
            paths(&["a.md", "b.md", "c.md"]),
            PathBuf::from("/out"),
            ConversionOptions::default(),
        )
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");
    engine.started.notified().await;

    dispatcher.registry().cancel().await;
    assert_eq!(handle.state(), JobState::Cancelled);
    assert_eq!(handle.wait().await.unwrap_err(), JobError::Cancelled);

    assert_eq!(engine.calls(), 1);
    assert_eq!(engine.kills(), 1);

    let events = events.collect().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].kind, JobEventKind::Cancelled);
    assert_eq!(events[1].channel(), "conversion-cancelled");
}

#[tokio::test]
async fn late_completion_after_cancel_is_ignored() {
    let engine = FakeEngine::new(Behavior::Gated);
    let dispatcher = dispatcher(engine.clone());

    let mut handle = dispatcher
        .submit_single(PathBuf::from("a.md"), PathBuf::from("a.docx"), ConversionOptions::default())
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");
    let state = handle.watch_state();
    engine.started.notified().await;

    assert_eq!(dispatcher.registry().cancel().await, Some(handle.id()));
    assert!(dispatcher.registry().is_idle().await);

    // The engine ignores the token and finishes naturally afterwards.
    engine.release.notify_one();

    assert_eq!(handle.wait().await.unwrap_err(), JobError::Cancelled);
    assert_eq!(*state.borrow(), JobState::Cancelled);

    let events = events.collect().await;
    assert!(events
        .iter()
        .all(|e| !matches!(e.kind, JobEventKind::SingleCompleted(_))));
    assert_eq!(events.last().map(|e| &e.kind), Some(&JobEventKind::Cancelled));
}

#[tokio::test]
async fn cancel_with_nothing_running_is_noop() {
    let dispatcher = dispatcher(FakeEngine::new(Behavior::Immediate));
    assert_eq!(dispatcher.registry().cancel().await, None);
    assert_eq!(dispatcher.registry().cancel().await, None);
}

// ---------------------------------------------------------------------------
// Test: observers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropping_observers_does_not_affect_job() {
    let dispatcher = dispatcher(FakeEngine::new(Behavior::Immediate));

    let mut handle = dispatcher
        .submit_batch(paths(&["a.md", "b.md"]), PathBuf::from("/out"), ConversionOptions::default())
        .await
        .expect("submit");
    drop(handle.take_events());
    assert!(handle.take_events().is_none());

    let result = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("job finishes")
        .expect("batch");
    assert!(result.success);
}

#[tokio::test]
async fn terminal_event_implies_slot_is_free() {
    let dispatcher = dispatcher(FakeEngine::new(Behavior::Immediate));

    let mut handle = dispatcher
        .submit_single(PathBuf::from("a.md"), PathBuf::from("a.docx"), ConversionOptions::default())
        .await
        .expect("submit");
    let events = handle.take_events().expect("events");
    let _ = events.collect().await;

    // No need to await the handle first.
    let next = dispatcher
        .submit_single(PathBuf::from("b.md"), PathBuf::from("b.docx"), ConversionOptions::default())
        .await
        .expect("submit next");
    next.wait().await.expect("second job");
    handle.wait().await.expect("first job");
}

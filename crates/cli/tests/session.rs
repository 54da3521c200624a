//! Integration tests for the JSON session loop, with a bash script standing
//! in for the conversion engine.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use mdocx_cli::session::run_session;
use mdocx_events::EventBus;
use mdocx_pipeline::{JobDispatcher, JobRegistry};
use mdocx_worker::{EngineConfig, ProcessEngine};
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, WriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Client {
    requests: WriteHalf<DuplexStream>,
    responses: Lines<BufReader<tokio::io::ReadHalf<DuplexStream>>>,
    session: JoinHandle<anyhow::Result<WriteHalf<DuplexStream>>>,
    shutdown: CancellationToken,
    _dir: TempDir,
}

impl Client {
    fn start(script: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let script_path = dir.path().join("convert.sh");
        std::fs::write(&script_path, script).expect("write script");
        let engine = ProcessEngine::new(EngineConfig::new("bash", &script_path)).expect("engine");
        let dispatcher = JobDispatcher::new(
            engine,
            Arc::new(JobRegistry::new()),
            Arc::new(EventBus::default()),
        );

        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);

        let shutdown = CancellationToken::new();
        let session = tokio::spawn(run_session(
            dispatcher,
            BufReader::new(server_read),
            server_write,
            shutdown.clone(),
        ));

        Self {
            requests: client_write,
            responses: BufReader::new(client_read).lines(),
            session,
            shutdown,
            _dir: dir,
        }
    }

    async fn send(&mut self, request: &str) {
        self.requests
            .write_all(format!("{request}\n").as_bytes())
            .await
            .expect("write request");
    }

    async fn next(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), self.responses.next_line())
            .await
            .expect("response in time")
            .expect("read response")
            .expect("session still open");
        serde_json::from_str(&line).expect("response is JSON")
    }

    /// Read lines until the next `result` line, returning the events seen
    /// on the way and the result itself.
    async fn until_result(&mut self) -> (Vec<Value>, Value) {
        let mut events = Vec::new();
        loop {
            let line = self.next().await;
            if line["kind"] == "result" {
                return (events, line);
            }
            events.push(line);
        }
    }
}

// ---------------------------------------------------------------------------
// Test: get-version and quit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn version_then_quit() {
    let mut client = Client::start("exit 0\n");

    client.send(r#"{"command":"get-version"}"#).await;
    let version = client.next().await;
    assert_eq!(version["command"], "get-version");
    assert_eq!(version["ok"], true);
    assert_eq!(version["data"], format!("v{}", env!("CARGO_PKG_VERSION")));

    client.send(r#"{"command":"quit"}"#).await;
    let quit = client.next().await;
    assert_eq!(quit["command"], "quit");

    client.session.await.expect("join").expect("session");
}

// ---------------------------------------------------------------------------
// Test: a merge streams events and then its result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn merge_streams_events_then_result() {
    let mut client = Client::start("exit 0\n");

    client
        .send(r#"{"command":"submit-merge","inputs":["1.md","2.md"],"output":"book.docx"}"#)
        .await;
    let (events, result) = client.until_result().await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["channel"], "merge-conversion-progress");
    assert_eq!(events[0]["payload"]["stage"], "preparing");
    assert_eq!(events[1]["channel"], "merge-conversion-complete");
    assert_eq!(result["command"], "submit-merge");
    assert_eq!(result["ok"], true);
    assert_eq!(result["data"]["totalFiles"], 2);
    assert_eq!(result["jobId"], events[0]["jobId"]);

    client.send(r#"{"command":"quit"}"#).await;
    client.session.await.expect("join").expect("session");
}

// ---------------------------------------------------------------------------
// Test: malformed and rejected requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_request_gets_error_result() {
    let mut client = Client::start("exit 0\n");

    client.send("not json").await;
    let result = client.next().await;
    assert_eq!(result["command"], "invalid");
    assert_eq!(result["ok"], false);

    client
        .send(r#"{"command":"submit-batch","inputs":[],"outputDir":"out"}"#)
        .await;
    let result = client.next().await;
    assert_eq!(result["command"], "submit-batch");
    assert_eq!(result["ok"], false);
    assert!(result["error"]
        .as_str()
        .expect("error text")
        .starts_with("Validation failed"));

    client.send(r#"{"command":"quit"}"#).await;
    client.session.await.expect("join").expect("session");
}

// ---------------------------------------------------------------------------
// Test: single-flight, cancel and shutdown cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn busy_session_rejects_then_cancels() {
    let mut client = Client::start("exec sleep 30\n");

    client
        .send(r#"{"command":"submit-single","input":"a.md","output":"a.docx"}"#)
        .await;
    let started = client.next().await;
    assert_eq!(started["channel"], "conversion-progress");

    client
        .send(r#"{"command":"submit-single","input":"b.md","output":"b.docx"}"#)
        .await;
    let rejected = client.next().await;
    assert_eq!(rejected["ok"], false);
    assert!(rejected["error"]
        .as_str()
        .expect("error text")
        .starts_with("Job already running"));

    client.send(r#"{"command":"cancel"}"#).await;
    let mut lines = vec![
        client.next().await,
        client.next().await,
        client.next().await,
    ];
    lines.sort_by_key(|l| l["command"].as_str().unwrap_or_default().to_string());

    // Event line has no command, the cancel ack and the job result do.
    assert_eq!(lines[0]["channel"], "conversion-cancelled");
    assert_eq!(lines[1]["command"], "cancel");
    assert_eq!(lines[1]["data"], true);
    assert_eq!(lines[2]["command"], "submit-single");
    assert_eq!(lines[2]["error"], "Conversion cancelled");

    client.send(r#"{"command":"cancel"}"#).await;
    let noop = client.next().await;
    assert_eq!(noop["data"], false);

    client.send(r#"{"command":"quit"}"#).await;
    client.session.await.expect("join").expect("session");
}

#[tokio::test]
async fn shutdown_cleans_up_running_job() {
    let mut client = Client::start("exec sleep 30\n");

    client
        .send(r#"{"command":"submit-single","input":"a.md","output":"a.docx"}"#)
        .await;
    let _started = client.next().await;

    client.shutdown.cancel();
    let (events, result) = client.until_result().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "cancelled");
    assert_eq!(result["ok"], false);

    tokio::time::timeout(Duration::from_secs(5), client.session)
        .await
        .expect("session ends")
        .expect("join")
        .expect("session");
}

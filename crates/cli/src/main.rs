//! `mdocx` -- markdown to DOCX conversion jobs.
//!
//! # Environment variables
//!
//! | Variable                        | Default                       | Description                         |
//! |---------------------------------|-------------------------------|-------------------------------------|
//! | `MDOCX_ENGINE_PROGRAM`          | `python3`                     | Interpreter running the engine      |
//! | `MDOCX_ENGINE_SCRIPT`           | `<exe dir>/python/convert.py` | Engine script                       |
//! | `MDOCX_DEV`                     | unset                         | Use `./src/python/convert.py`       |
//! | `MDOCX_ENGINE_SEARCH_PATHS`     | empty                         | Extra `PATH` entries for the engine |
//! | `MDOCX_INACTIVITY_TIMEOUT_SECS` | `0` (off)                     | Kill a silent engine after N secs   |
//! | `MDOCX_LOG_FORMAT`              | `text`                        | `text` or `json` logs on stderr     |
//! | `RUST_LOG`                      | `warn,mdocx=info`             | Log filter                          |

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mdocx_cli::cli::{Cli, Commands};
use mdocx_cli::{logging, oneshot, session, version_string};
use mdocx_events::EventBus;
use mdocx_pipeline::{JobDispatcher, JobRegistry};
use mdocx_worker::ProcessEngine;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.log_format);

    if let Commands::GetVersion = cli.command {
        println!("{}", version_string());
        return Ok(ExitCode::SUCCESS);
    }

    let config = cli.engine_config().context("invalid engine configuration")?;
    tracing::info!(
        program = %config.program.display(),
        script = %config.script.display(),
        inactivity_timeout_secs = config.inactivity_timeout.map(|d| d.as_secs()),
        "Starting mdocx",
    );
    let engine = ProcessEngine::new(config).context("invalid engine search path")?;

    let registry = Arc::new(JobRegistry::new());
    let dispatcher = JobDispatcher::new(
        engine,
        Arc::clone(&registry),
        Arc::new(EventBus::default()),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl-C");
                shutdown.cancel();
            }
        }
    });

    let json = cli.json;
    let status = match cli.command {
        Commands::SubmitSingle(args) => {
            match dispatcher
                .submit_single(args.input, args.output, args.options.into())
                .await
            {
                Ok(handle) => {
                    oneshot::run_job(handle, "submit-single", &registry, shutdown, json).await
                }
                Err(e) => oneshot::report_rejection("submit-single", &e, json),
            }
        }
        Commands::SubmitBatch(args) => {
            match dispatcher
                .submit_batch(args.inputs, args.output_dir, args.options.into())
                .await
            {
                Ok(handle) => {
                    oneshot::run_job(handle, "submit-batch", &registry, shutdown, json).await
                }
                Err(e) => oneshot::report_rejection("submit-batch", &e, json),
            }
        }
        Commands::SubmitMerge(args) => {
            match dispatcher
                .submit_merge(args.inputs, args.output, args.options.into())
                .await
            {
                Ok(handle) => {
                    oneshot::run_job(handle, "submit-merge", &registry, shutdown, json).await
                }
                Err(e) => oneshot::report_rejection("submit-merge", &e, json),
            }
        }
        Commands::Session => {
            let stdin = BufReader::new(tokio::io::stdin());
            session::run_session(dispatcher, stdin, tokio::io::stdout(), shutdown).await?;
            ExitCode::SUCCESS
        }
        Commands::GetVersion => ExitCode::SUCCESS,
    };

    registry.cleanup().await;
    Ok(status)
}

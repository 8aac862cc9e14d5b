mod cli;
mod discover;
mod render;
mod report;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use zpup_core::StopPolicy;
use zpup_engine::{ChannelProgressSink, Orchestrator, StopHandle};
use zpup_logging::{zpup_error, zpup_info, zpup_warn};

use cli::Cli;

/// Exit status for errors that stop the batch before any upload.
const FATAL_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let logging = zpup_logging::initialize(cli.log_destination(), cli.log_level());

    match run(cli).await {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            report_fatal(&err, logging, io::stderr().lock());
            ExitCode::from(FATAL_EXIT)
        }
    }
}

/// The terminal logger already writes errors to stderr; print directly only without one.
fn report_fatal(err: &anyhow::Error, logging: bool, mut stderr: impl Write) {
    if logging {
        zpup_error!("{:#}", err);
    } else {
        let _ = writeln!(stderr, "Error: {err:#}");
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let files = discover::collect_files(&cli.files, &cli.directories)?;
    if files.is_empty() {
        zpup_warn!("Nothing to upload; pass --file or --directory");
    }

    let mut orchestrator =
        Orchestrator::new(cli.upload_settings()).context("setting up the uploader")?;
    let interrupts = tokio::spawn(forward_interrupts(orchestrator.stop_handle()));

    let (tx, rx) = mpsc::channel();
    let renderer = render::spawn(rx);
    zpup_info!("Uploading {} files", files.len());
    let report = orchestrator
        .upload(files, Arc::new(ChannelProgressSink::new(tx)))
        .await;
    interrupts.abort();
    orchestrator.shutdown();
    renderer
        .join()
        .map_err(|_| anyhow!("progress renderer panicked"))?;

    report::print_summary(&report, io::stdout().lock()).context("printing summary")?;
    if let Some(path) = &cli.output {
        report::save(path, &report, Utc::now())?;
    }
    Ok(report::exit_status(&report))
}

/// First Ctrl-C lets running uploads finish; the second aborts them.
async fn forward_interrupts(stop: StopHandle) {
    let mut policy = StopPolicy::Finish;
    while tokio::signal::ctrl_c().await.is_ok() {
        match policy {
            StopPolicy::Finish => {
                eprintln!("\nFinishing uploads in progress; press Ctrl-C again to abort them");
            }
            StopPolicy::Immediate => eprintln!("\nAborting all uploads"),
        }
        stop.stop(policy);
        if policy == StopPolicy::Immediate {
            break;
        }
        policy = StopPolicy::Immediate;
    }
}

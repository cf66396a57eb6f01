//! Ingest and populate command implementations.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::file_source::SourceFile;
use crate::ingest::{BatchReport, FileReport, FileStatus, IngestMode, SkipReason};
use crate::orchestrator::{BatchOptions, Orchestrator};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn preflight_ingest(settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, settings).await {
        Output::error(&format!("{}", e));
        Output::info("Run 'mosaic doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(())
}

/// Run the ingest command.
pub async fn run_ingest(file_id: &str, force: bool, settings: Settings) -> Result<()> {
    preflight_ingest(&settings).await?;

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner(&format!("Ingesting {}...", file_id));

    let report = match orchestrator.ingest_file(file_id, force).await {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to ingest {}: {}", file_id, e));
            return Err(e.into());
        }
    };
    spinner.finish_and_clear();

    Output::file_report(&report);
    match report.status() {
        FileStatus::Indexed => Output::success(&format!(
            "Indexed '{}' ({} units)",
            report.name,
            report.units_written()
        )),
        FileStatus::Partial => Output::warning(&format!(
            "Indexed '{}' partially ({} units, {} issues)",
            report.name,
            report.units_written(),
            report.issues.len()
        )),
        FileStatus::Skipped(SkipReason::AlreadyIndexed) => Output::warning(&format!(
            "'{}' is already indexed. Use --force to reprocess.",
            report.name
        )),
        FileStatus::Skipped(SkipReason::UnsupportedFormat) => {
            Output::warning(&format!("'{}' has an unsupported format.", report.name))
        }
        FileStatus::Empty => Output::warning(&format!("'{}' produced no content.", report.name)),
        FileStatus::Failed => {
            Output::error(&format!("Failed to ingest '{}'", report.name));
            return Err(anyhow::anyhow!("ingestion of {} failed", file_id));
        }
    }

    Ok(())
}

/// Run the populate command. Ctrl-C stops new files from starting.
pub async fn run_populate(
    name: Option<&str>,
    folder: Option<&str>,
    force: bool,
    settings: Settings,
) -> Result<()> {
    preflight_ingest(&settings).await?;

    let folder = folder
        .map(str::to_string)
        .or_else(|| settings.source.default_folder.clone());
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Listing source files...");
    let listed = orchestrator
        .services()
        .file_source
        .list(name, folder.as_deref())
        .await;
    spinner.finish_and_clear();

    let files: Vec<SourceFile> = listed?.into_iter().map(SourceFile::from).collect();
    if files.is_empty() {
        Output::warning("No files matched.");
        return Ok(());
    }
    Output::info(&format!("Found {} files", files.len()));

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            Output::warning("Interrupted; finishing files already in progress...");
            on_ctrl_c.cancel();
        }
    });

    let pb = Output::progress_bar(files.len() as u64, "Ingesting");
    let progress = pb.clone();
    let options = BatchOptions {
        force,
        cancel,
        on_file_done: Some(Arc::new(move |report: &FileReport| {
            progress.set_message(report.name.clone());
            progress.inc(1);
        })),
    };

    let batch = orchestrator
        .ingest_batch(files, IngestMode::Populate, &options)
        .await;
    pb.finish_and_clear();

    print_summary(&batch);
    Ok(())
}

fn print_summary(batch: &BatchReport) {
    Output::header("Ingestion Report");
    for report in &batch.files {
        Output::file_report(report);
    }

    println!();
    Output::kv("Indexed", &batch.count(FileStatus::Indexed).to_string());
    Output::kv("Partial", &batch.count(FileStatus::Partial).to_string());
    Output::kv("Failed", &batch.count(FileStatus::Failed).to_string());
    Output::kv(
        "Skipped",
        &(batch.count(FileStatus::Skipped(SkipReason::UnsupportedFormat))
            + batch.count(FileStatus::Skipped(SkipReason::AlreadyIndexed)))
        .to_string(),
    );
    Output::kv("Units written", &batch.total_units().to_string());

    if batch.cancelled {
        Output::warning(&format!(
            "Cancelled; {} files were not started.",
            batch.not_started.len()
        ));
    } else {
        Output::success("Population complete.");
    }
}

//! Subcommand implementations.

use anyhow::{Context, Result};
use lorasync_core::hashing::fingerprint_blocking_task;
use lorasync_core::{
    discover_artifacts, locate_sidecars, start_sync, SessionReport, SessionState, SyncEvent,
    SyncOptions,
};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub fn sync_options(
    api_key: Option<String>,
    base_url: Option<String>,
    recursive: bool,
    timeout_secs: u64,
) -> SyncOptions {
    let mut options = SyncOptions::new()
        .with_credential(api_key)
        .with_recursive(recursive)
        .with_request_timeout(Duration::from_secs(timeout_secs));
    if let Some(base_url) = base_url {
        options = options.with_base_url(base_url);
    }
    options.resolve_credential()
}

pub async fn sync(root: PathBuf, options: SyncOptions, json: bool) -> Result<ExitCode> {
    if options.credential.is_none() {
        warn!("No catalog API key configured; lookups may be rejected");
    }
    info!("Syncing {} against {}", root.display(), options.base_url);

    let mut session = start_sync(&root, &options).context("Failed to start sync session")?;
    let cancel = session.cancellation_token();

    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
            signal = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                signal.context("Failed to listen for Ctrl-C")?;
                warn!("Interrupt received, stopping after the current model");
                cancel.cancel();
            }
        }
    }

    let report = session.wait().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(match report.state {
        SessionState::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::Log(line) => info!("{}", line),
        SyncEvent::Error(line) => error!("{}", line),
        SyncEvent::Progress { processed, total } => info!("Progress: {}/{}", processed, total),
        SyncEvent::PreviewWritten => debug!("Preview written"),
        SyncEvent::MetadataWritten => debug!("Metadata written"),
        SyncEvent::Finished { matched, unmatched } => {
            debug!("Finished: {} matched, {} unmatched", matched, unmatched)
        }
    }
}

fn print_summary(report: &SessionReport) {
    let state = match report.state {
        SessionState::Completed => "completed",
        SessionState::Aborted => "cancelled",
        SessionState::Failed => "failed",
        SessionState::Idle | SessionState::Running => "unfinished",
    };
    println!(
        "Sync {}: {}/{} models, {} matched, {} unmatched",
        state, report.processed, report.total, report.matched, report.unmatched
    );
    println!(
        "  {} metadata files and {} previews written, {} file failures",
        report.metadata_written, report.previews_written, report.file_failures
    );
    if let Some(error) = &report.error {
        println!("  error: {}", error);
    }
}

pub async fn hash(file: PathBuf) -> Result<ExitCode> {
    let fingerprint = fingerprint_blocking_task(file.clone())
        .await
        .with_context(|| format!("Failed to hash {}", file.display()))?;
    println!("{}  {}", fingerprint, file.display());
    Ok(ExitCode::SUCCESS)
}

pub fn inspect(root: PathBuf, recursive: bool, json: bool) -> Result<ExitCode> {
    let artifacts = discover_artifacts(&root, recursive)?;

    if json {
        let listing: Vec<_> = artifacts
            .iter()
            .map(|artifact| json!({ "artifact": artifact, "sidecars": locate_sidecars(artifact) }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(ExitCode::SUCCESS);
    }

    for artifact in &artifacts {
        let sidecars = locate_sidecars(artifact);
        println!("{}", artifact.path.display());
        for (label, path) in [
            ("metadata", &sidecars.metadata),
            ("preview", &sidecars.preview),
            ("config", &sidecars.config),
        ] {
            match path {
                Some(path) => println!("  {:<8} {}", label, path.display()),
                None => println!("  {:<8} -", label),
            }
        }
    }
    println!("{} models", artifacts.len());
    Ok(ExitCode::SUCCESS)
}

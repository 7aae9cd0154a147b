use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, DEFAULT_SETTINGS_FILE},
    presentation::{FailureNotice, ResultPresentation, INTERPRETATION_DISCLAIMER},
    preview::format_file_size,
    report::VerificationReport,
    FileCandidate, PreviewRegistry, RequestState, SubmitOutcome, VerificationClient,
    WorkflowController, WorkflowOptions,
};
use shared::domain::VerificationMode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Check signature images against the verification service")]
struct Args {
    /// Overrides `server_url` from the settings file and environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// Write a JSON report of a successful verification. Without a path, or
    /// with a directory, the file is named `signature-analysis-<millis>.json`.
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    report: Option<Option<PathBuf>>,
    /// Print the raw normalized result as JSON instead of a summary.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify one signature as genuine or forged.
    Single { image: PathBuf },
    /// Compare two signatures for similarity.
    Compare { first: PathBuf, second: PathBuf },
}

impl Command {
    fn mode(&self) -> VerificationMode {
        match self {
            Self::Single { .. } => VerificationMode::SingleAnalysis,
            Self::Compare { .. } => VerificationMode::Comparison,
        }
    }

    fn images(&self) -> Vec<&Path> {
        match self {
            Self::Single { image } => vec![image.as_path()],
            Self::Compare { first, second } => vec![first.as_path(), second.as_path()],
        }
    }
}

async fn read_candidate(path: &Path) -> Result<FileCandidate> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("signature")
        .to_string();
    let mime_type = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string();
    Ok(FileCandidate::new(name, mime_type, content))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    if let Some(server_url) = args.server_url.clone() {
        settings.server_url = server_url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let mode = args.command.mode();
    let client = Arc::new(VerificationClient::new(&settings.server_url)?);
    let controller = WorkflowController::new_with_options(
        mode,
        client,
        PreviewRegistry::new(),
        WorkflowOptions {
            size_policy: settings.size_policy(),
        },
    );

    for (slot, path) in args.command.images().into_iter().enumerate() {
        let candidate = read_candidate(path).await?;
        match controller.select(slot, candidate).await {
            Ok(file) => {
                if file.exceeds_advisory_limit {
                    eprintln!(
                        "warning: {} is {}, above the recommended {} limit",
                        file.name,
                        file.size_label,
                        format_file_size(settings.max_upload_bytes)
                    );
                }
                tracing::debug!(slot, file = %file.name, size = %file.size_label, "slot filled");
            }
            Err(err) => bail!(FailureNotice::from_workflow_error(&err).message),
        }
    }

    let state = match controller.submit().await {
        Ok(SubmitOutcome::Settled(state)) => state,
        Ok(other) => bail!("verification did not settle: {other:?}"),
        Err(err) => bail!(FailureNotice::from_workflow_error(&err).message),
    };
    controller.shutdown().await;

    match state {
        RequestState::Succeeded(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let view = ResultPresentation::from_result(&result);
                println!("{}", view.status_text);
                println!("{}: {}", view.score_label, view.score_text);
                println!(
                    "Interpretation ({}): {}",
                    view.interpretation.band.range_label(),
                    view.interpretation.guidance
                );
                if let Some(detail) = &result.detail {
                    println!("Details: {detail}");
                }
                if let Some(ms) = result.processing_time_ms {
                    println!("Processing: {ms}ms");
                }
                if let Some(model) = &result.model_version {
                    println!("Model: {model}");
                }
                println!("Note: {INTERPRETATION_DISCLAIMER}");
            }

            if let Some(requested) = &args.report {
                let report = VerificationReport::new(mode, &result);
                let path = report.resolve_path(requested.as_deref());
                report.write_to(&path)?;
                println!("Report written to {}", path.display());
            }
            Ok(())
        }
        RequestState::Failed(err) => {
            tracing::error!(code = ?err.code(), "verification failed: {err}");
            bail!(FailureNotice::from_verification_error(mode, &err).message)
        }
        other => bail!("unexpected workflow state {:?}", other.kind()),
    }
}

//! Batch command - submit multiple receipts, then await all of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use recu_core::models::job::JobOutcome;
use recu_core::pipeline::{Pipeline, Submission};

use super::{build_pipeline, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Summary CSV path
    #[arg(long, default_value = "summary.csv")]
    summary_path: PathBuf,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    job_id: String,
    outcome: Option<JobOutcome>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(
                ext.to_lowercase().as_str(),
                "pdf" | "png" | "jpg" | "jpeg" | "webp" | "tiff" | "tif" | "bmp"
            )
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let (pipeline, _store) = build_pipeline(&config).await?;

    // Submit everything up front; each job runs as its own task.
    let mut submissions: Vec<(PathBuf, anyhow::Result<Submission>)> =
        Vec::with_capacity(files.len());
    for path in files {
        let submitted = submit_file(&pipeline, &path).await;
        if let Err(e) = &submitted {
            if !args.continue_on_error {
                anyhow::bail!("Failed to submit {}: {}", path.display(), e);
            }
            warn!("Failed to submit {}: {}", path.display(), e);
        }
        submissions.push((path, submitted));
    }

    let pb = ProgressBar::new(submissions.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(submissions.len());
    for (path, submitted) in submissions {
        let result = match submitted {
            Ok(submission) => {
                let job_id = submission.job_id.clone();
                match submission.handle.await? {
                    Ok(outcome) => ProcessResult {
                        path,
                        job_id,
                        outcome: Some(outcome),
                        error: None,
                    },
                    Err(e) => {
                        if !args.continue_on_error {
                            pb.abandon();
                            anyhow::bail!("Job {} failed: {}", job_id, e);
                        }
                        ProcessResult {
                            path,
                            job_id,
                            outcome: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
            Err(e) => ProcessResult {
                path,
                job_id: String::new(),
                outcome: None,
                error: Some(e.to_string()),
            },
        };
        results.push(result);
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let successful: Vec<_> = results.iter().filter(|r| r.outcome.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if args.summary {
        write_summary(&args.summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            args.summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn submit_file(pipeline: &Arc<Pipeline>, path: &Path) -> anyhow::Result<Submission> {
    let data = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin");
    Ok(Arc::clone(pipeline).submit(data, file_name).await?)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "job_id",
        "status",
        "merchant",
        "date",
        "amount",
        "currency",
        "category",
        "confidence",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(outcome) = &result.outcome {
            let receipt = &outcome.receipt;
            wtr.write_record([
                filename,
                &result.job_id,
                "ready",
                &receipt.merchant,
                receipt.date.as_deref().unwrap_or(""),
                &format!("{:.2}", receipt.amount),
                &receipt.currency,
                receipt.category.as_str(),
                &format!("{:.2}", receipt.confidence),
                &outcome.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                &result.job_id,
                "failed",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

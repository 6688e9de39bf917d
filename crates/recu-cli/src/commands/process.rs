//! Process command - run one receipt through the pipeline.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use recu_core::models::job::JobOutcome;
use recu_core::render::receipt_to_csv;

use super::{build_pipeline, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (image or PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let data = fs::read(&args.input)?;
    let file_name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin")
        .to_string();

    let (pipeline, _store) = build_pipeline(&config).await?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Submitting...");

    let submission = pipeline.submit(data, &file_name).await?;
    spinner.set_message(format!("Processing job {}...", submission.job_id));

    let outcome = submission.handle.await??;
    spinner.finish_and_clear();

    println!(
        "{} Job {} ready in {}ms",
        style("✓").green(),
        outcome.job_id,
        outcome.processing_time_ms
    );

    let output = format_outcome(&outcome, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{output}");
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_outcome(outcome: &JobOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => {
            let bytes = receipt_to_csv(&outcome.receipt)?;
            Ok(String::from_utf8(bytes)?)
        }
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

fn format_text(outcome: &JobOutcome) -> String {
    let receipt = &outcome.receipt;
    let mut output = String::new();

    output.push_str(&format!("Merchant: {}\n", receipt.merchant));
    if let Some(date) = &receipt.date {
        output.push_str(&format!("Date: {}\n", date));
    }
    output.push_str(&format!(
        "Total: {:.2} {}\n",
        receipt.amount, receipt.currency
    ));
    if let Some(vat) = receipt.vat_amount {
        output.push_str(&format!("VAT: {:.2} {}\n", vat, receipt.currency));
    }
    output.push_str(&format!("Category: {}\n", receipt.category));
    output.push_str(&format!("Document type: {}\n", receipt.document_type));
    output.push_str(&format!(
        "Confidence: {:.0}%\n",
        receipt.confidence * 100.0
    ));

    if !receipt.items.is_empty() {
        output.push_str("\nItems:\n");
        for item in &receipt.items {
            output.push_str(&format!("  {} {:.2}\n", item.description, item.amount));
        }
    }

    output.push_str(&format!("\nCSV: {}\n", outcome.artifacts.csv_url));
    output.push_str(&format!("PDF: {}\n", outcome.artifacts.pdf_url));

    output
}

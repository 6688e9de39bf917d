//! Status command - look up a submitted job.

use clap::Args;
use console::style;

use recu_core::models::job::{JobRecord, JobStatus};
use recu_core::pipeline::JobStore;

use super::{build_store, load_config};

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    /// Job identifier returned at submission
    #[arg(required = true)]
    job_id: String,

    /// Print the raw job row as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: StatusArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let store = build_store(&config)?;

    let record = store.fetch(&args.job_id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    print_record(&record);
    Ok(())
}

fn print_record(record: &JobRecord) {
    let status = match record.status {
        JobStatus::Ready => style(record.status.as_str()).green(),
        JobStatus::Failed => style(record.status.as_str()).red(),
        _ => style(record.status.as_str()).yellow(),
    };

    println!("Job: {}", record.job_id);
    println!("Status: {}", status);

    if let Some(created_at) = &record.created_at {
        println!("Submitted: {}", created_at.to_rfc3339());
    }

    if let Some(receipt) = &record.receipt {
        println!();
        println!("Merchant: {}", receipt.merchant);
        if let Some(date) = &receipt.date {
            println!("Date: {}", date);
        }
        println!("Total: {:.2} {}", receipt.amount, receipt.currency);
        println!("Category: {}", receipt.category);
    }

    if let Some(csv_url) = &record.csv_url {
        println!("CSV: {}", csv_url);
    }
    if let Some(pdf_url) = &record.pdf_url {
        println!("PDF: {}", pdf_url);
    }

    if let Some(code) = &record.error_code {
        println!();
        println!(
            "{} {}: {}",
            style("✗").red(),
            code,
            record.error.as_deref().unwrap_or("")
        );
    }
}

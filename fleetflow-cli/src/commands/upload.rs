//! Upload command handlers

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use fleetflow_client::OrchestratorClient;
use fleetflow_core::dto::upload::{UploadState, UploadStatus};

use crate::config::Config;

/// Upload a CSV for ingestion
pub async fn upload(config: &Config, file: &str) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    let content =
        std::fs::read(file).with_context(|| format!("Failed to read CSV file: {}", file))?;
    let file_name = Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());

    let accepted = client.upload_csv(file_name, content).await?;

    println!("{}", format!("✓ {}", accepted.message).green().bold());
    println!("  Job ID: {}", accepted.job_id.cyan());
    println!(
        "  Poll:   {}",
        format!("fleetflow upload-status {}", accepted.job_id).dimmed()
    );
    Ok(())
}

/// Show an ingestion job's state
pub async fn upload_status(config: &Config, job_id: &str) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);
    let status = client.upload_status(job_id).await?;
    print_status(job_id, &status);
    Ok(())
}

fn print_status(job_id: &str, status: &UploadStatus) {
    let state = match status.status {
        UploadState::Processing => "processing".yellow(),
        UploadState::Completed => "completed".green(),
        UploadState::Failed => "failed".red(),
    };

    println!("{}", "Ingestion Job:".bold());
    println!("  Job ID:   {}", job_id.cyan());
    println!("  Status:   {}", state);
    if let Some(progress) = status.progress {
        println!("  Progress: {}%", progress);
    }
    if let Some(message) = &status.message {
        println!("  Message:  {}", message.dimmed());
    }

    let Some(results) = &status.results else {
        return;
    };
    println!("  Parsed:   {} row(s)", results.parsed_count);

    if let Some(report) = &results.report {
        println!("\n{}", "Upserted:".bold());
        let counts = [
            ("Trains", report.trains),
            ("Fitness", report.fitness),
            ("Job cards", report.job_cards),
            ("Branding", report.branding),
            ("Mileage", report.mileage),
            ("Cleaning", report.cleaning),
            ("Stabling", report.stabling),
            ("Operations", report.operations),
        ];
        for (label, count) in counts {
            println!("  {:<11} {}", label, count);
        }
        if report.skipped_missing_train_fields > 0 {
            println!(
                "  {}",
                format!(
                    "{} row(s) skipped for missing train identity",
                    report.skipped_missing_train_fields
                )
                .yellow()
            );
        }
        for error in &report.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }
}

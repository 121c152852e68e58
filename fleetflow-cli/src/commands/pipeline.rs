//! Pipeline command handlers
//!
//! Starts runs from JSON or CSV, shows run state and replays stage webhooks.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use fleetflow_client::OrchestratorClient;
use fleetflow_core::domain::run::RunStatus;
use fleetflow_core::domain::stage::Stage;
use fleetflow_core::dto::pipeline::{RunSummary, StartPipeline, StartPipelineResponse, TrainData};
use fleetflow_core::dto::webhook::WebhookPayload;

use crate::config::Config;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Start a run from JSON train data
    Start {
        /// JSON file, or inline JSON: an array of trains or `{"trains": [...]}`
        #[arg(short, long)]
        trains: String,

        /// Days to simulate
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Start a run from a CSV file
    StartCsv {
        /// Path to the CSV file
        #[arg(short, long)]
        file: String,

        /// Days to simulate
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Show the state of a run
    Status {
        /// Run ID
        run_id: String,
    },
    /// List all runs, newest first
    Runs,
    /// Deliver a stage completion webhook by hand
    Webhook {
        /// Stage that finished (simulation, moo, rl)
        stage: Stage,

        /// Run ID
        run_id: String,

        /// Result file written by the stage
        #[arg(long)]
        file_path: Option<String>,

        /// Report the stage as failed
        #[arg(long)]
        failed: bool,

        /// Error message to report
        #[arg(long)]
        error: Option<String>,
    },
}

/// Handle pipeline commands
///
/// Routes pipeline subcommands to their respective handlers.
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        PipelineCommands::Start { trains, days } => start(&client, &trains, days).await,
        PipelineCommands::StartCsv { file, days } => start_csv(&client, &file, days).await,
        PipelineCommands::Status { run_id } => status(&client, &run_id).await,
        PipelineCommands::Runs => list_runs(&client).await,
        PipelineCommands::Webhook {
            stage,
            run_id,
            file_path,
            failed,
            error,
        } => {
            let payload = WebhookPayload {
                run_id: Some(run_id),
                file_path,
                success: !failed,
                error,
            };
            webhook(&client, stage, payload).await
        }
    }
}

/// Read trains from a file path or an inline JSON document
fn load_trains(input: &str) -> Result<Vec<TrainData>> {
    let text = if Path::new(input).is_file() {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read trains file: {}", input))?
    } else {
        input.to_string()
    };

    let value: serde_json::Value =
        serde_json::from_str(&text).context("Trains must be valid JSON")?;
    let trains = match value {
        serde_json::Value::Object(mut obj) => obj
            .remove("trains")
            .context("JSON object has no \"trains\" field")?,
        other => other,
    };

    let trains: Vec<TrainData> =
        serde_json::from_value(trains).context("Trains must be an array of train objects")?;
    if trains.is_empty() {
        bail!("No trains given");
    }
    Ok(trains)
}

async fn start(client: &OrchestratorClient, input: &str, days: Option<u32>) -> Result<()> {
    let req = StartPipeline {
        trains: load_trains(input)?,
        days_to_simulate: days,
    };

    let response = client.start_pipeline(&req).await?;
    print_start(&response);
    Ok(())
}

async fn start_csv(client: &OrchestratorClient, file: &str, days: Option<u32>) -> Result<()> {
    let content =
        std::fs::read(file).with_context(|| format!("Failed to read CSV file: {}", file))?;
    let file_name = Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());

    let response = client.start_pipeline_csv(file_name, content, days).await?;
    print_start(&response);
    Ok(())
}

async fn status(client: &OrchestratorClient, run_id: &str) -> Result<()> {
    let response = client.get_status(run_id).await?;
    print_run_details(&response.run);
    Ok(())
}

async fn list_runs(client: &OrchestratorClient) -> Result<()> {
    let response = client.list_runs().await?;

    if response.runs.is_empty() {
        println!("{}", "No pipeline runs found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} run(s):", response.total_runs).bold()
        );
        println!();
        for run in &response.runs {
            print_run_summary(run);
        }
    }

    Ok(())
}

async fn webhook(client: &OrchestratorClient, stage: Stage, payload: WebhookPayload) -> Result<()> {
    let response = client.send_webhook(stage, &payload).await?;

    println!(
        "{}",
        format!("✓ {} webhook delivered", stage).green().bold()
    );
    match response.run {
        Some(run) => println!("  Run status: {}", colorize_status(run.status)),
        None => println!("  {}", "Run not known to the orchestrator".yellow()),
    }
    Ok(())
}

fn colorize_status(status: RunStatus) -> ColoredString {
    match status {
        RunStatus::Completed => status.as_str().green(),
        RunStatus::Failed => status.as_str().red(),
        RunStatus::Idle => status.as_str().dimmed(),
        _ => status.as_str().yellow(),
    }
}

fn print_start(response: &StartPipelineResponse) {
    if response.success {
        println!("{}", format!("✓ {}", response.message).green().bold());
    } else {
        println!("{}", format!("✗ {}", response.message).red().bold());
    }
    println!("  Run ID:  {}", response.run_id.cyan());
    println!("  Status:  {}", colorize_status(response.status));
    println!("  Input:   {}", response.file_path.dimmed());
    println!("  Trains:  {}", response.trains_processed);
    println!("  Days:    {}", response.metadata.days_to_simulate);
}

fn print_run_summary(run: &RunSummary) {
    println!("  {} {}", "▸".cyan(), run.run_id.bold());
    println!("    Status:  {}", colorize_status(run.status));
    println!(
        "    Started: {}",
        run.started_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(error) = run.details.get("error") {
        if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
            println!("    Error:   {}", message.red());
        }
    }
    println!();
}

fn print_run_details(run: &RunSummary) {
    println!("{}", "Pipeline Run:".bold());
    println!("  Run ID:  {}", run.run_id.cyan());
    println!("  Status:  {}", colorize_status(run.status));
    println!("  Started: {}", run.started_at.format("%Y-%m-%d %H:%M:%S"));

    println!("\n{}", "Details:".bold());
    println!("{}", "─".repeat(80).dimmed());
    match serde_json::to_string_pretty(&run.details) {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", run.details),
    }
    println!("{}", "─".repeat(80).dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_inline_array() {
        let trains = load_trains(r#"[{"trainId": "T1", "status": "active"}]"#).unwrap();
        assert_eq!(trains.len(), 1);
        assert_eq!(trains[0].train_id, "T1");
    }

    #[test]
    fn test_load_wrapped_object() {
        let trains =
            load_trains(r#"{"trains": [{"trainId": "T1", "status": "a"}, {"trainId": "T2", "status": "b"}]}"#)
                .unwrap();
        assert_eq!(trains.len(), 2);
    }

    #[test]
    fn test_load_rejects_empty_and_invalid() {
        assert!(load_trains("[]").is_err());
        assert!(load_trains("not json").is_err());
        assert!(load_trains(r#"{"other": 1}"#).is_err());
    }
}

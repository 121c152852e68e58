//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;
mod upload;

pub use pipeline::PipelineCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline runs and webhooks
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Upload a CSV for ingestion into the train store
    Upload {
        /// Path to the CSV file
        file: String,
    },
    /// Show the progress of an ingestion job
    UploadStatus {
        /// Job ID returned by `upload`
        job_id: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Upload { file } => upload::upload(config, &file).await,
        Commands::UploadStatus { job_id } => upload::upload_status(config, &job_id).await,
    }
}

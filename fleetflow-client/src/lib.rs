//! Fleetflow HTTP Clients
//!
//! Type-safe HTTP clients for the two remote parties of the pipeline engine:
//!
//! - [`OrchestratorClient`] talks to the orchestrator's own API and is used by the CLI
//! - [`StageClient`] triggers the external simulation / MOO / RL services
//!
//! # Example
//!
//! ```no_run
//! use fleetflow_client::OrchestratorClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fleetflow_client::ClientError> {
//!     let client = OrchestratorClient::new("http://localhost:3000");
//!
//!     let runs = client.list_runs().await?;
//!     println!("{} runs", runs.total_runs);
//!     Ok(())
//! }
//! ```

pub mod error;
mod pipelines;
mod stages;
mod uploads;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use stages::StageClient;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Fleetflow orchestrator API
///
/// Methods are grouped by concern:
/// - Pipeline runs (start from JSON or CSV, status, listing)
/// - Webhook delivery (replaying stage completions)
/// - CSV upload jobs
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:3000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    ///
    /// # Example
    /// ```
    /// use fleetflow_client::OrchestratorClient;
    ///
    /// let client = OrchestratorClient::new("http://localhost:3000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Check the status code and deserialize a JSON body
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Check the status code and discard the body
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OrchestratorClient::new("http://localhost:3000");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = OrchestratorClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}

//! Health command handler.
//!
//! Reports whether a service could be started from the current workspace.
//! Always prints a JSON status object.

use clap::Args;
use sage_core::{config::AppConfig, AppResult};
use sage_knowledge::RagService;
use serde::Serialize;

/// Check that the index and backends can be loaded
#[derive(Args, Debug)]
pub struct HealthCommand {}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<usize>,
}

impl HealthCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command");

        match config.validate().and_then(|_| RagService::open(config)) {
            Ok(service) => {
                let health = service.health();
                super::print_json(&HealthReport {
                    message: format!("Serving {} chunks", health.chunks),
                    status: health.status,
                    chunks: Some(health.chunks),
                })
            }
            Err(e) => {
                super::print_json(&HealthReport {
                    status: "error".to_string(),
                    message: e.to_failure().message,
                    chunks: None,
                })?;
                Err(e)
            }
        }
    }
}

//! MCP Gateway Controller
//!
//! Registers `MCPServer` resources as targets on an AWS Bedrock AgentCore
//! gateway and keeps each target in sync with its resource:
//! - creates the target when an MCPServer appears
//! - updates it when the spec changes
//! - reports target status and a Ready condition
//! - deletes it before the MCPServer is removed

mod backoff;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod server;
mod settings;
mod status;
mod store;
mod target_builder;
mod validation;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::controller::Controller;
use crate::error::ControllerError;
use crate::settings::Settings;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "mcp_gateway_controller=info,gateway_client=info";

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting MCP Gateway Controller");

    let settings = Settings::from_env()?;
    info!(
        region = settings.aws_region.as_deref().unwrap_or("SDK default"),
        default_gateway_id = settings.default_gateway_id.as_deref().unwrap_or("none"),
        namespace = settings.watch_namespace.as_deref().unwrap_or("all namespaces"),
        requeue_interval_secs = settings.requeue_interval.as_secs(),
        metrics_port = settings.metrics_port,
        concurrency = settings.reconcile_concurrency,
        "Configuration loaded"
    );

    let controller = Controller::new(settings).await?;
    controller.run().await
}

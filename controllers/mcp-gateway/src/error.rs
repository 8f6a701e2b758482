//! Controller-specific error types.

use crate::store::StoreError;
use gateway_client::GatewayError;
use thiserror::Error;

/// Errors that can occur in the MCP gateway controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Gateway API error
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Watcher or background task failure
    #[error("Watch error: {0}")]
    Watch(String),

    /// Metrics registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Metrics/probe server failed
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

impl ControllerError {
    /// Returns true for optimistic-concurrency conflicts on the resource.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(StoreError::Conflict(_)))
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Kube(_) => "kube",
            Self::Store(_) => "store",
            Self::Gateway(_) => "gateway",
            Self::InvalidConfig(_) => "config",
            Self::Watch(_) => "watch",
            Self::Metrics(_) => "metrics",
            Self::Server(_) => "server",
        }
    }
}

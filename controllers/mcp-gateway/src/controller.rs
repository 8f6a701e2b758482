//! Main controller implementation.
//!
//! Wires the Kubernetes client, the Bedrock AgentCore gateway client, the
//! reconciler, the MCPServer watcher and the metrics server together, and
//! runs them until ctrl-c.

use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::server::{self, ServerState};
use crate::settings::Settings;
use crate::store::{KubeStore, ResourceStore};
use crate::watcher::{watch_mcp_servers, Context};
use crds::MCPServer;
use gateway_client::{BedrockGatewayClient, RetryPolicy, RetryingGatewayClient};
use kube::{Api, Client};
use prometheus::Registry;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Main controller for MCPServer resources.
#[derive(Debug)]
pub struct Controller {
    settings: Settings,
    reconciler: Arc<Reconciler>,
    api: Api<MCPServer>,
    registry: Registry,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(settings: Settings) -> Result<Self, ControllerError> {
        info!("Initializing MCP gateway controller");

        let kube_client = Client::try_default().await?;

        let gateway = BedrockGatewayClient::from_env(
            settings.aws_region.clone(),
            settings.agentcore_endpoint.clone(),
        )
        .await;

        let registry = Registry::new();
        let metrics = Arc::new(Metrics::new(&registry)?);

        let store: Arc<dyn ResourceStore> = Arc::new(KubeStore::new(kube_client.clone()));
        let reconciler = Reconciler::new(
            RetryingGatewayClient::new(Box::new(gateway), RetryPolicy::default()),
            store,
            settings.default_gateway_id.clone(),
            settings.requeue_interval,
            metrics,
        );

        let api: Api<MCPServer> = match settings.watch_namespace.as_deref() {
            Some(namespace) => Api::namespaced(kube_client, namespace),
            None => Api::all(kube_client),
        };

        Ok(Self {
            settings,
            reconciler: Arc::new(reconciler),
            api,
            registry,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        let cancel = CancellationToken::new();
        let state = ServerState::new(self.registry);

        let mut server_task = tokio::spawn(server::serve(
            self.settings.metrics_port,
            state.clone(),
            cancel.clone(),
        ));
        let ctx = Arc::new(Context::new(self.reconciler, cancel.clone()));
        let mut watcher_task = tokio::spawn(watch_mcp_servers(
            self.api,
            ctx,
            self.settings.reconcile_concurrency,
            cancel.clone(),
        ));
        state.set_ready(true);
        info!("MCP gateway controller running");

        let result = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                signal.map_err(ControllerError::from)
            }
            joined = &mut server_task => flatten(joined, "metrics server"),
            joined = &mut watcher_task => flatten(joined, "watcher"),
        };

        state.set_ready(false);
        cancel.cancel();
        drain(watcher_task, "watcher").await;
        drain(server_task, "metrics server").await;

        info!("MCP gateway controller stopped");
        result
    }
}

/// Wait for a background task that has not already been joined.
async fn drain<E>(task: JoinHandle<Result<(), E>>, name: &str)
where
    ControllerError: From<E>,
{
    if task.is_finished() {
        return;
    }
    if let Err(e) = flatten(task.await, name) {
        error!(error = %e, task = name, "Task failed during shutdown");
    }
}

fn flatten<E>(
    joined: Result<Result<(), E>, JoinError>,
    task: &str,
) -> Result<(), ControllerError>
where
    ControllerError: From<E>,
{
    joined
        .map_err(|e| ControllerError::Watch(format!("{task} panicked: {e}")))?
        .map_err(ControllerError::from)
}

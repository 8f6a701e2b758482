//! MCPServer watcher.
//!
//! Drives [`Reconciler::reconcile_mcp_server`] from a kube-runtime
//! `Controller`, which handles reconnection, deduplication of pending
//! requests and per-object serialization.

use crate::error::ControllerError;
use crate::reconciler::{Directive, Reconciler};
use crate::store::resource_key;
use crds::MCPServer;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Wait after the last event before reconciling, so bursts of status
/// writes collapse into one pass.
const DEBOUNCE: Duration = Duration::from_secs(5);

/// State shared by every reconciliation
#[derive(Debug)]
pub struct Context {
    reconciler: Arc<Reconciler>,
    cancel: CancellationToken,
}

impl Context {
    /// Create a context; `cancel` aborts in-flight gateway calls on shutdown
    pub fn new(reconciler: Arc<Reconciler>, cancel: CancellationToken) -> Self {
        Self { reconciler, cancel }
    }
}

async fn reconcile(resource: Arc<MCPServer>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let Some(namespace) = resource.namespace() else {
        warn!(name = %resource.name_any(), "Ignoring MCPServer without a namespace");
        return Ok(Action::await_change());
    };
    let name = resource.name_any();
    debug!(resource = %resource_key(&resource), "Reconciling MCPServer");

    let started = Instant::now();
    let result = ctx
        .reconciler
        .reconcile_mcp_server(&namespace, &name, &ctx.cancel)
        .await;
    let metrics = &ctx.reconciler.metrics;
    metrics.observe_reconciliation(started.elapsed().as_secs_f64());

    let directive = result?;
    if matches!(directive, Directive::RequeueAfter(_) | Directive::RequeueNow) {
        metrics.increment_requeue(directive.label());
    }
    Ok(directive.into_action())
}

fn error_policy(resource: Arc<MCPServer>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let key = resource_key(&resource);
    ctx.reconciler.metrics.increment_error(error.kind());
    let delay = ctx.reconciler.error_backoff(&key);
    error!(
        resource = %key,
        error = %error,
        delay_secs = delay.as_secs(),
        "Reconciliation failed, requeueing with backoff"
    );
    ctx.reconciler.metrics.increment_requeue("error");
    Action::requeue(delay)
}

/// Watch MCPServers until `cancel` fires.
pub async fn watch_mcp_servers(
    api: Api<MCPServer>,
    ctx: Arc<Context>,
    concurrency: u16,
    cancel: CancellationToken,
) -> Result<(), ControllerError> {
    info!(concurrency, "Starting MCPServer watcher");

    let controller_config = ControllerConfig::default()
        .debounce(DEBOUNCE)
        .concurrency(concurrency);

    let controller = Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!(resource = %obj, "Reconciled"),
                Err(e) => warn!(error = %e, "Controller error"),
            }
        });

    tokio::select! {
        () = controller => Err(ControllerError::Watch("MCPServer watch stream ended".to_string())),
        () = cancel.cancelled() => {
            info!("Stopping MCPServer watcher");
            Ok(())
        }
    }
}

//! Reconciliation logic for MCPServer resources.
//!
//! The [`Reconciler`] owns the gateway client, the resource store and the
//! per-resource error backoff. The state machine itself lives in
//! [`mcp_server`].

pub mod mcp_server;


use crate::backoff::FibonacciBackoff;
use crate::metrics::Metrics;
use crate::status::StatusManager;
use crate::store::ResourceStore;
use crate::target_builder::TargetRequestBuilder;
use crate::validation::ConfigParser;
use gateway_client::RetryingGatewayClient;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

const ERROR_BACKOFF_MIN: Duration = Duration::from_secs(5);
const ERROR_BACKOFF_MAX: Duration = Duration::from_secs(300);

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Converged; wait for the next change
    Done,
    /// Check again after the given delay
    RequeueAfter(Duration),
    /// Lost an optimistic-concurrency race; run again right away
    RequeueNow,
    /// Permanent failure; only a spec change can help
    Stop,
}

impl Directive {
    /// Map onto a kube-runtime action
    pub fn into_action(self) -> Action {
        match self {
            Self::Done | Self::Stop => Action::await_change(),
            Self::RequeueAfter(delay) => Action::requeue(delay),
            Self::RequeueNow => Action::requeue(Duration::ZERO),
        }
    }

    /// Metrics label
    pub fn label(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::RequeueAfter(_) => "requeue_after",
            Self::RequeueNow => "conflict",
            Self::Stop => "stop",
        }
    }
}

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(ERROR_BACKOFF_MIN, ERROR_BACKOFF_MAX),
            error_count: 0,
        }
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciles MCPServer resources against the gateway.
pub struct Reconciler {
    pub(crate) gateway: RetryingGatewayClient,
    pub(crate) store: Arc<dyn ResourceStore>,
    pub(crate) status: StatusManager,
    pub(crate) parser: ConfigParser,
    pub(crate) builder: TargetRequestBuilder,
    pub(crate) poll_interval: Duration,
    pub(crate) metrics: Arc<Metrics>,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("gateway", &self.gateway)
            .field("parser", &self.parser)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler.
    pub fn new(
        gateway: RetryingGatewayClient,
        store: Arc<dyn ResourceStore>,
        default_gateway_id: Option<String>,
        poll_interval: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            gateway,
            status: StatusManager::new(Arc::clone(&store)),
            store,
            parser: ConfigParser::new(default_gateway_id),
            builder: TargetRequestBuilder,
            poll_interval,
            metrics,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn backoff_states(&self) -> MutexGuard<'_, HashMap<String, BackoffState>> {
        self.backoff_states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a failure for `key` and return how long to wait before retrying.
    pub(crate) fn error_backoff(&self, key: &str) -> Duration {
        let mut states = self.backoff_states();
        let state = states.entry(key.to_string()).or_insert_with(BackoffState::new);
        state.error_count += 1;
        let delay = state.backoff.next_backoff();
        debug!(resource = key, error_count = state.error_count, delay_secs = delay.as_secs(), "Backing off");
        delay
    }

    /// Restart the backoff for `key` after a successful pass.
    pub(crate) fn reset_error(&self, key: &str) {
        if let Some(state) = self.backoff_states().get_mut(key)
            && state.error_count > 0
        {
            state.reset();
            debug!(resource = key, "Reset error backoff");
        }
    }

    /// Drop all backoff state for `key` once the resource is gone.
    pub(crate) fn forget(&self, key: &str) {
        self.backoff_states().remove(key);
    }

    /// Consecutive failures recorded for `key`
    #[cfg(test)]
    pub(crate) fn error_count(&self, key: &str) -> u32 {
        self.backoff_states().get(key).map_or(0, |s| s.error_count)
    }
}

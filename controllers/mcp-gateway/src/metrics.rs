//! # Controller Metrics
//!
//! Prometheus metrics for reconciliations, gateway calls and requeues.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

/// Controller metrics, registered once at startup and shared by reference
#[derive(Debug, Clone)]
pub struct Metrics {
    reconciliations: IntCounter,
    reconciliation_errors: IntCounterVec,
    gateway_calls: IntCounterVec,
    requeues: IntCounterVec,
    reconciliation_duration: Histogram,
}

impl Metrics {
    /// Create all metrics and register them with `registry`
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let reconciliations = IntCounter::new(
            "mcp_gateway_reconciliations_total",
            "Total number of reconciliations",
        )?;
        let reconciliation_errors = IntCounterVec::new(
            Opts::new(
                "mcp_gateway_reconciliation_errors_total",
                "Total number of reconciliation errors",
            ),
            &["kind"],
        )?;
        let gateway_calls = IntCounterVec::new(
            Opts::new(
                "mcp_gateway_gateway_calls_total",
                "Total number of gateway target API calls",
            ),
            &["operation", "outcome"],
        )?;
        let requeues = IntCounterVec::new(
            Opts::new(
                "mcp_gateway_requeues_total",
                "Total number of reconciliation requeues",
            ),
            &["reason"],
        )?;
        let reconciliation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "mcp_gateway_reconciliation_duration_seconds",
                "Duration of reconciliation in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(reconciliation_errors.clone()))?;
        registry.register(Box::new(gateway_calls.clone()))?;
        registry.register(Box::new(requeues.clone()))?;
        registry.register(Box::new(reconciliation_duration.clone()))?;

        Ok(Self {
            reconciliations,
            reconciliation_errors,
            gateway_calls,
            requeues,
            reconciliation_duration,
        })
    }

    /// Metrics registered against a throwaway registry
    #[cfg(test)]
    pub fn unregistered() -> Self {
        Self::new(&Registry::new()).unwrap_or_else(|e| panic!("metrics: {e}"))
    }

    /// Count a reconciliation and record how long it took
    pub fn observe_reconciliation(&self, duration_secs: f64) {
        self.reconciliations.inc();
        self.reconciliation_duration.observe(duration_secs);
    }

    /// Count a reconciliation error by kind
    pub fn increment_error(&self, kind: &str) {
        self.reconciliation_errors.with_label_values(&[kind]).inc();
    }

    /// Count a gateway call by operation and outcome
    pub fn record_gateway_call(&self, operation: &str, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.gateway_calls
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Count a requeue by reason
    pub fn increment_requeue(&self, reason: &str) {
        self.requeues.with_label_values(&[reason]).inc();
    }

    /// Current gateway call count, for assertions
    #[cfg(test)]
    pub fn gateway_calls(&self, operation: &str, outcome: &str) -> u64 {
        self.gateway_calls
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Current requeue count, for assertions
    #[cfg(test)]
    pub fn requeues(&self, reason: &str) -> u64 {
        self.requeues.with_label_values(&[reason]).get()
    }
}

//! Controller settings loaded from environment variables.

use crate::error::ControllerError;
use std::time::Duration;

const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 10;
const DEFAULT_METRICS_PORT: u16 = 8080;
const DEFAULT_RECONCILE_CONCURRENCY: u16 = 3;

/// Runtime configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// AWS region; the SDK default chain decides when unset
    pub aws_region: Option<String>,
    /// Gateway used when an MCPServer does not name one
    pub default_gateway_id: Option<String>,
    /// Namespace to watch; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Poll interval while a target is settling
    pub requeue_interval: Duration,
    /// Port for /metrics, /healthz and /readyz
    pub metrics_port: u16,
    /// Bedrock AgentCore endpoint override
    pub agentcore_endpoint: Option<String>,
    /// Maximum concurrent reconciliations
    pub reconcile_concurrency: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aws_region: None,
            default_gateway_id: None,
            watch_namespace: None,
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_INTERVAL_SECS),
            metrics_port: DEFAULT_METRICS_PORT,
            agentcore_endpoint: None,
            reconcile_concurrency: DEFAULT_RECONCILE_CONCURRENCY,
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let requeue_secs: u64 = parse_or(get("REQUEUE_INTERVAL_SECS"), "REQUEUE_INTERVAL_SECS", DEFAULT_REQUEUE_INTERVAL_SECS)?;
        if requeue_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "REQUEUE_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        let reconcile_concurrency = parse_or(
            get("RECONCILE_CONCURRENCY"),
            "RECONCILE_CONCURRENCY",
            DEFAULT_RECONCILE_CONCURRENCY,
        )?;
        if reconcile_concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            aws_region: get("AWS_REGION"),
            default_gateway_id: get("DEFAULT_GATEWAY_ID"),
            watch_namespace: get("WATCH_NAMESPACE"),
            requeue_interval: Duration::from_secs(requeue_secs),
            metrics_port: parse_or(get("METRICS_PORT"), "METRICS_PORT", DEFAULT_METRICS_PORT)?,
            agentcore_endpoint: get("BEDROCK_AGENTCORE_ENDPOINT"),
            reconcile_concurrency,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, ControllerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| ControllerError::InvalidConfig(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.requeue_interval, Duration::from_secs(10));
        assert_eq!(settings.metrics_port, 8080);
        assert_eq!(settings.reconcile_concurrency, 3);
    }

    #[test]
    fn test_reads_all_values() {
        let settings = Settings::from_lookup(lookup(&[
            ("AWS_REGION", "eu-west-1"),
            ("DEFAULT_GATEWAY_ID", "gw-default"),
            ("WATCH_NAMESPACE", "mcp"),
            ("REQUEUE_INTERVAL_SECS", "30"),
            ("METRICS_PORT", "9090"),
            ("BEDROCK_AGENTCORE_ENDPOINT", "http://localhost:4566"),
            ("RECONCILE_CONCURRENCY", "8"),
        ]))
        .unwrap();

        assert_eq!(settings.aws_region.as_deref(), Some("eu-west-1"));
        assert_eq!(settings.default_gateway_id.as_deref(), Some("gw-default"));
        assert_eq!(settings.watch_namespace.as_deref(), Some("mcp"));
        assert_eq!(settings.requeue_interval, Duration::from_secs(30));
        assert_eq!(settings.metrics_port, 9090);
        assert_eq!(settings.agentcore_endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(settings.reconcile_concurrency, 8);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings = Settings::from_lookup(lookup(&[("DEFAULT_GATEWAY_ID", "  ")])).unwrap();
        assert!(settings.default_gateway_id.is_none());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = Settings::from_lookup(lookup(&[("METRICS_PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("METRICS_PORT"));

        let err = Settings::from_lookup(lookup(&[("REQUEUE_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }
}

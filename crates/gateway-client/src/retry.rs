//! Retrying gateway client
//!
//! Wraps a [`GatewayClientTrait`] with exponential backoff for mutating
//! calls, idempotency tokens for create, idempotent delete and cancellation.
//! `get_target` is never retried; the controller's own requeue cadence
//! covers transient polling failures.

use crate::error::GatewayError;
use crate::gateway_trait::GatewayClientTrait;
use crate::models::{CreateTargetRequest, CreatedTarget, TargetState, UpdateTargetRequest};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Backoff schedule for retryable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single wait
    pub max_backoff: Duration,
    /// Growth factor between waits
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait following `current`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(self.multiplier).min(self.max_backoff)
    }

    /// The full sequence of waits, one per retry.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.initial_backoff.min(self.max_backoff);
        for _ in 0..self.max_retries {
            delays.push(delay);
            delay = self.next_backoff(delay);
        }
        delays
    }
}

/// Gateway client applying [`RetryPolicy`] and honouring cancellation.
pub struct RetryingGatewayClient {
    inner: Box<dyn GatewayClientTrait>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RetryingGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingGatewayClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryingGatewayClient {
    /// Wrap a raw client
    pub fn new(inner: Box<dyn GatewayClientTrait>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The active retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Create a target.
    ///
    /// A UUID v4 idempotency token is attached when the request carries none;
    /// every retry of this call reuses the same token.
    pub async fn create_target(
        &self,
        mut request: CreateTargetRequest,
        cancel: &CancellationToken,
    ) -> Result<CreatedTarget, GatewayError> {
        if request.client_token.is_none() {
            let token = uuid::Uuid::new_v4().to_string();
            debug!(client_token = %token, "Generated client token for idempotency");
            request.client_token = Some(token);
        }

        let inner = self.inner.as_ref();
        let request = &request;
        let created = self
            .with_retry("CreateGatewayTarget", cancel, move || inner.create_target(request.clone()))
            .await?;
        info!(
            target_id = %created.target_id,
            status = %created.status,
            "Successfully created gateway target"
        );
        Ok(created)
    }

    /// Fetch target state with a single attempt.
    pub async fn get_target(
        &self,
        gateway_id: &str,
        target_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TargetState, GatewayError> {
        let state = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = self.inner.get_target(gateway_id, target_id) => result,
        }
        .inspect_err(|e| warn!(gateway_id, target_id, error = %e, "Failed to get gateway target"))?;
        debug!(target_id, status = %state.status, "Retrieved gateway target");
        Ok(state)
    }

    /// Update a target
    pub async fn update_target(
        &self,
        request: UpdateTargetRequest,
        cancel: &CancellationToken,
    ) -> Result<TargetState, GatewayError> {
        let inner = self.inner.as_ref();
        let pending = &request;
        let state = self
            .with_retry("UpdateGatewayTarget", cancel, move || inner.update_target(pending.clone()))
            .await?;
        info!(
            target_id = %request.target_id,
            status = %state.status,
            "Successfully updated gateway target"
        );
        Ok(state)
    }

    /// Delete a target. A missing target counts as deleted.
    pub async fn delete_target(
        &self,
        gateway_id: &str,
        target_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GatewayError> {
        let inner = self.inner.as_ref();
        self.with_retry("DeleteGatewayTarget", cancel, move || async move {
            match inner.delete_target(gateway_id, target_id).await {
                Err(e) if e.is_not_found() => {
                    info!(gateway_id, target_id, "Gateway target not found, treating as deleted");
                    Ok(())
                }
                other => other,
            }
        })
        .await?;
        info!(gateway_id, target_id, "Successfully deleted gateway target");
        Ok(())
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt: u32 = 0;
        let mut backoff = self.policy.initial_backoff.min(self.policy.max_backoff);

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(GatewayError::Cancelled),
                result = call() => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                if !err.is_cancelled() {
                    error!(operation, error = %err, "Non-retryable gateway error");
                }
                return Err(err);
            }

            if attempt >= self.policy.max_retries {
                error!(operation, attempts = attempt + 1, error = %err, "Gateway retries exhausted");
                return Err(GatewayError::RetriesExhausted {
                    operation,
                    attempts: attempt + 1,
                    source: Box::new(err),
                });
            }

            warn!(
                operation,
                attempt,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Retryable gateway error, backing off"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(GatewayError::Cancelled),
                () = tokio::time::sleep(backoff) => {}
            }

            attempt += 1;
            backoff = self.policy.next_backoff(backoff);
        }
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_doubles_from_one_second() {
        let schedule = RetryPolicy::default().schedule();
        assert_eq!(
            schedule,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_schedule_is_capped() {
        let policy = RetryPolicy {
            max_retries: 7,
            ..RetryPolicy::default()
        };
        let schedule = policy.schedule();
        assert_eq!(schedule.len(), 7);
        assert_eq!(schedule[4], Duration::from_secs(16));
        assert_eq!(schedule[5], Duration::from_secs(30));
        assert_eq!(schedule[6], Duration::from_secs(30));
    }

    #[test]
    fn test_disabled_policy_has_no_waits() {
        assert!(RetryPolicy::disabled().schedule().is_empty());
    }
}

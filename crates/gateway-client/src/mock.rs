//! Mock GatewayClient for unit testing
//!
//! Keeps targets in memory, records every call with the (tokio) time it was
//! made and can be scripted to fail the next calls of an operation.

use crate::error::GatewayError;
use crate::gateway_trait::GatewayClientTrait;
use crate::models::{CreateTargetRequest, CreatedTarget, TargetState, UpdateTargetRequest};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

/// Status reported by the mock right after create.
pub const MOCK_CREATING: &str = "CREATING";
/// Status reported by the mock right after update.
pub const MOCK_UPDATING: &str = "UPDATING";

/// Gateway operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    /// CreateGatewayTarget
    Create,
    /// GetGatewayTarget
    Get,
    /// UpdateGatewayTarget
    Update,
    /// DeleteGatewayTarget
    Delete,
}

/// A call received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// Create with its full request
    Create(CreateTargetRequest),
    /// Get of one target
    Get {
        /// Gateway identifier
        gateway_id: String,
        /// Target identifier
        target_id: String,
    },
    /// Update with its full request
    Update(UpdateTargetRequest),
    /// Delete of one target
    Delete {
        /// Gateway identifier
        gateway_id: String,
        /// Target identifier
        target_id: String,
    },
}

impl RecordedCall {
    /// The operation this call invoked
    pub fn operation(&self) -> GatewayOperation {
        match self {
            Self::Create(_) => GatewayOperation::Create,
            Self::Get { .. } => GatewayOperation::Get,
            Self::Update(_) => GatewayOperation::Update,
            Self::Delete { .. } => GatewayOperation::Delete,
        }
    }
}

#[derive(Debug, Clone)]
struct MockTarget {
    gateway_id: String,
    state: TargetState,
}

/// Mock GatewayClient for testing
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockGatewayClient {
    targets: Arc<Mutex<HashMap<String, MockTarget>>>,
    client_tokens: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<(RecordedCall, Instant)>>>,
    scripted_errors: Arc<Mutex<HashMap<GatewayOperation, VecDeque<GatewayError>>>>,
    next_id: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(target_id: &str) -> GatewayError {
    GatewayError::api("ResourceNotFoundException", format!("target {target_id} not found"))
}

/// ARN the mock reports for a gateway
pub fn mock_gateway_arn(gateway_id: &str) -> String {
    format!("arn:aws:bedrock-agentcore:us-east-1:123456789012:gateway/{gateway_id}")
}

impl MockGatewayClient {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail with `error`. Queued errors
    /// are consumed in order.
    pub fn fail_next(&self, operation: GatewayOperation, error: GatewayError) {
        lock(&self.scripted_errors)
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Seed a target (for test setup)
    pub fn insert_target(&self, gateway_id: &str, target_id: &str, status: &str) {
        lock(&self.targets).insert(
            target_id.to_string(),
            MockTarget {
                gateway_id: gateway_id.to_string(),
                state: TargetState {
                    status: status.to_string(),
                    status_reasons: Vec::new(),
                },
            },
        );
    }

    /// Change the lifecycle status the gateway reports for a target
    pub fn set_target_status(&self, target_id: &str, status: &str, reasons: Vec<String>) {
        if let Some(target) = lock(&self.targets).get_mut(target_id) {
            target.state = TargetState {
                status: status.to_string(),
                status_reasons: reasons,
            };
        }
    }

    /// Current state of a stored target
    pub fn target(&self, target_id: &str) -> Option<TargetState> {
        lock(&self.targets).get(target_id).map(|t| t.state.clone())
    }

    /// Number of stored targets
    pub fn target_count(&self) -> usize {
        lock(&self.targets).len()
    }

    /// All calls received, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).iter().map(|(call, _)| call.clone()).collect()
    }

    /// Number of calls made to `operation`
    pub fn call_count(&self, operation: GatewayOperation) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(call, _)| call.operation() == operation)
            .count()
    }

    /// Times at which `operation` was called
    pub fn call_times(&self, operation: GatewayOperation) -> Vec<Instant> {
        lock(&self.calls)
            .iter()
            .filter(|(call, _)| call.operation() == operation)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: RecordedCall) -> Result<(), GatewayError> {
        let operation = call.operation();
        lock(&self.calls).push((call, Instant::now()));
        match lock(&self.scripted_errors)
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl GatewayClientTrait for MockGatewayClient {
    async fn create_target(&self, request: CreateTargetRequest) -> Result<CreatedTarget, GatewayError> {
        self.record(RecordedCall::Create(request.clone()))?;

        let gateway_arn = mock_gateway_arn(&request.gateway_id);
        if let Some(token) = &request.client_token
            && let Some(existing) = lock(&self.client_tokens).get(token).cloned()
            && let Some(target) = lock(&self.targets).get(&existing)
        {
            return Ok(CreatedTarget {
                target_id: existing,
                gateway_arn,
                status: target.state.status.clone(),
            });
        }

        let target_id = {
            let mut next_id = lock(&self.next_id);
            *next_id += 1;
            format!("target-{}", *next_id)
        };
        self.insert_target(&request.gateway_id, &target_id, MOCK_CREATING);
        if let Some(token) = request.client_token {
            lock(&self.client_tokens).insert(token, target_id.clone());
        }

        Ok(CreatedTarget {
            target_id,
            gateway_arn,
            status: MOCK_CREATING.to_string(),
        })
    }

    async fn get_target(&self, gateway_id: &str, target_id: &str) -> Result<TargetState, GatewayError> {
        self.record(RecordedCall::Get {
            gateway_id: gateway_id.to_string(),
            target_id: target_id.to_string(),
        })?;

        lock(&self.targets)
            .get(target_id)
            .filter(|t| t.gateway_id == gateway_id)
            .map(|t| t.state.clone())
            .ok_or_else(|| not_found(target_id))
    }

    async fn update_target(&self, request: UpdateTargetRequest) -> Result<TargetState, GatewayError> {
        self.record(RecordedCall::Update(request.clone()))?;

        let mut targets = lock(&self.targets);
        let target = targets
            .get_mut(&request.target_id)
            .filter(|t| t.gateway_id == request.gateway_id)
            .ok_or_else(|| not_found(&request.target_id))?;
        target.state = TargetState {
            status: MOCK_UPDATING.to_string(),
            status_reasons: Vec::new(),
        };
        Ok(target.state.clone())
    }

    async fn delete_target(&self, gateway_id: &str, target_id: &str) -> Result<(), GatewayError> {
        self.record(RecordedCall::Delete {
            gateway_id: gateway_id.to_string(),
            target_id: target_id.to_string(),
        })?;

        let mut targets = lock(&self.targets);
        match targets.get(target_id) {
            Some(t) if t.gateway_id == gateway_id => {
                targets.remove(target_id);
                Ok(())
            }
            _ => Err(not_found(target_id)),
        }
    }
}

//! GatewayClient trait for mocking
//!
//! The concrete AWS client implements this trait; tests use
//! `MockGatewayClient` behind the `test-util` feature.

use crate::error::GatewayError;
use crate::models::{CreateTargetRequest, CreatedTarget, TargetState, UpdateTargetRequest};

/// Raw gateway target operations, one remote call each.
///
/// Implementations do not retry; see [`crate::RetryingGatewayClient`].
#[async_trait::async_trait]
pub trait GatewayClientTrait: Send + Sync {
    /// Create a gateway target
    async fn create_target(&self, request: CreateTargetRequest) -> Result<CreatedTarget, GatewayError>;

    /// Fetch the current state of a target
    async fn get_target(&self, gateway_id: &str, target_id: &str) -> Result<TargetState, GatewayError>;

    /// Replace the configuration of a target
    async fn update_target(&self, request: UpdateTargetRequest) -> Result<TargetState, GatewayError>;

    /// Delete a target
    async fn delete_target(&self, gateway_id: &str, target_id: &str) -> Result<(), GatewayError>;
}

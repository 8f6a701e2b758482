//! MCPServer Custom Resource Definition
//!
//! Declares an external MCP server that should be registered as a target
//! on an AWS Bedrock AgentCore gateway.

use crate::condition::{find_condition, Condition, CONDITION_READY};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Finalizer attached before any remote mutation; blocks deletion until the
/// gateway target has been cleaned up.
pub const FINALIZER: &str = "bedrock.aws/gateway-target-finalizer";

/// Remote lifecycle status meaning the target is fully operational.
pub const TARGET_STATUS_READY: &str = "READY";

/// Authentication type requiring no credentials beyond the gateway's role.
pub const AUTH_TYPE_NO_AUTH: &str = "NoAuth";

/// Authentication type backed by an OAuth2 credential provider.
pub const AUTH_TYPE_OAUTH2: &str = "OAuth2";

/// MCPServerSpec defines the desired gateway target
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "mcpgateway.bedrock.aws",
    version = "v1alpha1",
    kind = "MCPServer",
    namespaced,
    status = "MCPServerStatus",
    shortname = "mcps",
    printcolumn = r#"{"name":"Endpoint","type":"string","jsonPath":".spec.endpoint"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.targetStatus"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MCPServerSpec {
    /// HTTPS endpoint of the MCP server
    pub endpoint: String,

    /// Protocol capabilities offered by the server; must include "tools"
    pub capabilities: Vec<String>,

    /// Gateway identifier (falls back to the controller's default gateway)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,

    /// Display name of the target (defaults to the resource name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,

    /// Description of the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Authentication type: "NoAuth" (default) or "OAuth2"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,

    /// OAuth2 credential provider ARN (required when authType is OAuth2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_provider_arn: Option<String>,

    /// OAuth2 scopes requested from the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_scopes: Option<Vec<String>>,

    /// Request headers propagated to the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_request_headers: Option<Vec<String>>,

    /// Query parameters propagated to the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_query_parameters: Option<Vec<String>>,

    /// Response headers propagated back to the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_response_headers: Option<Vec<String>>,
}

/// MCPServerStatus defines the observed state of the gateway target
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MCPServerStatus {
    /// Spec generation last acted on by the controller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Gateway target ID (set after creation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,

    /// ARN of the gateway owning the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_arn: Option<String>,

    /// Remote lifecycle status (CREATING, READY, FAILED, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_status: Option<String>,

    /// Reasons reported by the gateway for the current status
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_reasons: Vec<String>,

    /// Last time the status was synchronized with the gateway
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synchronized: Option<chrono::DateTime<chrono::Utc>>,

    /// Conditions; only "Ready" is managed
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl MCPServerStatus {
    /// Recorded target ID, ignoring empty strings.
    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns the Ready condition if one has been recorded.
    pub fn ready_condition(&self) -> Option<&Condition> {
        find_condition(&self.conditions, CONDITION_READY)
    }

    /// Returns true if the last observed remote status is READY.
    pub fn is_target_ready(&self) -> bool {
        self.target_status.as_deref() == Some(TARGET_STATUS_READY)
    }
}

impl MCPServer {
    /// Recorded target ID, if any.
    pub fn target_id(&self) -> Option<&str> {
        self.status.as_ref().and_then(MCPServerStatus::target_id)
    }

    /// Generation last acted on, if any.
    pub fn observed_generation(&self) -> Option<i64> {
        self.status.as_ref().and_then(|s| s.observed_generation)
    }

    /// Returns true once the store has marked the resource for deletion.
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Returns true if the given finalizer is attached.
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == finalizer))
    }
}

//! Gateway target request and response models
//!
//! Closed variants stand in for the SDK's open-ended request shapes; only the
//! controller's request builder constructs them.

/// What the gateway target points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetConfiguration {
    /// An MCP server reachable over HTTPS
    McpServer {
        /// Endpoint URL, passed through unmodified
        endpoint: String,
    },
}

impl TargetConfiguration {
    /// MCP server target for the given endpoint.
    pub fn mcp_server(endpoint: impl Into<String>) -> Self {
        Self::McpServer {
            endpoint: endpoint.into(),
        }
    }
}

/// OAuth2 grant used by the gateway when calling the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OAuthGrantType {
    /// Client credentials flow
    #[default]
    ClientCredentials,
}

/// How the gateway authenticates outbound calls to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialConfiguration {
    /// Use the gateway's own IAM role
    GatewayIamRole,
    /// Use an OAuth2 credential provider
    OAuth {
        /// Credential provider ARN
        provider_arn: String,
        /// Requested scopes
        scopes: Vec<String>,
        /// Grant type
        grant_type: OAuthGrantType,
    },
}

/// Headers and query parameters the gateway propagates.
///
/// Callers hold an `Option<MetadataConfiguration>`; `None` means propagation
/// is not configured at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataConfiguration {
    /// Request headers forwarded to the target
    pub allowed_request_headers: Vec<String>,
    /// Query parameters forwarded to the target
    pub allowed_query_parameters: Vec<String>,
    /// Response headers returned to the caller
    pub allowed_response_headers: Vec<String>,
}

/// Input for creating a gateway target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTargetRequest {
    /// Gateway identifier
    pub gateway_id: String,
    /// Target display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Target configuration
    pub target: TargetConfiguration,
    /// Credential configuration
    pub credentials: CredentialConfiguration,
    /// Metadata propagation, omitted when `None`
    pub metadata: Option<MetadataConfiguration>,
    /// Idempotency token; generated when `None`
    pub client_token: Option<String>,
}

/// Input for updating an existing gateway target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTargetRequest {
    /// Gateway identifier
    pub gateway_id: String,
    /// Target identifier
    pub target_id: String,
    /// Target display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Target configuration
    pub target: TargetConfiguration,
    /// Credential configuration
    pub credentials: CredentialConfiguration,
    /// Metadata propagation, omitted when `None`
    pub metadata: Option<MetadataConfiguration>,
}

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTarget {
    /// Identifier assigned by the gateway
    pub target_id: String,
    /// ARN of the owning gateway
    pub gateway_arn: String,
    /// Lifecycle status right after creation
    pub status: String,
}

/// Observed lifecycle state of a target
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetState {
    /// Lifecycle status (CREATING, READY, FAILED, ...)
    pub status: String,
    /// Reasons attached to the status
    pub status_reasons: Vec<String>,
}

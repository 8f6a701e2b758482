//! MCPServer spec validation.
//!
//! `ConfigParser` turns a loosely typed spec into a [`ValidatedConfig`]. It is
//! pure: no remote calls, no store access. The controller-wide default gateway
//! is injected at construction.

use crds::{MCPServer, MCPServerSpec, AUTH_TYPE_NO_AUTH, AUTH_TYPE_OAUTH2};
use thiserror::Error;

/// Capability every target must offer.
pub const REQUIRED_CAPABILITY: &str = "tools";

const HTTPS_PREFIX: &str = "https://";

/// Spec validation failures. Each names the offending field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Endpoint is empty
    #[error("invalid endpoint: endpoint is required")]
    MissingEndpoint,

    /// Endpoint is not HTTPS
    #[error("invalid endpoint: endpoint must match pattern ^https://.* (got: {0})")]
    InsecureEndpoint(String),

    /// Capabilities list is empty
    #[error("invalid capabilities: capabilities are required and must include 'tools'")]
    MissingCapabilities,

    /// Capabilities list lacks "tools"
    #[error("invalid capabilities: capabilities must include 'tools' (got: {0:?})")]
    MissingToolsCapability(Vec<String>),

    /// OAuth2 without a provider ARN
    #[error("oauthProviderArn is required when authType is OAuth2")]
    MissingOAuthProvider,

    /// Unknown auth type
    #[error("unsupported authType: {0} (must be NoAuth or OAuth2)")]
    UnsupportedAuthType(String),

    /// gatewayId is whitespace only
    #[error("gateway ID not available: gatewayId cannot be empty")]
    BlankGatewayId,

    /// Neither spec nor controller provide a gateway
    #[error("gateway ID not available: no gatewayId specified in spec and no default gateway ID configured")]
    MissingGatewayId,
}

impl ValidationError {
    /// Spec field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingEndpoint | Self::InsecureEndpoint(_) => "endpoint",
            Self::MissingCapabilities | Self::MissingToolsCapability(_) => "capabilities",
            Self::MissingOAuthProvider => "oauthProviderArn",
            Self::UnsupportedAuthType(_) => "authType",
            Self::BlankGatewayId | Self::MissingGatewayId => "gatewayId",
        }
    }
}

/// Authentication scheme for the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// Gateway IAM role, no extra credentials
    NoAuth,
    /// OAuth2 credential provider
    OAuth2,
}

/// Validated authentication settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Scheme
    pub auth_type: AuthType,
    /// Provider ARN, set for OAuth2
    pub provider_arn: Option<String>,
    /// Scopes passed through verbatim
    pub scopes: Vec<String>,
}

/// Metadata propagation lists that were present in the spec
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataConfig {
    /// Allowed request headers
    pub allowed_request_headers: Option<Vec<String>>,
    /// Allowed query parameters
    pub allowed_query_parameters: Option<Vec<String>>,
    /// Allowed response headers
    pub allowed_response_headers: Option<Vec<String>>,
}

/// A spec that passed validation, with defaults resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    /// HTTPS endpoint
    pub endpoint: String,
    /// Capabilities, includes "tools"
    pub capabilities: Vec<String>,
    /// Authentication
    pub auth: AuthConfig,
    /// Metadata propagation; `None` when no list was given
    pub metadata: Option<MetadataConfig>,
    /// Resolved gateway
    pub gateway_id: String,
    /// Resolved display name
    pub target_name: String,
    /// Optional description
    pub description: Option<String>,
}

/// Validates MCPServer specs
#[derive(Debug, Clone, Default)]
pub struct ConfigParser {
    default_gateway_id: Option<String>,
}

impl ConfigParser {
    /// Create a parser falling back to `default_gateway_id`
    pub fn new(default_gateway_id: Option<String>) -> Self {
        Self {
            default_gateway_id: default_gateway_id.filter(|id| !id.trim().is_empty()),
        }
    }

    /// Validate a resource's spec and resolve defaults.
    pub fn parse(&self, resource: &MCPServer) -> Result<ValidatedConfig, ValidationError> {
        let spec = &resource.spec;
        let endpoint = parse_endpoint(&spec.endpoint)?;
        parse_capabilities(&spec.capabilities)?;
        let auth = parse_auth(spec)?;
        let gateway_id = self.resolve_gateway_id(spec)?;

        let target_name = spec
            .target_name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| resource.metadata.name.clone())
            .unwrap_or_default();

        Ok(ValidatedConfig {
            endpoint,
            capabilities: spec.capabilities.clone(),
            auth,
            metadata: parse_metadata(spec),
            gateway_id,
            target_name,
            description: spec.description.clone().filter(|d| !d.is_empty()),
        })
    }

    /// Gateway from the spec (trimmed), else the controller default.
    ///
    /// An empty `gatewayId` counts as unset; a whitespace-only one is an error.
    pub fn resolve_gateway_id(&self, spec: &MCPServerSpec) -> Result<String, ValidationError> {
        match spec.gateway_id.as_deref() {
            Some(raw) if !raw.is_empty() => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Err(ValidationError::BlankGatewayId)
                } else {
                    Ok(trimmed.to_string())
                }
            }
            _ => self
                .default_gateway_id
                .clone()
                .ok_or(ValidationError::MissingGatewayId),
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<String, ValidationError> {
    if endpoint.is_empty() {
        return Err(ValidationError::MissingEndpoint);
    }
    if !endpoint.starts_with(HTTPS_PREFIX) {
        return Err(ValidationError::InsecureEndpoint(endpoint.to_string()));
    }
    Ok(endpoint.to_string())
}

fn parse_capabilities(capabilities: &[String]) -> Result<(), ValidationError> {
    if capabilities.is_empty() {
        return Err(ValidationError::MissingCapabilities);
    }
    if !capabilities.iter().any(|c| c == REQUIRED_CAPABILITY) {
        return Err(ValidationError::MissingToolsCapability(capabilities.to_vec()));
    }
    Ok(())
}

fn parse_auth(spec: &MCPServerSpec) -> Result<AuthConfig, ValidationError> {
    match spec.auth_type.as_deref().filter(|t| !t.is_empty()) {
        None | Some(AUTH_TYPE_NO_AUTH) => Ok(AuthConfig {
            auth_type: AuthType::NoAuth,
            provider_arn: None,
            scopes: Vec::new(),
        }),
        Some(AUTH_TYPE_OAUTH2) => {
            let provider_arn = spec
                .oauth_provider_arn
                .clone()
                .filter(|arn| !arn.is_empty())
                .ok_or(ValidationError::MissingOAuthProvider)?;
            Ok(AuthConfig {
                auth_type: AuthType::OAuth2,
                provider_arn: Some(provider_arn),
                scopes: spec.oauth_scopes.clone().unwrap_or_default(),
            })
        }
        Some(other) => Err(ValidationError::UnsupportedAuthType(other.to_string())),
    }
}

fn parse_metadata(spec: &MCPServerSpec) -> Option<MetadataConfig> {
    let metadata = MetadataConfig {
        allowed_request_headers: spec.allowed_request_headers.clone(),
        allowed_query_parameters: spec.allowed_query_parameters.clone(),
        allowed_response_headers: spec.allowed_response_headers.clone(),
    };
    (metadata != MetadataConfig::default()).then_some(metadata)
}

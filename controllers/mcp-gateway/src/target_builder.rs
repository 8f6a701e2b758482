//! Gateway target request builder.
//!
//! Maps a [`ValidatedConfig`] onto the gateway client's request fragments.
//! This is the only place the closed credential and metadata variants are
//! constructed.

use crate::validation::{AuthType, ValidatedConfig};
use gateway_client::{
    CreateTargetRequest, CredentialConfiguration, MetadataConfiguration, OAuthGrantType,
    TargetConfiguration, UpdateTargetRequest,
};
use thiserror::Error;

/// Internal invariant violations while building a request.
///
/// These indicate a bug upstream of the builder and are never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Endpoint missing after validation
    #[error("endpoint is required")]
    MissingEndpoint,

    /// Target name could not be resolved
    #[error("target name is required")]
    MissingTargetName,

    /// OAuth2 selected without a provider
    #[error("oauthProviderArn is required when authType is OAuth2")]
    MissingOAuthProvider,

    /// Update requested without a target
    #[error("target ID is required for update")]
    MissingTargetId,
}

/// Builds gateway target requests
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetRequestBuilder;

impl TargetRequestBuilder {
    /// Target configuration carrying the endpoint verbatim
    pub fn build_target(&self, config: &ValidatedConfig) -> Result<TargetConfiguration, ConfigurationError> {
        if config.endpoint.is_empty() {
            return Err(ConfigurationError::MissingEndpoint);
        }
        Ok(TargetConfiguration::mcp_server(config.endpoint.clone()))
    }

    /// Credential configuration for the auth type
    pub fn build_credentials(&self, config: &ValidatedConfig) -> Result<CredentialConfiguration, ConfigurationError> {
        match config.auth.auth_type {
            AuthType::NoAuth => Ok(CredentialConfiguration::GatewayIamRole),
            AuthType::OAuth2 => {
                let provider_arn = config
                    .auth
                    .provider_arn
                    .clone()
                    .filter(|arn| !arn.is_empty())
                    .ok_or(ConfigurationError::MissingOAuthProvider)?;
                Ok(CredentialConfiguration::OAuth {
                    provider_arn,
                    scopes: config.auth.scopes.clone(),
                    grant_type: OAuthGrantType::ClientCredentials,
                })
            }
        }
    }

    /// Metadata configuration, or `None` when no list has entries.
    pub fn build_metadata(&self, config: &ValidatedConfig) -> Option<MetadataConfiguration> {
        let metadata = config.metadata.as_ref()?;
        let configuration = MetadataConfiguration {
            allowed_request_headers: metadata.allowed_request_headers.clone().unwrap_or_default(),
            allowed_query_parameters: metadata.allowed_query_parameters.clone().unwrap_or_default(),
            allowed_response_headers: metadata.allowed_response_headers.clone().unwrap_or_default(),
        };
        let populated = !configuration.allowed_request_headers.is_empty()
            || !configuration.allowed_query_parameters.is_empty()
            || !configuration.allowed_response_headers.is_empty();
        populated.then_some(configuration)
    }

    /// Full create request; the idempotency token is left to the client.
    pub fn create_request(&self, config: &ValidatedConfig) -> Result<CreateTargetRequest, ConfigurationError> {
        Ok(CreateTargetRequest {
            gateway_id: config.gateway_id.clone(),
            name: target_name(config)?,
            description: config.description.clone(),
            target: self.build_target(config)?,
            credentials: self.build_credentials(config)?,
            metadata: self.build_metadata(config),
            client_token: None,
        })
    }

    /// Full update request for an existing target
    pub fn update_request(
        &self,
        config: &ValidatedConfig,
        target_id: &str,
    ) -> Result<UpdateTargetRequest, ConfigurationError> {
        if target_id.is_empty() {
            return Err(ConfigurationError::MissingTargetId);
        }
        Ok(UpdateTargetRequest {
            gateway_id: config.gateway_id.clone(),
            target_id: target_id.to_string(),
            name: target_name(config)?,
            description: config.description.clone(),
            target: self.build_target(config)?,
            credentials: self.build_credentials(config)?,
            metadata: self.build_metadata(config),
        })
    }
}

fn target_name(config: &ValidatedConfig) -> Result<String, ConfigurationError> {
    if config.target_name.is_empty() {
        return Err(ConfigurationError::MissingTargetName);
    }
    Ok(config.target_name.clone())
}

//! AWS Bedrock AgentCore gateway client
//!
//! Maps the crate's request models onto `aws-sdk-bedrockagentcorecontrol`
//! and SDK failures onto [`GatewayError`].

use crate::error::GatewayError;
use crate::gateway_trait::GatewayClientTrait;
use crate::models::{
    CreateTargetRequest, CreatedTarget, CredentialConfiguration, MetadataConfiguration, OAuthGrantType,
    TargetConfiguration, TargetState, UpdateTargetRequest,
};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockagentcorecontrol::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockagentcorecontrol::types as sdk;
use aws_sdk_bedrockagentcorecontrol::Client;
use tracing::{debug, info};

/// Gateway client backed by the AWS SDK
#[derive(Clone)]
pub struct BedrockGatewayClient {
    client: Client,
}

impl std::fmt::Debug for BedrockGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockGatewayClient").finish_non_exhaustive()
    }
}

impl BedrockGatewayClient {
    /// Wrap an already configured SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential chain.
    ///
    /// `region` overrides the chain's region; `endpoint_url` routes calls to
    /// an alternative endpoint such as a local mock server.
    pub async fn from_env(region: Option<String>, endpoint_url: Option<String>) -> Self {
        let mut builder = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            info!(%region, "Using configured AWS region");
            builder = builder.region(Region::new(region));
        }
        if let Some(endpoint) = endpoint_url {
            info!(%endpoint, "Routing Bedrock AgentCore requests to endpoint override");
            builder = builder.endpoint_url(endpoint);
        }
        let sdk_config = builder.load().await;
        Self::new(Client::new(&sdk_config))
    }
}

fn to_sdk_target(target: &TargetConfiguration) -> Result<sdk::TargetConfiguration, GatewayError> {
    match target {
        TargetConfiguration::McpServer { endpoint } => {
            let server = sdk::McpServerTargetConfiguration::builder()
                .endpoint(endpoint)
                .build()
                .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
            Ok(sdk::TargetConfiguration::Mcp(sdk::McpTargetConfiguration::McpServer(server)))
        }
    }
}

fn to_sdk_grant_type(grant_type: OAuthGrantType) -> sdk::OAuthGrantType {
    match grant_type {
        OAuthGrantType::ClientCredentials => sdk::OAuthGrantType::ClientCredentials,
    }
}

fn to_sdk_credentials(
    credentials: &CredentialConfiguration,
) -> Result<sdk::CredentialProviderConfiguration, GatewayError> {
    let builder = match credentials {
        CredentialConfiguration::GatewayIamRole => sdk::CredentialProviderConfiguration::builder()
            .credential_provider_type(sdk::CredentialProviderType::GatewayIamRole),
        CredentialConfiguration::OAuth {
            provider_arn,
            scopes,
            grant_type,
        } => {
            let provider = sdk::OAuthCredentialProvider::builder()
                .provider_arn(provider_arn)
                .set_scopes(Some(scopes.clone()))
                .grant_type(to_sdk_grant_type(*grant_type))
                .build()
                .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
            sdk::CredentialProviderConfiguration::builder()
                .credential_provider_type(sdk::CredentialProviderType::Oauth)
                .credential_provider(sdk::CredentialProvider::OauthCredentialProvider(provider))
        }
    };
    builder
        .build()
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() { None } else { Some(values.to_vec()) }
}

fn to_sdk_metadata(metadata: &MetadataConfiguration) -> sdk::MetadataConfiguration {
    sdk::MetadataConfiguration::builder()
        .set_allowed_request_headers(non_empty(&metadata.allowed_request_headers))
        .set_allowed_query_parameters(non_empty(&metadata.allowed_query_parameters))
        .set_allowed_response_headers(non_empty(&metadata.allowed_response_headers))
        .build()
}

/// Converts an SDK failure into a classified [`GatewayError`].
fn map_sdk_error<E, R>(operation: &'static str, err: &SdkError<E, R>) -> GatewayError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(err).to_string();
    debug!(operation, error = %detail, "Bedrock AgentCore call failed");
    match err {
        SdkError::ServiceError(context) => {
            let service_err = context.err();
            GatewayError::api(
                service_err.code().unwrap_or("Unknown"),
                service_err.message().unwrap_or(detail.as_str()),
            )
        }
        SdkError::ConstructionFailure(_) => GatewayError::InvalidRequest(detail),
        _ => GatewayError::Transport(detail),
    }
}

#[async_trait::async_trait]
impl GatewayClientTrait for BedrockGatewayClient {
    async fn create_target(&self, request: CreateTargetRequest) -> Result<CreatedTarget, GatewayError> {
        let output = self
            .client
            .create_gateway_target()
            .gateway_identifier(&request.gateway_id)
            .name(&request.name)
            .set_description(request.description.clone())
            .target_configuration(to_sdk_target(&request.target)?)
            .credential_provider_configurations(to_sdk_credentials(&request.credentials)?)
            .set_metadata_configuration(request.metadata.as_ref().map(to_sdk_metadata))
            .set_client_token(request.client_token.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateGatewayTarget", &e))?;

        Ok(CreatedTarget {
            target_id: output.target_id().to_string(),
            gateway_arn: output.gateway_arn().to_string(),
            status: output.status().as_str().to_string(),
        })
    }

    async fn get_target(&self, gateway_id: &str, target_id: &str) -> Result<TargetState, GatewayError> {
        let output = self
            .client
            .get_gateway_target()
            .gateway_identifier(gateway_id)
            .target_id(target_id)
            .send()
            .await
            .map_err(|e| map_sdk_error("GetGatewayTarget", &e))?;

        Ok(TargetState {
            status: output.status().as_str().to_string(),
            status_reasons: output.status_reasons().to_vec(),
        })
    }

    async fn update_target(&self, request: UpdateTargetRequest) -> Result<TargetState, GatewayError> {
        let output = self
            .client
            .update_gateway_target()
            .gateway_identifier(&request.gateway_id)
            .target_id(&request.target_id)
            .name(&request.name)
            .set_description(request.description.clone())
            .target_configuration(to_sdk_target(&request.target)?)
            .credential_provider_configurations(to_sdk_credentials(&request.credentials)?)
            .set_metadata_configuration(request.metadata.as_ref().map(to_sdk_metadata))
            .send()
            .await
            .map_err(|e| map_sdk_error("UpdateGatewayTarget", &e))?;

        Ok(TargetState {
            status: output.status().as_str().to_string(),
            status_reasons: output.status_reasons().to_vec(),
        })
    }

    async fn delete_target(&self, gateway_id: &str, target_id: &str) -> Result<(), GatewayError> {
        self.client
            .delete_gateway_target()
            .gateway_identifier(gateway_id)
            .target_id(target_id)
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteGatewayTarget", &e))?;
        Ok(())
    }
}

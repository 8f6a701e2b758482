//! Bedrock AgentCore Gateway Client
//!
//! Client library for managing MCP server targets on an AWS Bedrock
//! AgentCore gateway.
//!
//! # Example
//!
//! ```no_run
//! use gateway_client::{
//!     BedrockGatewayClient, CreateTargetRequest, CredentialConfiguration, RetryPolicy,
//!     RetryingGatewayClient, TargetConfiguration,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), gateway_client::GatewayError> {
//! let client = BedrockGatewayClient::from_env(Some("us-east-1".to_string()), None).await;
//! let client = RetryingGatewayClient::new(Box::new(client), RetryPolicy::default());
//!
//! let created = client
//!     .create_target(
//!         CreateTargetRequest {
//!             gateway_id: "gw-123".to_string(),
//!             name: "weather".to_string(),
//!             description: None,
//!             target: TargetConfiguration::mcp_server("https://weather.example/mcp"),
//!             credentials: CredentialConfiguration::GatewayIamRole,
//!             metadata: None,
//!             client_token: None,
//!         },
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("created target {}", created.target_id);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed requests**: closed variants for credentials and metadata
//! - **Error classification**: retryable, not-found and fatal outcomes
//! - **Retry Logic**: exponential backoff with idempotency tokens and cancellation

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod gateway_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod models;
pub mod retry;

pub use client::BedrockGatewayClient;
pub use error::{classify_code, ErrorClass, GatewayError};
pub use gateway_trait::GatewayClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{GatewayOperation, MockGatewayClient, RecordedCall};
pub use models::*;
pub use retry::{RetryPolicy, RetryingGatewayClient};

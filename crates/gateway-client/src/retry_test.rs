//! Tests for the retrying gateway client

use super::*;
use crate::mock::{GatewayOperation, MockGatewayClient, RecordedCall, MOCK_CREATING};
use crate::models::{CredentialConfiguration, TargetConfiguration};
use tokio::time::Instant;

fn create_request() -> CreateTargetRequest {
    CreateTargetRequest {
        gateway_id: "gw-1".to_string(),
        name: "weather".to_string(),
        description: None,
        target: TargetConfiguration::mcp_server("https://weather.example"),
        credentials: CredentialConfiguration::GatewayIamRole,
        metadata: None,
        client_token: None,
    }
}

fn update_request(target_id: &str) -> UpdateTargetRequest {
    UpdateTargetRequest {
        gateway_id: "gw-1".to_string(),
        target_id: target_id.to_string(),
        name: "weather".to_string(),
        description: Some("v2".to_string()),
        target: TargetConfiguration::mcp_server("https://weather.example/v2"),
        credentials: CredentialConfiguration::GatewayIamRole,
        metadata: None,
    }
}

fn client(mock: &MockGatewayClient) -> RetryingGatewayClient {
    RetryingGatewayClient::new(Box::new(mock.clone()), RetryPolicy::default())
}

fn throttled() -> GatewayError {
    GatewayError::api("ThrottlingException", "rate exceeded")
}

#[tokio::test(start_paused = true)]
async fn test_create_generates_client_token() {
    let mock = MockGatewayClient::new();
    let created = client(&mock)
        .create_target(create_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(created.status, MOCK_CREATING);
    match &mock.calls()[0] {
        RecordedCall::Create(request) => {
            let token = request.client_token.as_deref().unwrap();
            assert!(uuid::Uuid::parse_str(token).is_ok());
        }
        other => panic!("Expected create call, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_keeps_caller_token() {
    let mock = MockGatewayClient::new();
    let mut request = create_request();
    request.client_token = Some("caller-token".to_string());

    client(&mock)
        .create_target(request, &CancellationToken::new())
        .await
        .unwrap();

    match &mock.calls()[0] {
        RecordedCall::Create(request) => {
            assert_eq!(request.client_token.as_deref(), Some("caller-token"));
        }
        other => panic!("Expected create call, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_retries_reuse_the_same_token() {
    let mock = MockGatewayClient::new();
    mock.fail_next(GatewayOperation::Create, throttled());
    mock.fail_next(GatewayOperation::Create, throttled());

    client(&mock)
        .create_target(create_request(), &CancellationToken::new())
        .await
        .unwrap();

    let tokens: Vec<_> = mock
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::Create(request) => request.client_token,
            _ => None,
        })
        .collect();
    assert_eq!(tokens.len(), 3);
    assert!(tokens.iter().all(|t| *t == tokens[0]));
    assert_eq!(mock.target_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_throttling_retries_with_increasing_backoff() {
    let mock = MockGatewayClient::new();
    for _ in 0..4 {
        mock.fail_next(GatewayOperation::Create, throttled());
    }

    let start = Instant::now();
    let err = client(&mock)
        .create_target(create_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::RetriesExhausted { attempts: 4, .. }));
    assert!(err.is_retryable());

    let times = mock.call_times(GatewayOperation::Create);
    assert_eq!(times.len(), 4);
    assert_eq!(times[0] - start, Duration::ZERO);
    assert_eq!(times[1] - times[0], Duration::from_secs(1));
    assert_eq!(times[2] - times[1], Duration::from_secs(2));
    assert_eq!(times[3] - times[2], Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped() {
    let mock = MockGatewayClient::new();
    for _ in 0..4 {
        mock.fail_next(GatewayOperation::Update, throttled());
    }
    mock.insert_target("gw-1", "target-9", "READY");
    let policy = RetryPolicy {
        max_retries: 3,
        initial_backoff: Duration::from_secs(20),
        ..RetryPolicy::default()
    };
    let client = RetryingGatewayClient::new(Box::new(mock.clone()), policy);

    client
        .update_target(update_request("target-9"), &CancellationToken::new())
        .await
        .unwrap_err();

    let times = mock.call_times(GatewayOperation::Update);
    assert_eq!(times[1] - times[0], Duration::from_secs(20));
    assert_eq!(times[2] - times[1], Duration::from_secs(30));
    assert_eq!(times[3] - times[2], Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_validation_error_is_not_retried() {
    let mock = MockGatewayClient::new();
    mock.fail_next(
        GatewayOperation::Create,
        GatewayError::api("ValidationException", "bad endpoint"),
    );

    let err = client(&mock)
        .create_target(create_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Api { ref code, .. } if code == "ValidationException"));
    assert_eq!(mock.call_count(GatewayOperation::Create), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let mock = MockGatewayClient::new();
    mock.insert_target("gw-1", "target-1", "READY");
    mock.fail_next(
        GatewayOperation::Update,
        GatewayError::api("InternalServerException", "oops"),
    );

    let state = client(&mock)
        .update_target(update_request("target-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.status, "UPDATING");
    assert_eq!(mock.call_count(GatewayOperation::Update), 2);
}

#[tokio::test(start_paused = true)]
async fn test_get_is_not_retried() {
    let mock = MockGatewayClient::new();
    mock.insert_target("gw-1", "target-1", "READY");
    mock.fail_next(GatewayOperation::Get, throttled());

    let err = client(&mock)
        .get_target("gw-1", "target-1", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(mock.call_count(GatewayOperation::Get), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_not_found_is_success() {
    let mock = MockGatewayClient::new();

    client(&mock)
        .delete_target("gw-1", "missing", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(mock.call_count(GatewayOperation::Delete), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_removes_target() {
    let mock = MockGatewayClient::new();
    mock.insert_target("gw-1", "target-1", "READY");

    client(&mock)
        .delete_target("gw-1", "target-1", &CancellationToken::new())
        .await
        .unwrap();

    assert!(mock.target("target-1").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_delete_fatal_error_surfaces() {
    let mock = MockGatewayClient::new();
    mock.insert_target("gw-1", "target-1", "READY");
    mock.fail_next(
        GatewayOperation::Delete,
        GatewayError::api("AccessDeniedException", "denied"),
    );

    let err = client(&mock)
        .delete_target("gw-1", "target-1", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    assert_eq!(mock.call_count(GatewayOperation::Delete), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_call_makes_no_request() {
    let mock = MockGatewayClient::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client(&mock)
        .create_target(create_request(), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(mock.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_backoff() {
    let mock = MockGatewayClient::new();
    for _ in 0..4 {
        mock.fail_next(GatewayOperation::Create, throttled());
    }
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let err = client(&mock)
        .create_target(create_request(), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!err.is_retryable());
    assert_eq!(mock.call_count(GatewayOperation::Create), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

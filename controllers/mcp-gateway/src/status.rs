//! MCPServer status synchronizer.
//!
//! Every mutation re-reads the latest object, applies the change to its
//! status and writes it back with a resourceVersion precondition. Conflicts
//! are retried a bounded number of times and then surfaced as
//! [`StoreError::Conflict`].

use crate::store::{resource_key, ResourceStore, StoreError};
use crds::{set_condition, Condition, ConditionStatus, MCPServer, MCPServerStatus, CONDITION_READY};
use gateway_client::{CreatedTarget, TargetState};
use std::sync::Arc;
use tracing::debug;

/// Ready=true reason
pub const REASON_READY: &str = "GatewayTargetReady";
/// Spec failed validation
pub const REASON_VALIDATION_ERROR: &str = "ValidationError";
/// Request could not be built
pub const REASON_CONFIGURATION_ERROR: &str = "ConfigurationError";
/// Create call failed
pub const REASON_CREATION_ERROR: &str = "CreationError";
/// Update call failed
pub const REASON_UPDATE_ERROR: &str = "UpdateError";

const READY_MESSAGE: &str = "Gateway target is ready and accepting requests";
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Applies status and condition updates to MCPServer resources
#[derive(Clone)]
pub struct StatusManager {
    store: Arc<dyn ResourceStore>,
}

impl std::fmt::Debug for StatusManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusManager").finish_non_exhaustive()
    }
}

impl StatusManager {
    /// Create a status manager writing through `store`
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Record a freshly created target.
    pub async fn record_target_created(
        &self,
        resource: &MCPServer,
        created: &CreatedTarget,
    ) -> Result<MCPServer, StoreError> {
        let generation = resource.metadata.generation;
        self.apply(resource, |status| {
            status.observed_generation = generation;
            status.target_id = Some(created.target_id.clone());
            status.gateway_arn = Some(created.gateway_arn.clone());
            status.target_status = Some(created.status.clone());
            status.last_synchronized = Some(chrono::Utc::now());
        })
        .await
    }

    /// Record the status observed on the gateway.
    pub async fn record_target_status(
        &self,
        resource: &MCPServer,
        state: &TargetState,
    ) -> Result<MCPServer, StoreError> {
        let generation = resource.metadata.generation;
        self.apply(resource, |status| {
            status.observed_generation = generation;
            status.target_status = Some(state.status.clone());
            status.status_reasons.clone_from(&state.status_reasons);
            status.last_synchronized = Some(chrono::Utc::now());
        })
        .await
    }

    /// Insert or replace a condition by type.
    pub async fn upsert_condition(&self, resource: &MCPServer, condition: Condition) -> Result<MCPServer, StoreError> {
        self.apply(resource, |status| set_condition(&mut status.conditions, condition.clone()))
            .await
    }

    /// Set Ready=true
    pub async fn set_ready(&self, resource: &MCPServer) -> Result<MCPServer, StoreError> {
        let condition = Condition::new(
            CONDITION_READY,
            ConditionStatus::True,
            REASON_READY,
            READY_MESSAGE,
            resource.metadata.generation,
        );
        self.upsert_condition(resource, condition).await
    }

    /// Set Ready=false with a reason and message
    pub async fn set_not_ready(
        &self,
        resource: &MCPServer,
        reason: &str,
        message: &str,
    ) -> Result<MCPServer, StoreError> {
        let condition = Condition::new(
            CONDITION_READY,
            ConditionStatus::False,
            reason,
            message,
            resource.metadata.generation,
        );
        self.upsert_condition(resource, condition).await
    }

    async fn apply<F>(&self, resource: &MCPServer, mutate: F) -> Result<MCPServer, StoreError>
    where
        F: Fn(&mut MCPServerStatus) + Send + Sync,
    {
        let key = resource_key(resource);
        let namespace = resource
            .metadata
            .namespace
            .as_deref()
            .ok_or(StoreError::MissingMetadata("namespace"))?;
        let name = resource
            .metadata
            .name
            .as_deref()
            .ok_or(StoreError::MissingMetadata("name"))?;

        let mut attempt = 1;
        loop {
            let latest = self
                .store
                .get(namespace, name)
                .await?
                .ok_or_else(|| StoreError::NotFound(key.clone()))?;

            let mut status = latest.status.clone().unwrap_or_default();
            mutate(&mut status);
            if latest.status.as_ref() == Some(&status) {
                debug!(resource = %key, "Status unchanged, skipping write");
                return Ok(latest);
            }

            match self.store.replace_status(&latest, status).await {
                Ok(updated) => return Ok(updated),
                Err(StoreError::Conflict(_)) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(resource = %key, attempt, "Conflict writing status, re-fetching");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mcp_server, InMemoryStore};

    fn setup() -> (InMemoryStore, StatusManager, MCPServer) {
        let store = InMemoryStore::default();
        let resource = store.insert(mcp_server("weather", "default"));
        let manager = StatusManager::new(Arc::new(store.clone()));
        (store, manager, resource)
    }

    #[tokio::test]
    async fn test_record_target_created() {
        let (store, manager, resource) = setup();
        let created = CreatedTarget {
            target_id: "target-1".to_string(),
            gateway_arn: "arn:gw".to_string(),
            status: "CREATING".to_string(),
        };

        manager.record_target_created(&resource, &created).await.unwrap();

        let status = store.current("default", "weather").unwrap().status.unwrap();
        assert_eq!(status.target_id.as_deref(), Some("target-1"));
        assert_eq!(status.gateway_arn.as_deref(), Some("arn:gw"));
        assert_eq!(status.target_status.as_deref(), Some("CREATING"));
        assert_eq!(status.observed_generation, Some(1));
        assert!(status.last_synchronized.is_some());
    }

    #[tokio::test]
    async fn test_writes_use_latest_version() {
        let (store, manager, stale) = setup();
        // Another writer advances the object after we read it.
        store.update_spec("default", "weather", |spec| spec.description = Some("v2".to_string()));

        let state = TargetState {
            status: "READY".to_string(),
            status_reasons: vec!["ok".to_string()],
        };
        manager.record_target_status(&stale, &state).await.unwrap();

        let current = store.current("default", "weather").unwrap();
        let status = current.status.unwrap();
        assert_eq!(status.target_status.as_deref(), Some("READY"));
        assert_eq!(status.status_reasons, vec!["ok"]);
        // Generation recorded is the one acted upon, not the newer one.
        assert_eq!(status.observed_generation, Some(1));
        assert_eq!(current.spec.description.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_conflict_is_retried_with_refetch() {
        let (store, manager, resource) = setup();
        store.inject_status_conflicts(2);

        manager.set_ready(&resource).await.unwrap();

        let status = store.current("default", "weather").unwrap().status.unwrap();
        assert!(status.ready_condition().is_some_and(Condition::is_true));
        assert_eq!(store.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces() {
        let (store, manager, resource) = setup();
        store.inject_status_conflicts(3);

        let err = manager.set_ready(&resource).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.status_writes(), 0);
    }

    #[tokio::test]
    async fn test_unchanged_condition_skips_write() {
        let (store, manager, resource) = setup();
        manager
            .set_not_ready(&resource, REASON_VALIDATION_ERROR, "bad endpoint")
            .await
            .unwrap();
        manager
            .set_not_ready(&resource, REASON_VALIDATION_ERROR, "bad endpoint")
            .await
            .unwrap();

        assert_eq!(store.status_writes(), 1);
        let status = store.current("default", "weather").unwrap().status.unwrap();
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].reason, REASON_VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let store = InMemoryStore::default();
        let manager = StatusManager::new(Arc::new(store));
        let err = manager
            .set_ready(&mcp_server("ghost", "default"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}

//! Resource store seam.
//!
//! All reads and writes of MCPServer objects go through [`ResourceStore`].
//! Writes carry the resource's `resourceVersion` as a precondition and report
//! [`StoreError::Conflict`] when another writer got there first.

use crds::{MCPServer, MCPServerStatus};
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use thiserror::Error;
use tracing::debug;

/// Errors from the resource store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The resource changed since it was read
    #[error("conflict writing {0}: resource version changed")]
    Conflict(String),

    /// The resource no longer exists
    #[error("{0} not found")]
    NotFound(String),

    /// The resource lacks a field the store needs
    #[error("resource is missing metadata.{0}")]
    MissingMetadata(&'static str),

    /// Status could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other Kubernetes API failure
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

/// Access to MCPServer objects with optimistic concurrency
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch the latest copy, `None` if it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<MCPServer>, StoreError>;

    /// Replace `metadata.finalizers` of `resource`
    async fn replace_finalizers(
        &self,
        resource: &MCPServer,
        finalizers: Vec<String>,
    ) -> Result<MCPServer, StoreError>;

    /// Replace the status subresource of `resource`
    async fn replace_status(
        &self,
        resource: &MCPServer,
        status: MCPServerStatus,
    ) -> Result<MCPServer, StoreError>;
}

/// Returns `namespace/name` for logs and error messages.
pub fn resource_key(resource: &MCPServer) -> String {
    format!(
        "{}/{}",
        resource.namespace().unwrap_or_default(),
        resource.name_any()
    )
}

/// Kubernetes-backed store using JSON merge patches
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    /// Create a store on top of a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_for(&self, resource: &MCPServer) -> Result<(Api<MCPServer>, String, String), StoreError> {
        let namespace = resource
            .metadata
            .namespace
            .clone()
            .ok_or(StoreError::MissingMetadata("namespace"))?;
        let name = resource
            .metadata
            .name
            .clone()
            .ok_or(StoreError::MissingMetadata("name"))?;
        let resource_version = resource
            .metadata
            .resource_version
            .clone()
            .ok_or(StoreError::MissingMetadata("resourceVersion"))?;
        Ok((Api::namespaced(self.client.clone(), &namespace), name, resource_version))
    }
}

fn map_write_error(key: String, err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(e) if e.code == 409 => StoreError::Conflict(key),
        kube::Error::Api(e) if e.code == 404 => StoreError::NotFound(key),
        other => StoreError::Kube(other),
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<MCPServer>, StoreError> {
        let api: Api<MCPServer> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn replace_finalizers(
        &self,
        resource: &MCPServer,
        finalizers: Vec<String>,
    ) -> Result<MCPServer, StoreError> {
        let (api, name, resource_version) = self.api_for(resource)?;
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": resource_version,
                "finalizers": finalizers,
            }
        });
        debug!(resource = %resource_key(resource), "Patching finalizers");
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_write_error(resource_key(resource), e))
    }

    async fn replace_status(
        &self,
        resource: &MCPServer,
        status: MCPServerStatus,
    ) -> Result<MCPServer, StoreError> {
        let (api, name, resource_version) = self.api_for(resource)?;
        // Empty lists are skipped on serialization; a merge patch needs them
        // spelled out to clear stale entries.
        let mut status_value = serde_json::to_value(&status)?;
        status_value["statusReasons"] = serde_json::json!(status.status_reasons);
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": resource_version,
            },
            "status": status_value,
        });
        debug!(resource = %resource_key(resource), "Patching status");
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_write_error(resource_key(resource), e))
    }
}

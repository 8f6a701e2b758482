//! Test utilities for unit testing the reconciler
//!
//! Provides an in-memory [`ResourceStore`] that mimics the API server's
//! optimistic concurrency, plus MCPServer fixtures.

use crate::store::{resource_key, ResourceStore, StoreError};
use crds::{MCPServer, MCPServerSpec, MCPServerStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Helper to create a valid MCPServer with generation 1 and no status
pub fn mcp_server(name: &str, namespace: &str) -> MCPServer {
    MCPServer {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{name}")),
            generation: Some(1),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: MCPServerSpec {
            endpoint: "https://weather.example.com/mcp".to_string(),
            capabilities: vec!["tools".to_string()],
            ..Default::default()
        },
        status: None,
    }
}

/// Helper to attach a status to a fixture
pub fn with_status(mut resource: MCPServer, status: MCPServerStatus) -> MCPServer {
    resource.status = Some(status);
    resource
}

fn deletion_time() -> Time {
    serde_json::from_value(serde_json::json!("2025-01-01T00:00:00Z"))
        .unwrap_or_else(|e| panic!("invalid timestamp fixture: {e}"))
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<(String, String), MCPServer>,
    next_version: u64,
    status_conflicts: usize,
    finalizer_conflicts: usize,
    status_writes: usize,
    finalizer_writes: usize,
}

impl StoreState {
    fn bump(&mut self, resource: &mut MCPServer) {
        self.next_version += 1;
        resource.metadata.resource_version = Some(self.next_version.to_string());
    }

    /// Returns the stored copy if `resource` is current.
    fn check_current(&mut self, resource: &MCPServer, injected: bool) -> Result<(String, String), StoreError> {
        let key = resource_key(resource);
        let id = (
            resource.metadata.namespace.clone().unwrap_or_default(),
            resource.metadata.name.clone().unwrap_or_default(),
        );
        let stored = self
            .objects
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if injected || stored.metadata.resource_version != resource.metadata.resource_version {
            return Err(StoreError::Conflict(key));
        }
        Ok(id)
    }
}

/// In-memory MCPServer store with resourceVersion preconditions
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Store a resource, assigning a fresh resourceVersion. Returns the stored copy.
    pub fn insert(&self, mut resource: MCPServer) -> MCPServer {
        let mut state = self.lock();
        state.bump(&mut resource);
        let id = (
            resource.metadata.namespace.clone().unwrap_or_default(),
            resource.metadata.name.clone().unwrap_or_default(),
        );
        state.objects.insert(id, resource.clone());
        resource
    }

    /// Latest stored copy
    pub fn current(&self, namespace: &str, name: &str) -> Option<MCPServer> {
        self.lock()
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Edit the spec the way a user would: bumps generation and resourceVersion.
    pub fn update_spec(&self, namespace: &str, name: &str, edit: impl FnOnce(&mut MCPServerSpec)) {
        let mut state = self.lock();
        let id = (namespace.to_string(), name.to_string());
        let Some(mut resource) = state.objects.get(&id).cloned() else {
            return;
        };
        edit(&mut resource.spec);
        resource.metadata.generation = Some(resource.metadata.generation.unwrap_or(0) + 1);
        state.bump(&mut resource);
        state.objects.insert(id, resource);
    }

    /// Set the deletion marker. Objects without finalizers disappear immediately.
    pub fn mark_deleted(&self, namespace: &str, name: &str) {
        let mut state = self.lock();
        let id = (namespace.to_string(), name.to_string());
        let Some(mut resource) = state.objects.get(&id).cloned() else {
            return;
        };
        if resource.metadata.finalizers.as_ref().is_none_or(Vec::is_empty) {
            state.objects.remove(&id);
            return;
        }
        resource.metadata.deletion_timestamp = Some(deletion_time());
        state.bump(&mut resource);
        state.objects.insert(id, resource);
    }

    /// Fail the next `count` status writes with a conflict
    pub fn inject_status_conflicts(&self, count: usize) {
        self.lock().status_conflicts = count;
    }

    /// Fail the next `count` finalizer writes with a conflict
    pub fn inject_finalizer_conflicts(&self, count: usize) {
        self.lock().finalizer_conflicts = count;
    }

    /// Successful status writes so far
    pub fn status_writes(&self) -> usize {
        self.lock().status_writes
    }

    /// Successful finalizer writes so far
    pub fn finalizer_writes(&self) -> usize {
        self.lock().finalizer_writes
    }
}

#[async_trait::async_trait]
impl ResourceStore for InMemoryStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<MCPServer>, StoreError> {
        Ok(self.current(namespace, name))
    }

    async fn replace_finalizers(
        &self,
        resource: &MCPServer,
        finalizers: Vec<String>,
    ) -> Result<MCPServer, StoreError> {
        let mut state = self.lock();
        let injected = state.finalizer_conflicts > 0;
        if injected {
            state.finalizer_conflicts -= 1;
        }
        let id = state.check_current(resource, injected)?;
        let Some(mut stored) = state.objects.get(&id).cloned() else {
            return Err(StoreError::NotFound(resource_key(resource)));
        };
        stored.metadata.finalizers = Some(finalizers);
        state.bump(&mut stored);
        state.finalizer_writes += 1;

        let released = stored.metadata.deletion_timestamp.is_some()
            && stored.metadata.finalizers.as_ref().is_none_or(Vec::is_empty);
        if released {
            state.objects.remove(&id);
        } else {
            state.objects.insert(id, stored.clone());
        }
        Ok(stored)
    }

    async fn replace_status(
        &self,
        resource: &MCPServer,
        status: MCPServerStatus,
    ) -> Result<MCPServer, StoreError> {
        let mut state = self.lock();
        let injected = state.status_conflicts > 0;
        if injected {
            state.status_conflicts -= 1;
        }
        let id = state.check_current(resource, injected)?;
        let Some(mut stored) = state.objects.get(&id).cloned() else {
            return Err(StoreError::NotFound(resource_key(resource)));
        };
        stored.status = Some(status);
        state.bump(&mut stored);
        state.status_writes += 1;
        state.objects.insert(id, stored.clone());
        Ok(stored)
    }
}

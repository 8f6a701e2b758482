//! MCPServer reconciliation.
//!
//! One pass walks the lifecycle: deletion first, then validation, finalizer,
//! create, update on generation change, and status polling until the target
//! reports READY.

use super::{Directive, Reconciler};
use crate::error::ControllerError;
use crate::status::{
    REASON_CONFIGURATION_ERROR, REASON_CREATION_ERROR, REASON_UPDATE_ERROR, REASON_VALIDATION_ERROR,
};
use crate::target_builder::ConfigurationError;
use crate::validation::ValidatedConfig;
use crds::{Condition, MCPServer, FINALIZER, TARGET_STATUS_READY};
use gateway_client::GatewayError;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

impl Reconciler {
    /// Reconcile the MCPServer `namespace/name`.
    ///
    /// Store conflicts become [`Directive::RequeueNow`] and cancellation
    /// becomes a requeue after the poll interval; neither touches status.
    /// Any other store failure is returned to the caller.
    pub async fn reconcile_mcp_server(
        &self,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Directive, ControllerError> {
        let key = format!("{namespace}/{name}");
        if cancel.is_cancelled() {
            return Ok(Directive::RequeueAfter(self.poll_interval));
        }

        match self.reconcile_latest(namespace, name, &key, cancel).await {
            Err(e) if e.is_conflict() => {
                debug!(resource = %key, error = %e, "Conflict during reconciliation, requeueing");
                Ok(Directive::RequeueNow)
            }
            Err(ControllerError::Gateway(e)) if e.is_cancelled() => {
                Ok(Directive::RequeueAfter(self.poll_interval))
            }
            other => other,
        }
    }

    async fn reconcile_latest(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Directive, ControllerError> {
        let Some(resource) = self.store.get(namespace, name).await? else {
            debug!(resource = %key, "MCPServer no longer exists");
            self.forget(key);
            return Ok(Directive::Done);
        };

        if resource.is_being_deleted() {
            return self.handle_deletion(&resource, key, cancel).await;
        }

        let config = match self.parser.parse(&resource) {
            Ok(config) => config,
            Err(e) => {
                warn!(resource = %key, field = e.field(), error = %e, "MCPServer validation failed");
                self.status
                    .set_not_ready(&resource, REASON_VALIDATION_ERROR, &e.to_string())
                    .await?;
                return Ok(Directive::Stop);
            }
        };

        // The finalizer must be persisted before anything exists remotely.
        let resource = if resource.has_finalizer(FINALIZER) {
            resource
        } else {
            self.add_finalizer(&resource, key).await?
        };

        let Some(target_id) = resource.target_id().map(str::to_string) else {
            return self.create_target(&resource, &config, key, cancel).await;
        };

        if resource.metadata.generation != resource.observed_generation() {
            return self
                .update_target(&resource, &config, &target_id, key, cancel)
                .await;
        }

        if is_settled(&resource) {
            debug!(resource = %key, target_id = %target_id, "Gateway target is ready, nothing to do");
            self.reset_error(key);
            return Ok(Directive::Done);
        }

        self.poll_target(&resource, &config, &target_id, key, cancel)
            .await
    }

    async fn create_target(
        &self,
        resource: &MCPServer,
        config: &ValidatedConfig,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Directive, ControllerError> {
        let mut request = match self.builder.create_request(config) {
            Ok(request) => request,
            Err(e) => return self.configuration_failure(resource, key, &e).await,
        };
        // Stable across passes so a create whose result was never recorded
        // returns the same target when repeated.
        request.client_token = create_token(resource);

        info!(
            resource = %key,
            gateway_id = %config.gateway_id,
            target_name = %config.target_name,
            "Creating gateway target"
        );
        match self.gateway.create_target(request, cancel).await {
            Ok(created) => {
                self.metrics.record_gateway_call("create", true);
                self.status.record_target_created(resource, &created).await?;
                self.reset_error(key);
                Ok(Directive::RequeueAfter(self.poll_interval))
            }
            Err(e) if e.is_cancelled() => Ok(Directive::RequeueAfter(self.poll_interval)),
            Err(e) => {
                self.metrics.record_gateway_call("create", false);
                self.remote_failure(resource, key, REASON_CREATION_ERROR, "Failed to create gateway target", &e)
                    .await
            }
        }
    }

    async fn update_target(
        &self,
        resource: &MCPServer,
        config: &ValidatedConfig,
        target_id: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Directive, ControllerError> {
        let request = match self.builder.update_request(config, target_id) {
            Ok(request) => request,
            Err(e) => return self.configuration_failure(resource, key, &e).await,
        };

        info!(
            resource = %key,
            target_id,
            generation = resource.metadata.generation,
            observed_generation = resource.observed_generation(),
            "Spec changed, updating gateway target"
        );
        match self.gateway.update_target(request, cancel).await {
            Ok(state) => {
                self.metrics.record_gateway_call("update", true);
                self.status.record_target_status(resource, &state).await?;
                self.reset_error(key);
                Ok(Directive::RequeueAfter(self.poll_interval))
            }
            Err(e) if e.is_cancelled() => Ok(Directive::RequeueAfter(self.poll_interval)),
            Err(e) => {
                self.metrics.record_gateway_call("update", false);
                self.remote_failure(resource, key, REASON_UPDATE_ERROR, "Failed to update gateway target", &e)
                    .await
            }
        }
    }

    async fn poll_target(
        &self,
        resource: &MCPServer,
        config: &ValidatedConfig,
        target_id: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Directive, ControllerError> {
        let state = match self
            .gateway
            .get_target(&config.gateway_id, target_id, cancel)
            .await
        {
            Ok(state) => state,
            Err(e) if e.is_cancelled() => return Ok(Directive::RequeueAfter(self.poll_interval)),
            Err(e) => {
                self.metrics.record_gateway_call("get", false);
                let delay = self.error_backoff(key);
                warn!(resource = %key, target_id, error = %e, delay_secs = delay.as_secs(), "Failed to get gateway target status");
                return Ok(Directive::RequeueAfter(delay));
            }
        };
        self.metrics.record_gateway_call("get", true);

        self.status.record_target_status(resource, &state).await?;
        self.reset_error(key);

        if state.status == TARGET_STATUS_READY {
            self.status.set_ready(resource).await?;
            info!(resource = %key, target_id, "Gateway target is ready");
            return Ok(Directive::Done);
        }

        debug!(
            resource = %key,
            target_id,
            status = %state.status,
            reasons = ?state.status_reasons,
            "Gateway target not ready yet"
        );
        Ok(Directive::RequeueAfter(self.poll_interval))
    }

    async fn handle_deletion(
        &self,
        resource: &MCPServer,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Directive, ControllerError> {
        if !resource.has_finalizer(FINALIZER) {
            return Ok(Directive::Done);
        }

        let Some(target_id) = resource.target_id() else {
            info!(resource = %key, "No gateway target recorded, removing finalizer");
            return self.remove_finalizer(resource, key).await;
        };

        let gateway_id = match self.parser.resolve_gateway_id(&resource.spec) {
            Ok(gateway_id) => gateway_id,
            Err(e) => {
                error!(
                    resource = %key,
                    target_id,
                    error = %e,
                    "Cannot delete gateway target without a gateway ID; finalizer kept"
                );
                return Ok(Directive::Stop);
            }
        };

        info!(resource = %key, gateway_id = %gateway_id, target_id, "Deleting gateway target");
        match self.gateway.delete_target(&gateway_id, target_id, cancel).await {
            Ok(()) => {
                self.metrics.record_gateway_call("delete", true);
                self.remove_finalizer(resource, key).await
            }
            Err(e) if e.is_cancelled() => Ok(Directive::RequeueAfter(self.poll_interval)),
            Err(e) => {
                self.metrics.record_gateway_call("delete", false);
                let delay = self.error_backoff(key);
                warn!(
                    resource = %key,
                    target_id,
                    error = %e,
                    delay_secs = delay.as_secs(),
                    "Failed to delete gateway target; finalizer kept"
                );
                Ok(Directive::RequeueAfter(delay))
            }
        }
    }

    async fn add_finalizer(&self, resource: &MCPServer, key: &str) -> Result<MCPServer, ControllerError> {
        let mut finalizers = resource.finalizers().to_vec();
        finalizers.push(FINALIZER.to_string());
        let updated = self.store.replace_finalizers(resource, finalizers).await?;
        debug!(resource = %key, "Added finalizer");
        Ok(updated)
    }

    async fn remove_finalizer(&self, resource: &MCPServer, key: &str) -> Result<Directive, ControllerError> {
        let finalizers = resource
            .finalizers()
            .iter()
            .filter(|f| *f != FINALIZER)
            .cloned()
            .collect();
        self.store.replace_finalizers(resource, finalizers).await?;
        self.forget(key);
        info!(resource = %key, "Removed finalizer");
        Ok(Directive::Done)
    }

    async fn configuration_failure(
        &self,
        resource: &MCPServer,
        key: &str,
        err: &ConfigurationError,
    ) -> Result<Directive, ControllerError> {
        error!(resource = %key, error = %err, "Failed to build gateway target request");
        self.status
            .set_not_ready(resource, REASON_CONFIGURATION_ERROR, &err.to_string())
            .await?;
        Ok(Directive::Stop)
    }

    async fn remote_failure(
        &self,
        resource: &MCPServer,
        key: &str,
        reason: &str,
        context: &str,
        err: &GatewayError,
    ) -> Result<Directive, ControllerError> {
        self.status
            .set_not_ready(resource, reason, &format!("{context}: {err}"))
            .await?;

        if err.is_retryable() {
            let delay = self.error_backoff(key);
            warn!(resource = %key, error = %err, delay_secs = delay.as_secs(), "{context}, will retry");
            Ok(Directive::RequeueAfter(delay))
        } else {
            error!(resource = %key, error = %err, "{context}");
            Ok(Directive::Stop)
        }
    }
}

/// Idempotency token for creating the target of this resource at its
/// current generation.
fn create_token(resource: &MCPServer) -> Option<String> {
    let uid = resource.metadata.uid.as_deref().filter(|uid| !uid.is_empty())?;
    Some(format!("{uid}-{}", resource.metadata.generation.unwrap_or(0)))
}

/// True when the recorded target is READY and Ready=true has been written.
fn is_settled(resource: &MCPServer) -> bool {
    resource.status.as_ref().is_some_and(|status| {
        status.is_target_ready() && status.ready_condition().is_some_and(Condition::is_true)
    })
}

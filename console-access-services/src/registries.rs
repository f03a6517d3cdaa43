use crate::backend::{Failure, JsonCall, path_segment, send_json};
use crate::typed::{Typed, with_field};
use console_access_core::telemetry::request_span;
use console_access_core::translate::secret::{
    registry_access_from_backend, registry_access_to_backend,
};
use console_access_core::{
    CoreConfig, DelegatedTokenCache, ListQuery, Receiver, ResourceClient, Status, Transport,
};
use console_access_spec::{
    AccessDetails, DomainError, ErrorKind, ErrorTier, Operation, RegistryAccess, RequestContext,
    ResourceKind, ResourceList, Result,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, debug, warn};

pub const REGISTRY_SECRET_TYPE: &str = "kubernetes.io/dockerconfigjson";

/// Registry pull/push credentials stored as secrets, plus the namespaces of
/// the regional container registry.
pub struct RegistryService {
    access: Typed<RegistryAccess>,
    config: Arc<CoreConfig>,
    transport: Arc<Transport>,
    tokens: Arc<DelegatedTokenCache>,
}

impl RegistryService {
    pub fn new(
        client: ResourceClient,
        config: Arc<CoreConfig>,
        tokens: Arc<DelegatedTokenCache>,
    ) -> Self {
        Self {
            transport: client.transport().clone(),
            access: Typed::new(client, ResourceKind::Secret, registry_access_from_backend),
            config,
            tokens,
        }
    }

    pub async fn list_access(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        query: &ListQuery,
    ) -> Result<ResourceList<RegistryAccess>> {
        let query = with_field(query, "type", REGISTRY_SECRET_TYPE);
        self.access.list(ctx, access, &query).await
    }

    /// Fails with a translation error when `name` is not a registry secret.
    pub async fn get_access(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<RegistryAccess> {
        self.access.get(ctx, access, name).await
    }

    pub async fn create_access(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        registry: &RegistryAccess,
        password: &str,
    ) -> Result<RegistryAccess> {
        if registry.server.trim().is_empty() {
            return Err(DomainError::precondition("registry access needs a server"));
        }
        let body = registry_access_to_backend(registry, password);
        self.access.create(ctx, access, &body).await
    }

    pub async fn delete_access(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Status> {
        self.access.delete(ctx, access, name).await
    }

    /// Namespaces of the caller's account in the registry of `region`,
    /// sorted by name.
    pub async fn list_namespaces(&self, ctx: &RequestContext, region: &str) -> Result<Vec<String>> {
        async move {
            let region = path_segment("region", region)?;
            let base = self.config.registry_url(region).ok_or_else(|| {
                DomainError::new(
                    ErrorKind::InvalidConfiguration,
                    ErrorTier::Precondition,
                    format!("no container registry configured for region {region}"),
                )
            })?;
            let account = ctx
                .principal()
                .and_then(|principal| principal.account_id())
                .ok_or_else(|| {
                    DomainError::precondition("listing registry namespaces needs an account id")
                })?;
            let token = self.tokens.token(ctx, Receiver::ContainerRegistry).await?;

            let url = format!("{}/api/v1/namespaces", base.trim_end_matches('/'));
            let failure = Failure::Resource(Operation::List, ResourceKind::RegistryNamespace);
            let operation = Operation::List.monitor_name(ResourceKind::RegistryNamespace);
            let body = send_json(
                &self.transport,
                JsonCall::get(&operation, url, token.value(), failure).account(account),
            )
            .await?;

            let namespaces = namespaces_from(&body);
            debug!(count = namespaces.len(), "listed registry namespaces");
            Ok(namespaces)
        }
        .instrument(request_span("list_registry_namespaces", ctx))
        .await
    }
}

/// Accepts plain names or detail objects carrying `name`.
fn namespaces_from(body: &Value) -> Vec<String> {
    let Some(items) = body.as_array() else {
        warn!("registry namespace payload is not an array");
        return Vec::new();
    };
    let mut names: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

use crate::backend::{Failure, JsonCall, path_segment, send_json};
use console_access_core::telemetry::request_span;
use console_access_core::{
    CacheStore, CoreConfig, DelegatedTokenCache, Receiver, Transport, cache_key,
};
use console_access_spec::{
    AccessDetails, DomainError, ErrorKind, ErrorTier, RequestContext, Result, TenantStatus,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, warn};

pub const NAMESPACE_CONFIG_TTL: Duration = Duration::from_secs(55 * 60);
pub const TENANT_STATUS_TTL: Duration = Duration::from_secs(60 * 60);

const NAMESPACE_CONFIG: &str = "namespace_config";
const TENANT_STATUS: &str = "tenant_status";

/// Namespace a project maps to on its regional control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub namespace: String,
    /// Resource API endpoint when it differs from the control-plane URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Resolves [`AccessDetails`] for `(region, project guid)` pairs.
///
/// Namespace lookups are shared between users and cached in the injected
/// [`CacheStore`]; the bearer token always comes from the per-user
/// [`DelegatedTokenCache`].
pub struct AccessResolver {
    config: Arc<CoreConfig>,
    transport: Arc<Transport>,
    tokens: Arc<DelegatedTokenCache>,
    cache: Arc<dyn CacheStore>,
}

impl AccessResolver {
    pub fn new(
        config: Arc<CoreConfig>,
        transport: Arc<Transport>,
        tokens: Arc<DelegatedTokenCache>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            config,
            transport,
            tokens,
            cache,
        }
    }

    pub fn tokens(&self) -> &Arc<DelegatedTokenCache> {
        &self.tokens
    }

    pub async fn namespace_config(
        &self,
        ctx: &RequestContext,
        region: &str,
        guid: &str,
    ) -> Result<AccessDetails> {
        async move {
            let (base, guid) = self.control_plane(region, guid)?;
            let token = self.tokens.token(ctx, Receiver::CodeEngine).await?;

            let key = cache_key(NAMESPACE_CONFIG, region, guid);
            let config = match self.cached::<NamespaceConfig>(&key) {
                Some(config) => {
                    debug!(%key, "namespace config cache hit");
                    config
                }
                None => {
                    let url = format!("{base}/api/v1/project/{guid}/config");
                    let failure = Failure::Fixed(ErrorKind::FailedToGetNamespaceConfig);
                    let body = send_json(
                        &self.transport,
                        JsonCall::get("get_namespace_config", url, token.value(), failure),
                    )
                    .await?;
                    let config = namespace_config_from(body)?;
                    self.store(&key, &config, NAMESPACE_CONFIG_TTL);
                    config
                }
            };

            Ok(AccessDetails::new(
                config.namespace,
                token.value(),
                config.endpoint.unwrap_or_else(|| base.to_string()),
                region,
                guid,
            ))
        }
        .instrument(request_span("namespace_config", ctx))
        .await
    }

    /// Only ready statuses are cached so provisioning progress stays visible.
    pub async fn tenant_status(
        &self,
        ctx: &RequestContext,
        region: &str,
        guid: &str,
    ) -> Result<TenantStatus> {
        async move {
            let (base, guid) = self.control_plane(region, guid)?;
            let key = cache_key(TENANT_STATUS, region, guid);
            if let Some(status) = self.cached::<TenantStatus>(&key) {
                debug!(%key, "tenant status cache hit");
                return Ok(status);
            }

            let token = self.tokens.token(ctx, Receiver::CodeEngine).await?;
            let url = format!("{base}/api/v1/project/{guid}/status");
            let failure = Failure::Fixed(ErrorKind::FailedToGetTenantStatus);
            let body = send_json(
                &self.transport,
                JsonCall::get("get_tenant_status", url, token.value(), failure),
            )
            .await?;
            let status: TenantStatus = serde_json::from_value(body).map_err(|err| {
                DomainError::translation(
                    ErrorKind::FailedToGetTenantStatus,
                    format!("unexpected tenant status payload: {err}"),
                )
            })?;

            if status.is_ready() {
                self.store(&key, &status, TENANT_STATUS_TTL);
            }
            Ok(status)
        }
        .instrument(request_span("tenant_status", ctx))
        .await
    }

    /// Drop cached lookups for a project, e.g. after it was deleted.
    pub fn forget(&self, region: &str, guid: &str) {
        self.cache.remove(&cache_key(NAMESPACE_CONFIG, region, guid));
        self.cache.remove(&cache_key(TENANT_STATUS, region, guid));
    }

    fn control_plane<'a>(&'a self, region: &str, guid: &'a str) -> Result<(&'a str, &'a str)> {
        let region = path_segment("region", region)?;
        let guid = path_segment("project guid", guid)?;
        let base = self.config.control_plane_url(region).ok_or_else(|| {
            DomainError::new(
                ErrorKind::MissingControlPlaneUrl,
                ErrorTier::Precondition,
                format!("no control-plane URL configured for region {region}"),
            )
        })?;
        Ok((base.trim_end_matches('/'), guid))
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%key, error = %err, "dropping unreadable cache entry");
                self.cache.remove(key);
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(value) => self.cache.put(key, value, ttl),
            Err(err) => warn!(%key, error = %err, "failed to encode cache entry"),
        }
    }
}

fn namespace_config_from(body: Value) -> Result<NamespaceConfig> {
    let config: NamespaceConfig = serde_json::from_value(body).map_err(|err| {
        DomainError::translation(
            ErrorKind::FailedToGetNamespaceConfig,
            format!("unexpected namespace config payload: {err}"),
        )
    })?;
    if config.namespace.trim().is_empty() {
        return Err(DomainError::translation(
            ErrorKind::FailedToGetNamespaceConfig,
            "namespace config does not name a namespace",
        ));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn namespace_config_requires_a_namespace() {
        let config = namespace_config_from(json!({"namespace": "abc"})).unwrap();
        assert_eq!(config.namespace, "abc");
        assert!(config.endpoint.is_none());

        let err = namespace_config_from(json!({"namespace": " "})).unwrap_err();
        assert_eq!(err.tier(), ErrorTier::Translation);
        let err = namespace_config_from(json!({"domain": "x"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedToGetNamespaceConfig);
    }
}

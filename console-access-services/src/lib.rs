//! Per-resource services of the console access layer.
//!
//! [`Console::from_config`] wires one shared [`Transport`], one
//! [`DelegatedTokenCache`] and one [`CacheStore`] into every service. Callers
//! resolve [`console_access_spec::AccessDetails`] once per request through
//! [`AccessResolver::namespace_config`] and pass them to the namespaced
//! services.

mod backend;
mod typed;

pub mod access;
pub mod applications;
pub mod builds;
pub mod jobs;
pub mod registries;
pub mod resource_controller;
pub mod secrets;

pub use access::{AccessResolver, NAMESPACE_CONFIG_TTL, NamespaceConfig, TENANT_STATUS_TTL};
pub use applications::ApplicationService;
pub use backend::ACCOUNT_HEADER;
pub use builds::BuildService;
pub use jobs::JobService;
pub use registries::{REGISTRY_SECRET_TYPE, RegistryService};
pub use resource_controller::{NewProject, ResourceControllerService};
pub use secrets::{ConfigMapService, SecretService};

use console_access_core::{
    CacheStore, CoreConfig, CredentialSource, DelegatedTokenCache, MemoryCacheStore,
    ResourceClient, Transport,
};
use std::sync::Arc;
use tracing::info;

/// Every service, sharing one transport and one token cache.
pub struct Console {
    pub access: AccessResolver,
    pub jobs: JobService,
    pub applications: ApplicationService,
    pub builds: BuildService,
    pub secrets: SecretService,
    pub config_maps: ConfigMapService,
    pub registries: RegistryService,
    pub projects: ResourceControllerService,
}

impl Console {
    /// Build from configuration with an in-memory access cache.
    pub fn from_config(config: CoreConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(Transport::from_config(&config)?);
        let cache = Arc::new(MemoryCacheStore::new(config.capacity()));
        Ok(Self::new(config, transport, cache))
    }

    pub fn new(config: CoreConfig, transport: Arc<Transport>, cache: Arc<dyn CacheStore>) -> Self {
        let config = Arc::new(config);
        let source = CredentialSource::from_config(&config, transport.clone());
        let tokens = Arc::new(DelegatedTokenCache::new(source, config.capacity()));
        let client = ResourceClient::new(transport.clone());
        info!(
            static_credentials = tokens.source().is_static(),
            "console services ready"
        );

        Self {
            access: AccessResolver::new(config.clone(), transport.clone(), tokens.clone(), cache),
            jobs: JobService::new(client.clone()),
            applications: ApplicationService::new(client.clone()),
            builds: BuildService::new(client.clone()),
            secrets: SecretService::new(client.clone()),
            config_maps: ConfigMapService::new(client.clone()),
            registries: RegistryService::new(client, config.clone(), tokens.clone()),
            projects: ResourceControllerService::new(config, transport, tokens),
        }
    }
}

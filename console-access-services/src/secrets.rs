use crate::typed::Typed;
use console_access_core::translate::config_map::{config_map_from_backend, config_map_to_backend};
use console_access_core::translate::secret::{secret_from_backend, secret_to_backend};
use console_access_core::{ListQuery, ResourceClient, Status};
use console_access_spec::{
    AccessDetails, ConfigMap, RequestContext, ResourceKind, ResourceList, Result, Secret,
};

pub struct SecretService {
    secrets: Typed<Secret>,
}

impl SecretService {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            secrets: Typed::new(client, ResourceKind::Secret, secret_from_backend),
        }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        query: &ListQuery,
    ) -> Result<ResourceList<Secret>> {
        self.secrets.list(ctx, access, query).await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Secret> {
        self.secrets.get(ctx, access, name).await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        secret: &Secret,
    ) -> Result<Secret> {
        self.secrets
            .create(ctx, access, &secret_to_backend(secret))
            .await
    }

    /// Merge-patches the secret; keys absent from `secret.data` are kept.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        secret: &Secret,
    ) -> Result<Secret> {
        self.secrets
            .update(ctx, access, &secret.meta.name, &secret_to_backend(secret))
            .await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Status> {
        self.secrets.delete(ctx, access, name).await
    }
}

pub struct ConfigMapService {
    config_maps: Typed<ConfigMap>,
}

impl ConfigMapService {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            config_maps: Typed::new(client, ResourceKind::ConfigMap, config_map_from_backend),
        }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        query: &ListQuery,
    ) -> Result<ResourceList<ConfigMap>> {
        self.config_maps.list(ctx, access, query).await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<ConfigMap> {
        self.config_maps.get(ctx, access, name).await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        config_map: &ConfigMap,
    ) -> Result<ConfigMap> {
        self.config_maps
            .create(ctx, access, &config_map_to_backend(config_map))
            .await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        config_map: &ConfigMap,
    ) -> Result<ConfigMap> {
        self.config_maps
            .update(
                ctx,
                access,
                &config_map.meta.name,
                &config_map_to_backend(config_map),
            )
            .await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Status> {
        self.config_maps.delete(ctx, access, name).await
    }
}

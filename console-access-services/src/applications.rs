use crate::typed::{Typed, with_label};
use console_access_core::translate::application::{
    SERVICE_LABEL, application_from_backend, application_to_backend, instance_from_backend,
    revision_from_backend,
};
use console_access_core::{ListQuery, ResourceClient, Status};
use console_access_spec::{
    AccessDetails, AppInstance, AppRevision, Application, RequestContext, ResourceKind,
    ResourceList, Result,
};

/// Applications with their revisions and running instances.
pub struct ApplicationService {
    applications: Typed<Application>,
    revisions: Typed<AppRevision>,
    instances: Typed<AppInstance>,
}

impl ApplicationService {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            applications: Typed::new(
                client.clone(),
                ResourceKind::Application,
                application_from_backend,
            ),
            revisions: Typed::new(client.clone(), ResourceKind::Revision, revision_from_backend),
            instances: Typed::new(client, ResourceKind::Pod, instance_from_backend),
        }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        query: &ListQuery,
    ) -> Result<ResourceList<Application>> {
        self.applications.list(ctx, access, query).await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Application> {
        self.applications.get(ctx, access, name).await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        app: &Application,
    ) -> Result<Application> {
        let body = application_to_backend(app);
        self.applications.create(ctx, access, &body).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        app: &Application,
    ) -> Result<Application> {
        let patch = application_to_backend(app);
        self.applications
            .update(ctx, access, &app.meta.name, &patch)
            .await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Status> {
        self.applications.delete(ctx, access, name).await
    }

    pub async fn list_revisions(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        app_name: &str,
        query: &ListQuery,
    ) -> Result<ResourceList<AppRevision>> {
        let query = with_label(query, SERVICE_LABEL, app_name);
        self.revisions.list(ctx, access, &query).await
    }

    /// Pods currently serving `app_name`.
    pub async fn list_instances(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        app_name: &str,
        query: &ListQuery,
    ) -> Result<ResourceList<AppInstance>> {
        let query = with_label(query, SERVICE_LABEL, app_name);
        self.instances.list(ctx, access, &query).await
    }
}

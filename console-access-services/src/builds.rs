use crate::typed::{Typed, with_label};
use console_access_core::translate::build::{
    BUILD_LABEL, build_from_backend, build_run_from_backend, build_run_to_backend,
    build_to_backend,
};
use console_access_core::{ListQuery, ResourceClient, Status};
use console_access_spec::{
    AccessDetails, Build, BuildRun, DomainError, RequestContext, ResourceKind, ResourceList, Result,
};

/// Image builds and build runs.
pub struct BuildService {
    builds: Typed<Build>,
    runs: Typed<BuildRun>,
}

impl BuildService {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            builds: Typed::new(client.clone(), ResourceKind::Build, build_from_backend),
            runs: Typed::new(client, ResourceKind::BuildRun, build_run_from_backend),
        }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        query: &ListQuery,
    ) -> Result<ResourceList<Build>> {
        self.builds.list(ctx, access, query).await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Build> {
        self.builds.get(ctx, access, name).await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        build: &Build,
    ) -> Result<Build> {
        let body = build_to_backend(build);
        self.builds.create(ctx, access, &body).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        build: &Build,
    ) -> Result<Build> {
        let patch = build_to_backend(build);
        self.builds
            .update(ctx, access, &build.meta.name, &patch)
            .await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Status> {
        self.builds.delete(ctx, access, name).await
    }

    pub async fn list_runs(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        build: Option<&str>,
        query: &ListQuery,
    ) -> Result<ResourceList<BuildRun>> {
        match build {
            Some(build) => {
                let query = with_label(query, BUILD_LABEL, build);
                self.runs.list(ctx, access, &query).await
            }
            None => self.runs.list(ctx, access, query).await,
        }
    }

    pub async fn get_run(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<BuildRun> {
        self.runs.get(ctx, access, name).await
    }

    /// Start a run of `build_name`; the backend names it when `run_name` is `None`.
    pub async fn create_run(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        build_name: &str,
        run_name: Option<&str>,
    ) -> Result<BuildRun> {
        if build_name.trim().is_empty() {
            return Err(DomainError::precondition("a build run needs a build name"));
        }
        let body = build_run_to_backend(build_name, run_name);
        self.runs.create(ctx, access, &body).await
    }

    pub async fn delete_run(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Status> {
        self.runs.delete(ctx, access, name).await
    }
}

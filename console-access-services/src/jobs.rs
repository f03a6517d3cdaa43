use crate::typed::{Typed, with_label};
use console_access_core::translate::job::{
    JOB_DEFINITION_LABEL, job_definition_from_backend, job_definition_to_backend,
    job_run_from_backend, job_run_to_backend,
};
use console_access_core::{ListQuery, ResourceClient, Status};
use console_access_spec::{
    AccessDetails, JobDefinition, JobRun, RequestContext, ResourceKind, ResourceList, Result,
};

/// Batch job definitions and their runs.
pub struct JobService {
    definitions: Typed<JobDefinition>,
    runs: Typed<JobRun>,
}

impl JobService {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            definitions: Typed::new(
                client.clone(),
                ResourceKind::JobDefinition,
                job_definition_from_backend,
            ),
            runs: Typed::new(client, ResourceKind::JobRun, job_run_from_backend),
        }
    }

    pub async fn list_definitions(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        query: &ListQuery,
    ) -> Result<ResourceList<JobDefinition>> {
        self.definitions.list(ctx, access, query).await
    }

    pub async fn get_definition(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<JobDefinition> {
        self.definitions.get(ctx, access, name).await
    }

    pub async fn create_definition(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        definition: &JobDefinition,
    ) -> Result<JobDefinition> {
        let body = job_definition_to_backend(definition);
        self.definitions.create(ctx, access, &body).await
    }

    pub async fn update_definition(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        definition: &JobDefinition,
    ) -> Result<JobDefinition> {
        let patch = job_definition_to_backend(definition);
        self.definitions
            .update(ctx, access, &definition.meta.name, &patch)
            .await
    }

    pub async fn delete_definition(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Status> {
        self.definitions.delete(ctx, access, name).await
    }

    /// Runs in the namespace, or only those of `definition`.
    pub async fn list_runs(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        definition: Option<&str>,
        query: &ListQuery,
    ) -> Result<ResourceList<JobRun>> {
        match definition {
            Some(definition) => {
                let query = with_label(query, JOB_DEFINITION_LABEL, definition);
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
    ) -> Result<JobRun> {
        self.runs.get(ctx, access, name).await
    }

    pub async fn create_run(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        run: &JobRun,
    ) -> Result<JobRun> {
        let body = job_run_to_backend(run);
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

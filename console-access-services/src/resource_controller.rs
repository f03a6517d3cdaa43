use crate::backend::{Failure, JsonCall, path_segment, send_json};
use console_access_core::telemetry::request_span;
use console_access_core::translate::project::{next_page_url, project_from_backend};
use console_access_core::translate::translate_items;
use console_access_core::{CoreConfig, DelegatedTokenCache, Receiver, Transport};
use console_access_spec::{
    DomainError, ErrorKind, Operation, Project, RequestContext, ResourceKind, Result,
};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Instrument, debug, warn};
use url::form_urlencoded::byte_serialize;

const INSTANCES_PATH: &str = "/v2/resource_instances";

/// Request body provisioning a new project instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProject {
    pub name: String,
    /// Region the project is created in.
    #[serde(rename = "target")]
    pub region: String,
    #[serde(rename = "resource_group")]
    pub resource_group_id: String,
    pub resource_plan_id: String,
}

/// Project lifecycle through the resource controller.
pub struct ResourceControllerService {
    config: Arc<CoreConfig>,
    transport: Arc<Transport>,
    tokens: Arc<DelegatedTokenCache>,
}

impl ResourceControllerService {
    pub fn new(
        config: Arc<CoreConfig>,
        transport: Arc<Transport>,
        tokens: Arc<DelegatedTokenCache>,
    ) -> Self {
        Self {
            config,
            transport,
            tokens,
        }
    }

    /// Every project visible to the caller, following `next_url` page by page.
    pub async fn list_projects(
        &self,
        ctx: &RequestContext,
        resource_id: Option<&str>,
    ) -> Result<Vec<Project>> {
        async move {
            let token = self.tokens.token(ctx, Receiver::ResourceController).await?;
            let mut next = format!("{INSTANCES_PATH}?type=service_instance");
            if let Some(resource_id) = resource_id.filter(|id| !id.trim().is_empty()) {
                next.push_str("&resource_id=");
                next.extend(byte_serialize(resource_id.as_bytes()));
            }

            let operation = Operation::List.monitor_name(ResourceKind::Project);
            let mut seen = HashSet::new();
            let mut projects = Vec::new();
            loop {
                let url = self.url(&next);
                let failure = Failure::Resource(Operation::List, ResourceKind::Project);
                let page = send_json(
                    &self.transport,
                    JsonCall::get(&operation, url, token.value(), failure),
                )
                .await?;
                seen.insert(next);

                let resources = page.get("resources").unwrap_or(&Value::Null);
                match translate_items(resources, ResourceKind::Project, project_from_backend) {
                    Some(page_projects) => projects.extend(page_projects),
                    None => warn!("resource controller page carries no resources array"),
                }
                match next_page_url(&page) {
                    Some(url) if !seen.contains(&url) => next = url,
                    Some(url) => {
                        warn!(next_url = %url, "resource controller repeated a page");
                        break;
                    }
                    None => break,
                }
            }
            debug!(count = projects.len(), "listed projects");
            Ok(projects)
        }
        .instrument(request_span("list_projects", ctx))
        .await
    }

    pub async fn get_project(&self, ctx: &RequestContext, guid: &str) -> Result<Project> {
        async move {
            let guid = path_segment("project guid", guid)?;
            let token = self.tokens.token(ctx, Receiver::ResourceController).await?;
            let url = self.url(&format!("{INSTANCES_PATH}/{guid}"));
            let operation = Operation::Get.monitor_name(ResourceKind::Project);
            let failure = Failure::Resource(Operation::Get, ResourceKind::Project);
            let body = send_json(
                &self.transport,
                JsonCall::get(&operation, url, token.value(), failure),
            )
            .await?;
            translate_project(Operation::Get, &body)
        }
        .instrument(request_span("get_project", ctx))
        .await
    }

    pub async fn create_project(
        &self,
        ctx: &RequestContext,
        project: &NewProject,
    ) -> Result<Project> {
        async move {
            if project.name.trim().is_empty() || project.region.trim().is_empty() {
                return Err(DomainError::precondition("a project needs a name and a region"));
            }
            let token = self.tokens.token(ctx, Receiver::ResourceController).await?;
            let body = serde_json::to_value(project).map_err(|err| {
                DomainError::translation(
                    ErrorKind::resource(Operation::Create, ResourceKind::Project),
                    format!("failed to encode project: {err}"),
                )
            })?;
            let url = self.url(INSTANCES_PATH);
            let operation = Operation::Create.monitor_name(ResourceKind::Project);
            let failure = Failure::Resource(Operation::Create, ResourceKind::Project);
            let created = send_json(
                &self.transport,
                JsonCall::get(&operation, url, token.value(), failure)
                    .method(Method::POST)
                    .body(&body),
            )
            .await?;
            translate_project(Operation::Create, &created)
        }
        .instrument(request_span("create_project", ctx))
        .await
    }

    pub async fn delete_project(&self, ctx: &RequestContext, guid: &str) -> Result<()> {
        async move {
            let guid = path_segment("project guid", guid)?;
            let token = self.tokens.token(ctx, Receiver::ResourceController).await?;
            let url = self.url(&format!("{INSTANCES_PATH}/{guid}"));
            let operation = Operation::Delete.monitor_name(ResourceKind::Project);
            let failure = Failure::Resource(Operation::Delete, ResourceKind::Project);
            send_json(
                &self.transport,
                JsonCall::get(&operation, url, token.value(), failure).method(Method::DELETE),
            )
            .await?;
            debug!(guid, "deleted project");
            Ok(())
        }
        .instrument(request_span("delete_project", ctx))
        .await
    }

    /// `next_url` values are usually relative to the controller endpoint.
    fn url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            return path_or_url.to_string();
        }
        format!(
            "{}{}",
            self.config.resource_controller_url().trim_end_matches('/'),
            path_or_url
        )
    }
}

fn translate_project(operation: Operation, body: &Value) -> Result<Project> {
    project_from_backend(body).ok_or_else(|| {
        DomainError::translation(
            ErrorKind::resource(operation, ResourceKind::Project),
            "resource instance could not be translated",
        )
        .with_details(body.clone())
    })
}

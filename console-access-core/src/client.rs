//! Generic paginated CRUD against namespaced control-plane resources.

use crate::http::{CallFamily, Transport};
use crate::telemetry::resource_span;
use console_access_spec::{
    AccessDetails, ApiGroup, DomainError, ErrorKind, FailureReason, Operation, RequestContext,
    ResourceKind, ResourceList, Result,
};
use reqwest::Method;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{Instrument, debug, warn};
use url::form_urlencoded::byte_serialize;

pub const DEFAULT_PAGE_LIMIT: u32 = 500;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";
pub const NO_CACHE: &str = "max-age=0, no-cache, no-store";

/// Filters and paging of a single `list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: u32,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    /// Opaque server cursor, sent verbatim.
    pub continue_token: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            label_selector: None,
            field_selector: None,
            continue_token: None,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    pub fn field_selector(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }

    pub fn continue_from(mut self, token: impl Into<String>) -> Self {
        self.continue_token = Some(token.into());
        self
    }

    /// Query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        let mut query = format!("limit={}", self.limit);
        if let Some(selector) = non_empty(self.label_selector.as_deref()) {
            query.push_str("&labelSelector=");
            query.extend(byte_serialize(selector.as_bytes()));
        }
        if let Some(selector) = non_empty(self.field_selector.as_deref()) {
            query.push_str("&fieldSelector=");
            query.extend(byte_serialize(selector.as_bytes()));
        }
        if let Some(token) = non_empty(self.continue_token.as_deref()) {
            query.push_str("&continue=");
            query.push_str(token);
        }
        query
    }
}

/// Decoded result of a delete call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub details: Option<Value>,
}

impl Status {
    pub fn is_success(&self) -> bool {
        self.kind.as_deref() == Some("Status") && self.status.as_deref() == Some("Success")
    }
}

fn delete_options() -> Value {
    json!({
        "kind": "DeleteOptions",
        "apiVersion": "v1",
        "propagationPolicy": "Foreground",
    })
}

/// Performs list/get/create/update/delete against a namespaced resource
/// endpoint on behalf of the caller described by [`AccessDetails`].
#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<Transport>,
}

impl ResourceClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Fetch exactly one page. Unexpected 2xx shapes yield an empty list.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        kind: ResourceKind,
        query: &ListQuery,
    ) -> Result<ResourceList<Value>> {
        let operation = Operation::List;
        async move {
            let namespace = access.require_namespace()?;
            let api = api_for(kind)?;
            let url = format!(
                "{}{}?{}",
                access.base_url(),
                api.collection_path(namespace),
                query.to_query_string()
            );
            let body = self
                .call(operation, kind, access, Method::GET, url, None)
                .await?;

            let mut list = list_from_body(body);
            list.sort_newest_first();
            debug!(
                items = list.len(),
                has_more = list.continue_token().is_some(),
                "listed resources"
            );
            Ok(list)
        }
        .instrument(resource_span(ctx, operation, kind))
        .await
    }

    /// Follow continuation tokens sequentially and concatenate every page.
    pub async fn list_all(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        kind: ResourceKind,
        query: &ListQuery,
    ) -> Result<ResourceList<Value>> {
        let mut query = query.clone();
        let mut items = Vec::new();
        loop {
            let page = self.list(ctx, access, kind, &query).await?;
            let next = page.continue_token().map(str::to_string);
            items.extend(page.items);
            match next {
                Some(token) if query.continue_token.as_deref() != Some(token.as_str()) => {
                    query.continue_token = Some(token);
                }
                Some(token) => {
                    warn!(resource = %kind, token = %token, "backend repeated continuation token");
                    break;
                }
                None => break,
            }
        }

        let mut list = ResourceList::new(items, None);
        list.sort_newest_first();
        Ok(list)
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        kind: ResourceKind,
        name: &str,
        label_selector: Option<&str>,
    ) -> Result<Value> {
        let operation = Operation::Get;
        async move {
            let namespace = access.require_namespace()?;
            let name = require_name(name)?;
            let api = api_for(kind)?;
            let mut url = format!("{}{}", access.base_url(), api.item_path(namespace, name));
            if let Some(selector) = non_empty(label_selector) {
                url.push_str("?labelSelector=");
                url.extend(byte_serialize(selector.as_bytes()));
            }
            self.call(operation, kind, access, Method::GET, url, None)
                .await
        }
        .instrument(resource_span(ctx, operation, kind))
        .await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        kind: ResourceKind,
        body: &Value,
    ) -> Result<Value> {
        let operation = Operation::Create;
        async move {
            let namespace = access.require_namespace()?;
            let api = api_for(kind)?;
            let url = format!("{}{}", access.base_url(), api.collection_path(namespace));
            self.call(
                operation,
                kind,
                access,
                Method::POST,
                url,
                Some((JSON_CONTENT_TYPE, body)),
            )
            .await
        }
        .instrument(resource_span(ctx, operation, kind))
        .await
    }

    /// Merge-patch `name`; the patch itself must carry `metadata.name`.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        kind: ResourceKind,
        name: &str,
        patch: &Value,
    ) -> Result<Value> {
        let operation = Operation::Update;
        async move {
            let namespace = access.require_namespace()?;
            let name = require_name(name)?;
            let patched_name = patch
                .pointer("/metadata/name")
                .and_then(Value::as_str)
                .filter(|value| !value.trim().is_empty());
            match patched_name.map(str::trim) {
                None => {
                    return Err(DomainError::precondition(
                        "update patch must carry metadata.name",
                    ));
                }
                Some(patched) if patched != name => {
                    return Err(DomainError::precondition(format!(
                        "update patch names {patched} but targets {name}"
                    )));
                }
                Some(_) => {}
            }
            let api = api_for(kind)?;
            let url = format!("{}{}", access.base_url(), api.item_path(namespace, name));
            self.call(
                operation,
                kind,
                access,
                Method::PATCH,
                url,
                Some((MERGE_PATCH_CONTENT_TYPE, patch)),
            )
            .await
        }
        .instrument(resource_span(ctx, operation, kind))
        .await
    }

    /// Succeeds only when the backend answers with a `Status`/`Success` object.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Status> {
        let operation = Operation::Delete;
        async move {
            let namespace = access.require_namespace()?;
            let name = require_name(name)?;
            let api = api_for(kind)?;
            let url = format!("{}{}", access.base_url(), api.item_path(namespace, name));
            let options = delete_options();
            let (http_status, body) = self
                .call_with_status(
                    operation,
                    kind,
                    access,
                    Method::DELETE,
                    url,
                    Some((JSON_CONTENT_TYPE, &options)),
                )
                .await?;

            let status: Status = serde_json::from_value(body.clone()).unwrap_or_default();
            if !status.is_success() {
                let reason = status.reason.clone();
                let failure = FailureReason::classify(http_status, reason.as_deref());
                let message = status
                    .message
                    .clone()
                    .unwrap_or_else(|| "delete did not report success".to_string());
                return Err(DomainError::protocol(
                    ErrorKind::resource_because(operation, kind, failure),
                    http_status,
                    reason,
                    message,
                )
                .with_details(body));
            }
            debug!(name, "deleted resource");
            Ok(status)
        }
        .instrument(resource_span(ctx, operation, kind))
        .await
    }

    async fn call(
        &self,
        operation: Operation,
        kind: ResourceKind,
        access: &AccessDetails,
        method: Method,
        url: String,
        body: Option<(&'static str, &Value)>,
    ) -> Result<Value> {
        self.call_with_status(operation, kind, access, method, url, body)
            .await
            .map(|(_, value)| value)
    }

    /// Like `call`, also returning the 2xx status the backend answered with.
    async fn call_with_status(
        &self,
        operation: Operation,
        kind: ResourceKind,
        access: &AccessDetails,
        method: Method,
        url: String,
        body: Option<(&'static str, &Value)>,
    ) -> Result<(u16, Value)> {
        let error_kind = ErrorKind::resource(operation, kind);
        let family = if method == Method::GET {
            CallFamily::Read
        } else {
            CallFamily::Write
        };
        let (content_type, payload) = match body {
            Some((content_type, value)) => {
                let bytes = serde_json::to_vec(value).map_err(|err| {
                    DomainError::translation(error_kind, format!("failed to encode body: {err}"))
                })?;
                (content_type, Some(bytes))
            }
            None => (JSON_CONTENT_TYPE, None),
        };

        debug!(%method, url = %url, "calling resource endpoint");
        let response = self
            .transport
            .execute(&operation.monitor_name(kind), family, |client| {
                let builder = client
                    .request(method.clone(), &url)
                    .header(ACCEPT, JSON_CONTENT_TYPE)
                    .header(CONTENT_TYPE, content_type)
                    .header(CACHE_CONTROL, NO_CACHE)
                    .bearer_auth(&access.access_token);
                match &payload {
                    Some(bytes) => builder.body(bytes.clone()),
                    None => builder,
                }
            })
            .await
            .map_err(|err| DomainError::transport(error_kind, err))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| DomainError::transport(error_kind, err))?;

        if !(200..300).contains(&status) {
            return Err(protocol_error(operation, kind, status, &text));
        }
        parse_json(error_kind, &text).map(|value| (status, value))
    }
}

/// Classify a non-2xx answer into a resource error, keeping the backend's
/// structured status object as details when there is one.
pub fn protocol_error(
    operation: Operation,
    kind: ResourceKind,
    status: u16,
    body: &str,
) -> DomainError {
    let parsed = serde_json::from_str::<Value>(body)
        .ok()
        .filter(Value::is_object);
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let reason = field("reason");
    let message = field("message").unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("backend answered with status {status}")
        } else {
            trimmed.to_string()
        }
    });

    let failure = FailureReason::classify(status, reason.as_deref());
    let error = DomainError::protocol(
        ErrorKind::resource_because(operation, kind, failure),
        status,
        reason,
        message,
    );
    match parsed {
        Some(details) => error.with_details(details),
        None => error,
    }
}

/// Parse a 2xx body; an empty body reads as `null`.
pub fn parse_json(kind: ErrorKind, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|err| {
        DomainError::translation(kind, format!("response is not valid JSON: {err}"))
            .with_cause(Arc::new(err))
    })
}

fn list_from_body(body: Value) -> ResourceList<Value> {
    let is_list = body
        .get("kind")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind.ends_with("List"));
    let Value::Object(mut map) = body else {
        return ResourceList::empty();
    };
    if !is_list {
        return ResourceList::empty();
    }
    let Some(Value::Array(items)) = map.remove("items") else {
        return ResourceList::empty();
    };
    let continue_token = map
        .get("metadata")
        .and_then(|metadata| metadata.get("continue"))
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);
    ResourceList::new(items, continue_token)
}

fn api_for(kind: ResourceKind) -> Result<ApiGroup> {
    kind.api().ok_or_else(|| {
        DomainError::precondition(format!(
            "{kind} is not served by the orchestration API"
        ))
    })
}

fn require_name(name: &str) -> Result<&str> {
    if name.trim().is_empty() {
        return Err(DomainError::precondition("resource name is required"));
    }
    Ok(name)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

use console_access_core::translate::translate_page;
use console_access_core::{ListQuery, ResourceClient, Status};
use console_access_spec::{
    AccessDetails, DomainError, ErrorKind, Operation, RequestContext, ResourceKind, ResourceList,
    Result,
};
use serde_json::Value;

/// Namespaced CRUD on one resource kind, translating responses into `T`.
pub(crate) struct Typed<T> {
    client: ResourceClient,
    kind: ResourceKind,
    from_backend: fn(&Value) -> Option<T>,
}

impl<T> Typed<T> {
    pub fn new(
        client: ResourceClient,
        kind: ResourceKind,
        from_backend: fn(&Value) -> Option<T>,
    ) -> Self {
        Self {
            client,
            kind,
            from_backend,
        }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        query: &ListQuery,
    ) -> Result<ResourceList<T>> {
        let page = self.client.list(ctx, access, self.kind, query).await?;
        Ok(translate_page(page, self.kind, self.from_backend))
    }

    pub async fn get(&self, ctx: &RequestContext, access: &AccessDetails, name: &str) -> Result<T> {
        let body = self.client.get(ctx, access, self.kind, name, None).await?;
        self.translate(Operation::Get, &body)
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        body: &Value,
    ) -> Result<T> {
        let created = self.client.create(ctx, access, self.kind, body).await?;
        self.translate(Operation::Create, &created)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
        patch: &Value,
    ) -> Result<T> {
        let updated = self
            .client
            .update(ctx, access, self.kind, name, patch)
            .await?;
        self.translate(Operation::Update, &updated)
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        access: &AccessDetails,
        name: &str,
    ) -> Result<Status> {
        self.client.delete(ctx, access, self.kind, name).await
    }

    fn translate(&self, operation: Operation, body: &Value) -> Result<T> {
        (self.from_backend)(body).ok_or_else(|| {
            DomainError::translation(
                ErrorKind::resource(operation, self.kind),
                format!("backend {} object could not be translated", self.kind),
            )
            .with_details(body.clone())
        })
    }
}

/// `query` narrowed by an extra label requirement.
pub(crate) fn with_label(query: &ListQuery, label: &str, value: &str) -> ListQuery {
    let requirement = format!("{label}={value}");
    let selector = match query.label_selector.as_deref().map(str::trim) {
        Some(existing) if !existing.is_empty() => format!("{existing},{requirement}"),
        _ => requirement,
    };
    query.clone().label_selector(selector)
}

/// `query` narrowed by an extra field requirement.
pub(crate) fn with_field(query: &ListQuery, field: &str, value: &str) -> ListQuery {
    let requirement = format!("{field}={value}");
    let selector = match query.field_selector.as_deref().map(str::trim) {
        Some(existing) if !existing.is_empty() => format!("{existing},{requirement}"),
        _ => requirement,
    };
    query.clone().field_selector(selector)
}

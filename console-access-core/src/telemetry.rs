use console_access_spec::{Operation, RequestContext, ResourceKind};
use tracing::{Span, info_span};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the JSON tracing subscriber. Safe to call more than once.
pub fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(false),
        )
        .try_init()
        .ok();

    Ok(())
}

/// Span wrapping one resource-client call.
pub fn resource_span(ctx: &RequestContext, operation: Operation, kind: ResourceKind) -> Span {
    info_span!(
        "console.resource",
        operation = %operation,
        resource = %kind,
        transaction_id = %ctx.transaction_id()
    )
}

/// Span wrapping a call that is not tied to a resource kind.
pub fn request_span(name: &str, ctx: &RequestContext) -> Span {
    info_span!(
        "console.op",
        operation = name,
        transaction_id = %ctx.transaction_id()
    )
}

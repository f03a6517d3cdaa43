//! Serving services, revisions and their pods.

use super::env::{from_container, to_backend};
use super::meta::{
    condition_reason, condition_status, entity_meta, first_container, object_envelope,
    pull_secret, resource_quantity, resources_json, str_at, strings_at, u32_at, u64_at,
};
use console_access_spec::{
    AppInstance, AppRevision, Application, ApplicationStatus, InstancePhase, ResourceKind,
};
use serde_json::{Map, Value, json};

pub const MIN_SCALE_ANNOTATION: &str = "autoscaling.knative.dev/minScale";
pub const MAX_SCALE_ANNOTATION: &str = "autoscaling.knative.dev/maxScale";
pub const SERVICE_LABEL: &str = "serving.knative.dev/service";
pub const REVISION_LABEL: &str = "serving.knative.dev/revision";
pub const GENERATION_LABEL: &str = "serving.knative.dev/configurationGeneration";

fn ready_status(value: &Value) -> ApplicationStatus {
    match condition_status(value, "Ready") {
        Some("True") => ApplicationStatus::Ready,
        Some("False") => ApplicationStatus::Failed,
        _ => ApplicationStatus::Deploying,
    }
}

pub fn application_from_backend(value: &Value) -> Option<Application> {
    let meta = entity_meta(value)?;
    let template = value.pointer("/spec/template");
    let pod_spec = template.and_then(|template| template.get("spec"));
    let container = first_container(pod_spec);
    let annotation = |key: &str| {
        template
            .and_then(|template| template.pointer("/metadata/annotations"))
            .and_then(|annotations| annotations.get(key))
            .and_then(|raw| {
                raw.as_u64()
                    .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
            })
            .and_then(|raw| u32::try_from(raw).ok())
    };

    Some(Application {
        generation: u64_at(value, "/metadata/generation").unwrap_or(1),
        status: ready_status(value),
        status_reason: condition_reason(value, "Ready"),
        image: container.and_then(|c| str_at(c, "/image")),
        image_pull_secret: pull_secret(pod_spec),
        port: container
            .and_then(|c| u64_at(c, "/ports/0/containerPort"))
            .and_then(|port| u16::try_from(port).ok()),
        command: container.map(|c| strings_at(c, "/command")).unwrap_or_default(),
        args: container.map(|c| strings_at(c, "/args")).unwrap_or_default(),
        env: from_container(container),
        cpu: resource_quantity(container, "cpu"),
        memory: resource_quantity(container, "memory"),
        min_scale: annotation(MIN_SCALE_ANNOTATION),
        max_scale: annotation(MAX_SCALE_ANNOTATION),
        concurrency: pod_spec.and_then(|spec| u32_at(spec, "/containerConcurrency")),
        timeout_seconds: pod_spec.and_then(|spec| u64_at(spec, "/timeoutSeconds")),
        url: str_at(value, "/status/url"),
        latest_ready_revision: str_at(value, "/status/latestReadyRevisionName"),
        latest_created_revision: str_at(value, "/status/latestCreatedRevisionName"),
        meta,
    })
}

/// Serving service body for create, also valid as a merge patch.
pub fn application_to_backend(app: &Application) -> Value {
    let mut object = object_envelope(ResourceKind::Application, &app.meta);

    let mut container = Map::new();
    container.insert("name".into(), json!("user-container"));
    if let Some(image) = &app.image {
        container.insert("image".into(), json!(image));
    }
    if let Some(port) = app.port {
        container.insert("ports".into(), json!([{"containerPort": port}]));
    }
    if !app.command.is_empty() {
        container.insert("command".into(), json!(app.command));
    }
    if !app.args.is_empty() {
        container.insert("args".into(), json!(app.args));
    }
    let env = to_backend(Some(app.env.as_slice()));
    container.insert("env".into(), json!(env.env));
    container.insert("envFrom".into(), json!(env.env_from));
    if let Some(resources) = resources_json(app.cpu.as_deref(), app.memory.as_deref()) {
        container.insert("resources".into(), resources);
    }

    let mut pod_spec = Map::new();
    pod_spec.insert("containers".into(), json!([container]));
    if let Some(secret) = &app.image_pull_secret {
        pod_spec.insert("imagePullSecrets".into(), json!([{"name": secret}]));
    }
    if let Some(concurrency) = app.concurrency {
        pod_spec.insert("containerConcurrency".into(), json!(concurrency));
    }
    if let Some(timeout) = app.timeout_seconds {
        pod_spec.insert("timeoutSeconds".into(), json!(timeout));
    }

    let mut annotations = Map::new();
    if let Some(min) = app.min_scale {
        annotations.insert(MIN_SCALE_ANNOTATION.into(), json!(min.to_string()));
    }
    if let Some(max) = app.max_scale {
        annotations.insert(MAX_SCALE_ANNOTATION.into(), json!(max.to_string()));
    }

    let mut template = Map::new();
    if !annotations.is_empty() {
        template.insert("metadata".into(), json!({"annotations": annotations}));
    }
    template.insert("spec".into(), Value::Object(pod_spec));

    object.insert("spec".into(), json!({"template": template}));
    Value::Object(object)
}

pub fn revision_from_backend(value: &Value) -> Option<AppRevision> {
    let meta = entity_meta(value)?;
    let generation = meta
        .labels
        .get(GENERATION_LABEL)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(1);
    let container = first_container(value.get("spec"));

    Some(AppRevision {
        app_name: meta.labels.get(SERVICE_LABEL).cloned(),
        generation,
        status: ready_status(value),
        image: container.and_then(|c| str_at(c, "/image")),
        meta,
    })
}

pub fn instance_from_backend(value: &Value) -> Option<AppInstance> {
    let meta = entity_meta(value)?;
    let phase = value
        .pointer("/status/phase")
        .and_then(Value::as_str)
        .map(InstancePhase::from)
        .unwrap_or(InstancePhase::Unknown);
    let restarts = value
        .pointer("/status/containerStatuses")
        .and_then(Value::as_array)
        .map(|statuses| {
            statuses
                .iter()
                .filter_map(|status| u32_at(status, "/restartCount"))
                .fold(0u32, u32::saturating_add)
        })
        .unwrap_or(0);

    Some(AppInstance {
        revision: meta.labels.get(REVISION_LABEL).cloned(),
        phase,
        restarts,
        meta,
    })
}

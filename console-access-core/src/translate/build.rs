use super::meta::{condition, condition_reason, entity_meta, object_envelope, str_at};
use console_access_spec::{Build, BuildRun, BuildRunStatus, BuildStatus, ResourceKind};
use serde_json::{Map, Value, json};

pub const BUILD_SIZE_LABEL: &str = "build.codeengine.cloud.ibm.com/size";
pub const BUILD_LABEL: &str = "build.shipwright.io/name";
const STRATEGY_KIND: &str = "ClusterBuildStrategy";

pub fn build_from_backend(value: &Value) -> Option<Build> {
    let meta = entity_meta(value)?;
    let spec = value.get("spec");
    let at = |pointer: &str| spec.and_then(|spec| str_at(spec, pointer));
    let status = match value.pointer("/status/registered").and_then(Value::as_str) {
        Some("True") => BuildStatus::Ready,
        Some("False") => BuildStatus::Failed,
        _ => BuildStatus::Unknown,
    };

    Some(Build {
        source_url: at("/source/url"),
        source_revision: at("/source/revision"),
        context_dir: at("/source/contextDir"),
        source_secret: at("/source/credentials/name"),
        strategy_name: at("/strategy/name"),
        strategy_size: meta.labels.get(BUILD_SIZE_LABEL).cloned(),
        output_image: at("/output/image"),
        output_secret: at("/output/credentials/name"),
        timeout: at("/timeout"),
        status,
        status_reason: str_at(value, "/status/reason"),
        meta,
    })
}

pub fn build_to_backend(build: &Build) -> Value {
    let mut meta = build.meta.clone();
    if let Some(size) = &build.strategy_size {
        meta.labels.insert(BUILD_SIZE_LABEL.to_string(), size.clone());
    }
    let mut object = object_envelope(ResourceKind::Build, &meta);

    let mut source = Map::new();
    if let Some(url) = &build.source_url {
        source.insert("url".into(), json!(url));
    }
    if let Some(revision) = &build.source_revision {
        source.insert("revision".into(), json!(revision));
    }
    if let Some(dir) = &build.context_dir {
        source.insert("contextDir".into(), json!(dir));
    }
    if let Some(secret) = &build.source_secret {
        source.insert("credentials".into(), json!({"name": secret}));
    }

    let mut output = Map::new();
    if let Some(image) = &build.output_image {
        output.insert("image".into(), json!(image));
    }
    if let Some(secret) = &build.output_secret {
        output.insert("credentials".into(), json!({"name": secret}));
    }

    let mut spec = Map::new();
    spec.insert("source".into(), Value::Object(source));
    spec.insert("output".into(), Value::Object(output));
    if let Some(strategy) = &build.strategy_name {
        spec.insert(
            "strategy".into(),
            json!({"name": strategy, "kind": STRATEGY_KIND}),
        );
    }
    if let Some(timeout) = &build.timeout {
        spec.insert("timeout".into(), json!(timeout));
    }

    object.insert("spec".into(), Value::Object(spec));
    Value::Object(object)
}

pub fn build_run_status(value: &Value) -> BuildRunStatus {
    let Some(succeeded) = condition(value, "Succeeded") else {
        return BuildRunStatus::Pending;
    };
    match succeeded.get("status").and_then(Value::as_str) {
        Some("True") => BuildRunStatus::Succeeded,
        Some("False") => BuildRunStatus::Failed,
        _ => match succeeded.get("reason").and_then(Value::as_str) {
            Some("Pending") | None => BuildRunStatus::Pending,
            Some(_) => BuildRunStatus::Running,
        },
    }
}

pub fn build_run_from_backend(value: &Value) -> Option<BuildRun> {
    let meta = entity_meta(value)?;
    let build_name = str_at(value, "/spec/buildRef/name")
        .or_else(|| meta.labels.get(BUILD_LABEL).cloned());

    Some(BuildRun {
        build_name,
        status: build_run_status(value),
        reason: condition_reason(value, "Succeeded"),
        output_image: str_at(value, "/status/buildSpec/output/image")
            .or_else(|| str_at(value, "/spec/output/image")),
        completed: str_at(value, "/status/completionTime"),
        meta,
    })
}

/// Body starting a run of `build_name`. Without a name the backend
/// generates one from the build name.
pub fn build_run_to_backend(build_name: &str, run_name: Option<&str>) -> Value {
    let api_version = ResourceKind::BuildRun
        .api()
        .map(|api| api.api_version())
        .unwrap_or_default();
    let metadata = match run_name {
        Some(name) => json!({"name": name, "labels": {BUILD_LABEL: build_name}}),
        None => json!({
            "generateName": format!("{build_name}-run-"),
            "labels": {BUILD_LABEL: build_name},
        }),
    };
    json!({
        "apiVersion": api_version,
        "kind": "BuildRun",
        "metadata": metadata,
        "spec": {"buildRef": {"name": build_name}},
    })
}

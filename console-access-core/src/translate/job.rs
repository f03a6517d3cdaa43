use super::env::{from_container, to_backend};
use super::meta::{
    condition_status, entity_meta, first_container, object_envelope, pull_secret,
    resource_quantity, resources_json, str_at, strings_at, u32_at, u64_at,
};
use console_access_spec::{
    JobDefinition, JobRun, JobRunCounts, JobRunStatus, ResourceKind,
};
use serde_json::{Map, Value, json};

pub const JOB_DEFINITION_LABEL: &str = "codeengine.cloud.ibm.com/job-definition-name";

pub fn job_definition_from_backend(value: &Value) -> Option<JobDefinition> {
    let meta = entity_meta(value)?;
    let spec = value.get("spec");
    let template = spec.and_then(|spec| spec.get("template"));
    let container = first_container(template);

    Some(JobDefinition {
        image: container.and_then(|c| str_at(c, "/image")),
        image_pull_secret: pull_secret(template),
        command: container.map(|c| strings_at(c, "/command")).unwrap_or_default(),
        args: container.map(|c| strings_at(c, "/args")).unwrap_or_default(),
        env: from_container(container),
        cpu: resource_quantity(container, "cpu"),
        memory: resource_quantity(container, "memory"),
        array_spec: spec.and_then(|spec| str_at(spec, "/arraySpec")),
        retry_limit: spec.and_then(|spec| u32_at(spec, "/retryLimit")),
        max_execution_time: spec.and_then(|spec| u64_at(spec, "/maxExecutionTime")),
        meta,
    })
}

fn container_json(
    image: Option<&str>,
    command: &[String],
    args: &[String],
    env: &[console_access_spec::EnvItem],
    cpu: Option<&str>,
    memory: Option<&str>,
) -> Value {
    let mut container = Map::new();
    container.insert("name".into(), json!("job"));
    if let Some(image) = image {
        container.insert("image".into(), json!(image));
    }
    if !command.is_empty() {
        container.insert("command".into(), json!(command));
    }
    if !args.is_empty() {
        container.insert("args".into(), json!(args));
    }
    let env = to_backend(Some(env));
    container.insert("env".into(), json!(env.env));
    container.insert("envFrom".into(), json!(env.env_from));
    if let Some(resources) = resources_json(cpu, memory) {
        container.insert("resources".into(), resources);
    }
    Value::Object(container)
}

pub fn job_definition_to_backend(definition: &JobDefinition) -> Value {
    let mut object = object_envelope(ResourceKind::JobDefinition, &definition.meta);

    let mut template = Map::new();
    template.insert(
        "containers".into(),
        json!([container_json(
            definition.image.as_deref(),
            &definition.command,
            &definition.args,
            &definition.env,
            definition.cpu.as_deref(),
            definition.memory.as_deref(),
        )]),
    );
    if let Some(secret) = &definition.image_pull_secret {
        template.insert("imagePullSecrets".into(), json!([{"name": secret}]));
    }

    let mut spec = Map::new();
    spec.insert("template".into(), Value::Object(template));
    if let Some(array_spec) = &definition.array_spec {
        spec.insert("arraySpec".into(), json!(array_spec));
    }
    if let Some(retry_limit) = definition.retry_limit {
        spec.insert("retryLimit".into(), json!(retry_limit));
    }
    if let Some(max) = definition.max_execution_time {
        spec.insert("maxExecutionTime".into(), json!(max));
    }

    object.insert("spec".into(), Value::Object(spec));
    Value::Object(object)
}

/// Derived run status: explicit conditions win, then the instance counters.
pub fn job_run_status(value: &Value, counts: &JobRunCounts) -> JobRunStatus {
    if condition_status(value, "Failed") == Some("True") {
        return JobRunStatus::Failed;
    }
    if condition_status(value, "Complete") == Some("True") {
        return JobRunStatus::Succeeded;
    }
    if counts.running > 0 {
        return JobRunStatus::Running;
    }
    if counts.requested > 0 && counts.succeeded.saturating_add(counts.failed) >= counts.requested {
        return if counts.failed > 0 {
            JobRunStatus::Failed
        } else {
            JobRunStatus::Succeeded
        };
    }
    JobRunStatus::Pending
}

pub fn job_run_from_backend(value: &Value) -> Option<JobRun> {
    let meta = entity_meta(value)?;
    let spec = value.get("spec");
    let container = first_container(spec.and_then(|spec| spec.get("template")));
    let count = |field: &str| u32_at(value, &format!("/status/{field}")).unwrap_or(0);
    let counts = JobRunCounts {
        requested: count("requested"),
        pending: count("pending"),
        running: count("running"),
        succeeded: count("succeeded"),
        failed: count("failed"),
    };
    let definition_name = meta
        .labels
        .get(JOB_DEFINITION_LABEL)
        .cloned()
        .or_else(|| spec.and_then(|spec| str_at(spec, "/jobDefinitionRef")));

    Some(JobRun {
        definition_name,
        image: container.and_then(|c| str_at(c, "/image")),
        array_spec: spec.and_then(|spec| str_at(spec, "/arraySpec")),
        env: from_container(container),
        status: job_run_status(value, &counts),
        counts,
        meta,
    })
}

/// Body submitting a run, optionally overriding the definition's env.
pub fn job_run_to_backend(run: &JobRun) -> Value {
    let mut meta = run.meta.clone();
    if let Some(definition) = &run.definition_name {
        meta.labels
            .entry(JOB_DEFINITION_LABEL.to_string())
            .or_insert_with(|| definition.clone());
    }
    let mut object = object_envelope(ResourceKind::JobRun, &meta);

    let mut spec = Map::new();
    if let Some(definition) = &run.definition_name {
        spec.insert("jobDefinitionRef".into(), json!(definition));
    }
    if let Some(array_spec) = &run.array_spec {
        spec.insert("arraySpec".into(), json!(array_spec));
    }
    if run.image.is_some() || !run.env.is_empty() {
        let container = container_json(run.image.as_deref(), &[], &[], &run.env, None, None);
        spec.insert("template".into(), json!({"containers": [container]}));
    }

    object.insert("spec".into(), Value::Object(spec));
    Value::Object(object)
}

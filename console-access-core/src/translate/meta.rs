use console_access_spec::{EntityMeta, ResourceKind, ResourceList};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::warn;

/// Identity of a backend object; `None` unless it is an object with a
/// non-empty `metadata.name`.
pub fn entity_meta(value: &Value) -> Option<EntityMeta> {
    let metadata = value.as_object()?.get("metadata")?.as_object()?;
    let name = metadata
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())?;

    Some(EntityMeta {
        name: name.to_string(),
        namespace: string_field(metadata, "namespace"),
        id: string_field(metadata, "uid"),
        created: string_field(metadata, "creationTimestamp"),
        resource_version: string_field(metadata, "resourceVersion"),
        labels: string_map(metadata.get("labels")),
    })
}

/// `apiVersion`, `kind` and `metadata` of an outgoing object.
pub fn object_envelope(kind: ResourceKind, meta: &EntityMeta) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("name".into(), Value::String(meta.name.clone()));
    if let Some(namespace) = &meta.namespace {
        metadata.insert("namespace".into(), Value::String(namespace.clone()));
    }
    if let Some(version) = &meta.resource_version {
        metadata.insert("resourceVersion".into(), Value::String(version.clone()));
    }
    if !meta.labels.is_empty() {
        metadata.insert("labels".into(), json!(meta.labels));
    }

    let mut object = Map::new();
    if let Some(api) = kind.api() {
        object.insert("apiVersion".into(), Value::String(api.api_version()));
        object.insert("kind".into(), Value::String(api.kind.to_string()));
    }
    object.insert("metadata".into(), Value::Object(metadata));
    object
}

pub fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    let field = value.pointer(pointer)?;
    field
        .as_u64()
        .or_else(|| field.as_str().and_then(|raw| raw.trim().parse().ok()))
}

pub fn u32_at(value: &Value, pointer: &str) -> Option<u32> {
    u64_at(value, pointer).and_then(|raw| u32::try_from(raw).ok())
}

/// String elements of an array; other elements are skipped.
pub fn strings_at(value: &Value, pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// First container of a pod-like spec. A missing, empty or non-array
/// `containers` value means no container.
pub fn first_container<'a>(pod_spec: Option<&'a Value>) -> Option<&'a Value> {
    pod_spec?
        .get("containers")?
        .as_array()?
        .first()
        .filter(|container| container.is_object())
}

/// Status of the condition of the given type (`"True"`, `"False"`, ...).
pub fn condition<'a>(value: &'a Value, condition_type: &str) -> Option<&'a Value> {
    value
        .pointer("/status/conditions")?
        .as_array()?
        .iter()
        .find(|condition| {
            condition.get("type").and_then(Value::as_str) == Some(condition_type)
        })
}

pub fn condition_status<'a>(value: &'a Value, condition_type: &str) -> Option<&'a str> {
    condition(value, condition_type)?
        .get("status")
        .and_then(Value::as_str)
}

pub fn condition_reason(value: &Value, condition_type: &str) -> Option<String> {
    condition(value, condition_type)?
        .get("reason")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Name of the first `imagePullSecrets` entry.
pub fn pull_secret(pod_spec: Option<&Value>) -> Option<String> {
    pod_spec?
        .get("imagePullSecrets")?
        .as_array()?
        .first()?
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `resources.requests` / `resources.limits` value, requests first.
pub fn resource_quantity(container: Option<&Value>, resource: &str) -> Option<String> {
    let container = container?;
    str_at(container, &format!("/resources/requests/{resource}"))
        .or_else(|| str_at(container, &format!("/resources/limits/{resource}")))
}

/// Resource requirements with identical requests and limits.
pub fn resources_json(cpu: Option<&str>, memory: Option<&str>) -> Option<Value> {
    let mut quantities = Map::new();
    if let Some(cpu) = cpu {
        quantities.insert("cpu".into(), Value::String(cpu.to_string()));
    }
    if let Some(memory) = memory {
        quantities.insert("memory".into(), Value::String(memory.to_string()));
    }
    if quantities.is_empty() {
        return None;
    }
    Some(json!({
        "requests": quantities.clone(),
        "limits": quantities,
    }))
}

/// Translate a raw list payload (a bare array or an object with `items`).
pub fn translate_items<T>(
    payload: &Value,
    kind: ResourceKind,
    translate: impl Fn(&Value) -> Option<T>,
) -> Option<Vec<T>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(map) => map.get("items")?.as_array()?,
        _ => return None,
    };
    Some(translate_each(items.iter(), kind, translate))
}

/// Translate an already fetched page, keeping its order and cursor.
pub fn translate_page<T>(
    page: ResourceList<Value>,
    kind: ResourceKind,
    translate: impl Fn(&Value) -> Option<T>,
) -> ResourceList<T> {
    let items = translate_each(page.items.iter(), kind, translate);
    ResourceList::new(items, page.metadata.continue_token)
}

fn translate_each<'a, T>(
    items: impl Iterator<Item = &'a Value>,
    kind: ResourceKind,
    translate: impl Fn(&Value) -> Option<T>,
) -> Vec<T> {
    items
        .enumerate()
        .filter_map(|(index, item)| {
            let translated = translate(item);
            if translated.is_none() {
                warn!(resource = %kind, index, "dropping list element that failed translation");
            }
            translated
        })
        .collect()
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

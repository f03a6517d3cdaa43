use console_access_spec::{EnvItem, RefKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Container `env` and `envFrom` arrays in backend shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendEnv {
    #[serde(default)]
    pub env: Vec<Value>,
    #[serde(default)]
    pub env_from: Vec<Value>,
}

/// Console items to backend arrays. Absent input yields two empty arrays.
///
/// `Predefined` items are written as plain literals, so they come back as
/// `Literal` from [`from_backend`].
pub fn to_backend(items: Option<&[EnvItem]>) -> BackendEnv {
    let mut out = BackendEnv::default();
    for item in items.unwrap_or_default() {
        match item {
            EnvItem::Literal { name, value } | EnvItem::Predefined { name, value } => {
                out.env.push(json!({"name": name, "value": value}));
            }
            EnvItem::KeyRef {
                name,
                ref_kind,
                source_name,
                source_key,
            } => {
                let mut value_from = Map::new();
                value_from.insert(
                    ref_kind.key_ref_field().into(),
                    json!({"name": source_name, "key": source_key}),
                );
                out.env
                    .push(json!({"name": name, "valueFrom": Value::Object(value_from)}));
            }
            EnvItem::MapRef {
                prefix,
                ref_kind,
                source_name,
            } => {
                let mut entry = Map::new();
                if let Some(prefix) = prefix {
                    entry.insert("prefix".into(), Value::String(prefix.clone()));
                }
                entry.insert(ref_kind.map_ref_field().into(), json!({"name": source_name}));
                out.env_from.push(Value::Object(entry));
            }
            EnvItem::Unsupported { original_value, .. } => out.env.push(original_value.clone()),
            EnvItem::UnsupportedFrom { original_value } => {
                out.env_from.push(original_value.clone())
            }
        }
    }
    out
}

/// Backend arrays to console items. Total: every entry maps to one item,
/// unrecognised shapes are preserved verbatim. Absent input yields an empty
/// vector.
pub fn from_backend(env: Option<&[Value]>, env_from: Option<&[Value]>) -> Vec<EnvItem> {
    let env = env.unwrap_or_default();
    let env_from = env_from.unwrap_or_default();

    env.iter()
        .map(env_entry)
        .chain(env_from.iter().map(env_from_entry))
        .collect()
}

/// Items of a container object (`env` / `envFrom` fields).
pub fn from_container(container: Option<&Value>) -> Vec<EnvItem> {
    let field = |name: &str| {
        container
            .and_then(|container| container.get(name))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    };
    from_backend(field("env"), field("envFrom"))
}

fn env_entry(entry: &Value) -> EnvItem {
    let unsupported = || EnvItem::Unsupported {
        name: entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        original_value: entry.clone(),
    };

    let Some(object) = entry.as_object() else {
        return unsupported();
    };
    let Some(name) = object.get("name").and_then(Value::as_str) else {
        return unsupported();
    };

    match object.get("valueFrom") {
        None => match object.get("value") {
            None => EnvItem::literal(name, ""),
            Some(Value::String(value)) => EnvItem::literal(name, value.as_str()),
            Some(_) => unsupported(),
        },
        Some(value_from) => match key_ref(value_from) {
            Some((ref_kind, source_name, source_key)) => EnvItem::KeyRef {
                name: name.to_string(),
                ref_kind,
                source_name,
                source_key,
            },
            None => unsupported(),
        },
    }
}

fn key_ref(value_from: &Value) -> Option<(RefKind, String, String)> {
    let object = value_from.as_object()?;
    if object.len() != 1 {
        return None;
    }
    let (field, reference) = object.iter().next()?;
    let ref_kind = [RefKind::ConfigMap, RefKind::Secret]
        .into_iter()
        .find(|kind| kind.key_ref_field() == field)?;
    let source_name = reference.get("name")?.as_str()?;
    let source_key = reference.get("key")?.as_str()?;
    Some((ref_kind, source_name.to_string(), source_key.to_string()))
}

fn env_from_entry(entry: &Value) -> EnvItem {
    map_ref(entry).unwrap_or_else(|| EnvItem::UnsupportedFrom {
        original_value: entry.clone(),
    })
}

fn map_ref(entry: &Value) -> Option<EnvItem> {
    let object = entry.as_object()?;
    let prefix = match object.get("prefix") {
        None => None,
        Some(Value::String(prefix)) => Some(prefix.clone()),
        Some(_) => return None,
    };
    let mut refs = object.iter().filter(|(key, _)| key.as_str() != "prefix");
    let (field, reference) = refs.next()?;
    if refs.next().is_some() {
        return None;
    }
    let ref_kind = [RefKind::ConfigMap, RefKind::Secret]
        .into_iter()
        .find(|kind| kind.map_ref_field() == field)?;
    let source_name = reference.get("name")?.as_str()?;
    Some(EnvItem::MapRef {
        prefix,
        ref_kind,
        source_name: source_name.to_string(),
    })
}

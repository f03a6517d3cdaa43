use super::meta::{entity_meta, object_envelope, string_map};
use console_access_spec::{ConfigMap, ResourceKind};
use serde_json::{Value, json};

pub fn config_map_from_backend(value: &Value) -> Option<ConfigMap> {
    let meta = entity_meta(value)?;
    Some(ConfigMap {
        data: string_map(value.get("data")),
        meta,
    })
}

pub fn config_map_to_backend(config_map: &ConfigMap) -> Value {
    let mut object = object_envelope(ResourceKind::ConfigMap, &config_map.meta);
    object.insert("data".into(), json!(config_map.data));
    Value::Object(object)
}

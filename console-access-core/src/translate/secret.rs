use super::meta::{entity_meta, object_envelope};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use console_access_spec::{RegistryAccess, ResourceKind, Secret, SecretKind};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::debug;

pub const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";

fn decode_data(value: &Value) -> BTreeMap<String, String> {
    let Some(data) = value.get("data").and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    data.iter()
        .filter_map(|(key, encoded)| {
            let decoded = STANDARD.decode(encoded.as_str()?).ok()?;
            match String::from_utf8(decoded) {
                Ok(text) => Some((key.clone(), text)),
                Err(_) => {
                    debug!(key = %key, "skipping binary secret entry");
                    None
                }
            }
        })
        .collect()
}

pub fn secret_from_backend(value: &Value) -> Option<Secret> {
    let meta = entity_meta(value)?;
    Some(Secret {
        kind: SecretKind::from_type(value.get("type").and_then(Value::as_str)),
        data: decode_data(value),
        meta,
    })
}

pub fn secret_to_backend(secret: &Secret) -> Value {
    let mut object = object_envelope(ResourceKind::Secret, &secret.meta);
    let data: Map<String, Value> = secret
        .data
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(STANDARD.encode(value))))
        .collect();
    object.insert("type".into(), json!(secret.kind.as_type()));
    object.insert("data".into(), Value::Object(data));
    Value::Object(object)
}

/// Registry credentials of a `.dockerconfigjson` secret (first server entry).
pub fn registry_access_from_backend(value: &Value) -> Option<RegistryAccess> {
    let secret = secret_from_backend(value)?;
    if secret.kind != SecretKind::Registry {
        return None;
    }
    let config: Value = serde_json::from_str(secret.data.get(DOCKER_CONFIG_KEY)?).ok()?;
    let (server, entry) = config.get("auths")?.as_object()?.iter().next()?;
    let field = |name: &str| entry.get(name).and_then(Value::as_str).map(str::to_string);

    let username = field("username").or_else(|| {
        let auth = STANDARD.decode(field("auth")?).ok()?;
        let auth = String::from_utf8(auth).ok()?;
        auth.split_once(':').map(|(user, _)| user.to_string())
    });

    Some(RegistryAccess {
        server: server.clone(),
        username,
        email: field("email"),
        meta: secret.meta,
    })
}

/// Registry secret body carrying a single-server docker config.
pub fn registry_access_to_backend(access: &RegistryAccess, password: &str) -> Value {
    let username = access.username.clone().unwrap_or_default();
    let mut entry = Map::new();
    entry.insert("username".into(), json!(username));
    entry.insert("password".into(), json!(password));
    if let Some(email) = &access.email {
        entry.insert("email".into(), json!(email));
    }
    entry.insert(
        "auth".into(),
        json!(STANDARD.encode(format!("{username}:{password}"))),
    );
    let mut auths = Map::new();
    auths.insert(access.server.clone(), Value::Object(entry));
    let config = json!({"auths": auths});

    let secret = Secret {
        meta: access.meta.clone(),
        kind: SecretKind::Registry,
        data: BTreeMap::from([(DOCKER_CONFIG_KEY.to_string(), config.to_string())]),
    };
    secret_to_backend(&secret)
}

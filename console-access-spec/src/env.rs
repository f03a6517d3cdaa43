use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source object referenced by an environment entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    ConfigMap,
    Secret,
}

impl RefKind {
    /// Backend field holding a single-key reference (`valueFrom.*`).
    pub const fn key_ref_field(self) -> &'static str {
        match self {
            RefKind::ConfigMap => "configMapKeyRef",
            RefKind::Secret => "secretKeyRef",
        }
    }

    /// Backend field holding a whole-map reference (`envFrom[].*`).
    pub const fn map_ref_field(self) -> &'static str {
        match self {
            RefKind::ConfigMap => "configMapRef",
            RefKind::Secret => "secretRef",
        }
    }
}

/// A single environment entry of a workload, as seen by the console.
///
/// Every backend env shape maps to exactly one variant; shapes the console
/// does not understand are kept verbatim in the `Unsupported*` variants so
/// that they survive an edit round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvItem {
    Literal {
        name: String,
        value: String,
    },
    KeyRef {
        name: String,
        ref_kind: RefKind,
        source_name: String,
        source_key: String,
    },
    MapRef {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
        ref_kind: RefKind,
        source_name: String,
    },
    /// Platform-injected value; written back as a literal.
    Predefined {
        name: String,
        value: String,
    },
    Unsupported {
        name: String,
        original_value: Value,
    },
    UnsupportedFrom {
        original_value: Value,
    },
}

impl EnvItem {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        EnvItem::Literal {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Variable name, `None` for whole-map imports.
    pub fn name(&self) -> Option<&str> {
        match self {
            EnvItem::Literal { name, .. }
            | EnvItem::KeyRef { name, .. }
            | EnvItem::Predefined { name, .. }
            | EnvItem::Unsupported { name, .. } => Some(name),
            EnvItem::MapRef { .. } | EnvItem::UnsupportedFrom { .. } => None,
        }
    }
}

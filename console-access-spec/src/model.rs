//! Console domain entities produced by the translators.

use crate::env::EnvItem;
use crate::list::{Created, timestamp_millis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity fields shared by every namespaced entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl EntityMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

macro_rules! created_from_meta {
    ($($entity:ty),* $(,)?) => {
        $(
            impl Created for $entity {
                fn created_millis(&self) -> i64 {
                    timestamp_millis(self.meta.created.as_deref())
                }
            }
        )*
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Ready,
    Deploying,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub meta: EntityMeta,
    pub generation: u64,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_ready_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_created_revision: Option<String>,
}

impl Application {
    /// Minimal application ready to be created from an image.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::named(name),
            generation: 1,
            status: ApplicationStatus::Deploying,
            status_reason: None,
            image: Some(image.into()),
            image_pull_secret: None,
            port: None,
            command: Vec::new(),
            args: Vec::new(),
            env: Vec::new(),
            cpu: None,
            memory: None,
            min_scale: None,
            max_scale: None,
            concurrency: None,
            timeout_seconds: None,
            url: None,
            latest_ready_revision: None,
            latest_created_revision: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRevision {
    pub meta: EntityMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub generation: u64,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for InstancePhase {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => InstancePhase::Pending,
            "Running" => InstancePhase::Running,
            "Succeeded" => InstancePhase::Succeeded,
            "Failed" => InstancePhase::Failed,
            _ => InstancePhase::Unknown,
        }
    }
}

/// A running pod of an application revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInstance {
    pub meta: EntityMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub phase: InstancePhase,
    pub restarts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub meta: EntityMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secret: Option<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_execution_time: Option<u64>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::named(name),
            image: Some(image.into()),
            image_pull_secret: None,
            command: Vec::new(),
            args: Vec::new(),
            env: Vec::new(),
            cpu: None,
            memory: None,
            array_spec: None,
            retry_limit: None,
            max_execution_time: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobRunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub meta: EntityMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_spec: Option<String>,
    #[serde(default)]
    pub env: Vec<EnvItem>,
    pub status: JobRunStatus,
    #[serde(default)]
    pub counts: JobRunCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRunCounts {
    pub requested: u32,
    pub pending: u32,
    pub running: u32,
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Ready,
    Failed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub meta: EntityMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    pub status: BuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
}

impl Build {
    pub fn new(
        name: impl Into<String>,
        source_url: impl Into<String>,
        output_image: impl Into<String>,
    ) -> Self {
        Self {
            meta: EntityMeta::named(name),
            source_url: Some(source_url.into()),
            source_revision: None,
            context_dir: None,
            source_secret: None,
            strategy_name: None,
            strategy_size: None,
            output_image: Some(output_image.into()),
            output_secret: None,
            timeout: None,
            status: BuildStatus::Unknown,
            status_reason: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildRunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRun {
    pub meta: EntityMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    pub status: BuildRunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    Generic,
    Registry,
    Ssh,
    Tls,
    Other(String),
}

impl SecretKind {
    pub fn from_type(secret_type: Option<&str>) -> Self {
        match secret_type {
            None | Some("Opaque") => SecretKind::Generic,
            Some("kubernetes.io/dockerconfigjson") => SecretKind::Registry,
            Some("kubernetes.io/ssh-auth") => SecretKind::Ssh,
            Some("kubernetes.io/tls") => SecretKind::Tls,
            Some(other) => SecretKind::Other(other.to_string()),
        }
    }

    pub fn as_type(&self) -> &str {
        match self {
            SecretKind::Generic => "Opaque",
            SecretKind::Registry => "kubernetes.io/dockerconfigjson",
            SecretKind::Ssh => "kubernetes.io/ssh-auth",
            SecretKind::Tls => "kubernetes.io/tls",
            SecretKind::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub meta: EntityMeta,
    pub kind: SecretKind,
    /// Decoded values; entries whose payload is not UTF-8 are omitted.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Credentials of a container registry stored as a registry secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAccess {
    pub meta: EntityMeta,
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMap {
    pub meta: EntityMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

created_from_meta!(
    Application,
    AppRevision,
    AppInstance,
    JobDefinition,
    JobRun,
    Build,
    BuildRun,
    Secret,
    RegistryAccess,
    ConfigMap,
);

/// A project as known to the resource-lifecycle API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub guid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

impl Created for Project {
    fn created_millis(&self) -> i64 {
        timestamp_millis(self.created.as_deref())
    }
}

/// Provisioning status of a project's tenant on the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TenantStatus {
    pub fn is_ready(&self) -> bool {
        self.status.eq_ignore_ascii_case("ready")
    }
}

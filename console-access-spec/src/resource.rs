use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical type of a backend resource.
///
/// The kind drives URL construction for the control-plane APIs and the
/// naming of resource errors (`FailedToList{plural}Error`, ...). Discriminants
/// feed the numeric error codes and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum ResourceKind {
    Pod = 1,
    Secret = 2,
    ConfigMap = 3,
    Application = 4,
    Revision = 5,
    Route = 6,
    JobDefinition = 7,
    JobRun = 8,
    Build = 9,
    BuildRun = 10,
    Project = 11,
    RegistryNamespace = 12,
}

/// API group coordinates of a namespaced control-plane resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiGroup {
    pub group: Option<&'static str>,
    pub version: &'static str,
    pub plural: &'static str,
    pub kind: &'static str,
}

impl ApiGroup {
    const fn core(plural: &'static str, kind: &'static str) -> Self {
        Self {
            group: None,
            version: "v1",
            plural,
            kind,
        }
    }

    const fn named(
        group: &'static str,
        version: &'static str,
        plural: &'static str,
        kind: &'static str,
    ) -> Self {
        Self {
            group: Some(group),
            version,
            plural,
            kind,
        }
    }

    /// Path prefix of the API, `/api/v1` for the core group.
    pub fn prefix(&self) -> String {
        match self.group {
            Some(group) => format!("/apis/{group}/{version}", version = self.version),
            None => format!("/api/{}", self.version),
        }
    }

    /// Value of the `apiVersion` field on objects of this group.
    pub fn api_version(&self) -> String {
        match self.group {
            Some(group) => format!("{group}/{}", self.version),
            None => self.version.to_string(),
        }
    }

    /// Collection path inside a namespace.
    pub fn collection_path(&self, namespace: &str) -> String {
        format!(
            "{prefix}/namespaces/{namespace}/{plural}",
            prefix = self.prefix(),
            plural = self.plural
        )
    }

    /// Item path inside a namespace.
    pub fn item_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{name}", self.collection_path(namespace))
    }
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 12] = [
        ResourceKind::Pod,
        ResourceKind::Secret,
        ResourceKind::ConfigMap,
        ResourceKind::Application,
        ResourceKind::Revision,
        ResourceKind::Route,
        ResourceKind::JobDefinition,
        ResourceKind::JobRun,
        ResourceKind::Build,
        ResourceKind::BuildRun,
        ResourceKind::Project,
        ResourceKind::RegistryNamespace,
    ];

    pub const fn index(self) -> u16 {
        self as u16
    }

    pub fn from_index(index: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.index() == index)
    }

    /// Singular name used in error names, e.g. `JobDefinition`.
    pub const fn name(self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Secret => "Secret",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Application => "Application",
            ResourceKind::Revision => "Revision",
            ResourceKind::Route => "Route",
            ResourceKind::JobDefinition => "JobDefinition",
            ResourceKind::JobRun => "JobRun",
            ResourceKind::Build => "Build",
            ResourceKind::BuildRun => "BuildRun",
            ResourceKind::Project => "Project",
            ResourceKind::RegistryNamespace => "RegistryNamespace",
        }
    }

    /// Plural name used in list error names, e.g. `JobDefinitions`.
    pub const fn plural_name(self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pods",
            ResourceKind::Secret => "Secrets",
            ResourceKind::ConfigMap => "ConfigMaps",
            ResourceKind::Application => "Applications",
            ResourceKind::Revision => "Revisions",
            ResourceKind::Route => "Routes",
            ResourceKind::JobDefinition => "JobDefinitions",
            ResourceKind::JobRun => "JobRuns",
            ResourceKind::Build => "Builds",
            ResourceKind::BuildRun => "BuildRuns",
            ResourceKind::Project => "Projects",
            ResourceKind::RegistryNamespace => "RegistryNamespaces",
        }
    }

    /// Coordinates on the container-orchestration API, or `None` for kinds
    /// served by other control planes (resource controller, registry).
    pub const fn api(self) -> Option<ApiGroup> {
        match self {
            ResourceKind::Pod => Some(ApiGroup::core("pods", "Pod")),
            ResourceKind::Secret => Some(ApiGroup::core("secrets", "Secret")),
            ResourceKind::ConfigMap => Some(ApiGroup::core("configmaps", "ConfigMap")),
            ResourceKind::Application => Some(ApiGroup::named(
                "serving.knative.dev",
                "v1",
                "services",
                "Service",
            )),
            ResourceKind::Revision => Some(ApiGroup::named(
                "serving.knative.dev",
                "v1",
                "revisions",
                "Revision",
            )),
            ResourceKind::Route => Some(ApiGroup::named(
                "serving.knative.dev",
                "v1",
                "routes",
                "Route",
            )),
            ResourceKind::JobDefinition => Some(ApiGroup::named(
                "codeengine.cloud.ibm.com",
                "v1beta1",
                "jobdefinitions",
                "JobDefinition",
            )),
            ResourceKind::JobRun => Some(ApiGroup::named(
                "codeengine.cloud.ibm.com",
                "v1beta1",
                "jobruns",
                "JobRun",
            )),
            ResourceKind::Build => Some(ApiGroup::named(
                "shipwright.io",
                "v1alpha1",
                "builds",
                "Build",
            )),
            ResourceKind::BuildRun => Some(ApiGroup::named(
                "shipwright.io",
                "v1alpha1",
                "buildruns",
                "BuildRun",
            )),
            ResourceKind::Project | ResourceKind::RegistryNamespace => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operation performed against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Operation {
    List = 1,
    Get = 2,
    Create = 3,
    Update = 4,
    Delete = 5,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.index() == index)
    }

    pub const fn verb(self) -> &'static str {
        match self {
            Operation::List => "List",
            Operation::Get => "Get",
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        }
    }

    /// Identifier used for monitoring observations, e.g. `list_jobrun`.
    pub fn monitor_name(self, kind: ResourceKind) -> String {
        format!(
            "{}_{}",
            self.verb().to_ascii_lowercase(),
            kind.name().to_ascii_lowercase()
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

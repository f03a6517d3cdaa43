use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved right to call one backend on behalf of one user for one project.
///
/// Built once per request (or served from cache) and read-only afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDetails {
    /// Namespace or project identifier on the backend.
    pub name: String,
    pub access_token: String,
    pub service_endpoint_base_url: String,
    pub region: String,
    pub guid: String,
}

impl AccessDetails {
    pub fn new(
        name: impl Into<String>,
        access_token: impl Into<String>,
        service_endpoint_base_url: impl Into<String>,
        region: impl Into<String>,
        guid: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            access_token: access_token.into(),
            service_endpoint_base_url: service_endpoint_base_url.into(),
            region: region.into(),
            guid: guid.into(),
        }
    }

    /// Fails with a precondition error when no namespace is known.
    pub fn require_namespace(&self) -> Result<&str> {
        if self.name.trim().is_empty() {
            return Err(DomainError::precondition(
                "access details do not identify a namespace",
            ));
        }
        Ok(&self.name)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.service_endpoint_base_url.trim_end_matches('/')
    }
}

impl fmt::Debug for AccessDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessDetails")
            .field("name", &self.name)
            .field("access_token", &"<redacted>")
            .field("service_endpoint_base_url", &self.service_endpoint_base_url)
            .field("region", &self.region)
            .field("guid", &self.guid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_namespace_is_a_precondition_failure() {
        let access = AccessDetails::new(" ", "t", "https://api", "us-south", "g");
        let err = access.require_namespace().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn serialises_with_camel_case_keys() {
        let access = AccessDetails::new("ns", "tok", "https://api/", "us-south", "guid-1");
        let json = serde_json::to_value(&access).unwrap();
        assert_eq!(json["serviceEndpointBaseUrl"], "https://api/");
        assert_eq!(access.base_url(), "https://api");
    }
}

use crate::resource::{Operation, ResourceKind};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result alias for console access operations.
pub type Result<T> = core::result::Result<T, DomainError>;

/// Shared underlying cause of a [`DomainError`].
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

const RESOURCE_CODE_BASE: u32 = 100_000;

/// Coarse classification of where a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTier {
    /// Caller supplied insufficient identifying data; raised before any I/O.
    Precondition,
    /// Network, timeout or unreadable body.
    Transport,
    /// Backend answered with a structured, semantic failure.
    Protocol,
    /// Response shape defeated parsing or structural expectations.
    Translation,
}

/// Semantic outcome reported by a backend for a failed resource call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FailureReason {
    Generic = 0,
    AlreadyExists = 1,
    BadRequest = 2,
    NotFound = 3,
    Forbidden = 4,
    ExpiredToken = 5,
}

impl FailureReason {
    const ALL: [FailureReason; 6] = [
        FailureReason::Generic,
        FailureReason::AlreadyExists,
        FailureReason::BadRequest,
        FailureReason::NotFound,
        FailureReason::Forbidden,
        FailureReason::ExpiredToken,
    ];

    /// Maps the `reason` field of a backend status object.
    pub fn from_reason(reason: &str) -> Option<Self> {
        match reason {
            "AlreadyExists" => Some(FailureReason::AlreadyExists),
            "BadRequest" => Some(FailureReason::BadRequest),
            "NotFound" => Some(FailureReason::NotFound),
            "Forbidden" => Some(FailureReason::Forbidden),
            "Unauthorized" | "Expired" => Some(FailureReason::ExpiredToken),
            _ => None,
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            401 => FailureReason::ExpiredToken,
            403 => FailureReason::Forbidden,
            404 => FailureReason::NotFound,
            _ => FailureReason::Generic,
        }
    }

    /// A recognised `reason` wins over the HTTP status.
    pub fn classify(status: u16, reason: Option<&str>) -> Self {
        reason
            .and_then(Self::from_reason)
            .unwrap_or_else(|| Self::from_status(status))
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|reason| reason.index() == index)
    }

    const fn suffix(self) -> &'static str {
        match self {
            FailureReason::Generic => "",
            FailureReason::AlreadyExists => "BecauseAlreadyExists",
            FailureReason::BadRequest => "BecauseBadRequest",
            FailureReason::NotFound => "BecauseNotFound",
            FailureReason::Forbidden => "BecauseForbidden",
            FailureReason::ExpiredToken => "BecauseExpiredToken",
        }
    }
}

/// Typed identity of a failure. Numeric codes are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Precondition,
    MissingControlPlaneUrl,
    InvalidConfiguration,
    FailedToGetDelegatedRefreshToken,
    FailedToGetIamTokens,
    FailedToGetNamespaceConfig,
    FailedToGetTenantStatus,
    Resource {
        operation: Operation,
        resource: ResourceKind,
        reason: FailureReason,
    },
}

impl ErrorKind {
    pub const fn resource(operation: Operation, resource: ResourceKind) -> Self {
        ErrorKind::Resource {
            operation,
            resource,
            reason: FailureReason::Generic,
        }
    }

    pub const fn resource_because(
        operation: Operation,
        resource: ResourceKind,
        reason: FailureReason,
    ) -> Self {
        ErrorKind::Resource {
            operation,
            resource,
            reason,
        }
    }

    pub const fn code(self) -> u32 {
        match self {
            ErrorKind::Precondition => 1001,
            ErrorKind::MissingControlPlaneUrl => 1002,
            ErrorKind::InvalidConfiguration => 1003,
            ErrorKind::FailedToGetDelegatedRefreshToken => 2001,
            ErrorKind::FailedToGetIamTokens => 2002,
            ErrorKind::FailedToGetNamespaceConfig => 3001,
            ErrorKind::FailedToGetTenantStatus => 3002,
            ErrorKind::Resource {
                operation,
                resource,
                reason,
            } => {
                RESOURCE_CODE_BASE
                    + resource.index() as u32 * 1000
                    + operation.index() as u32 * 10
                    + reason.index() as u32
            }
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let fixed = [
            ErrorKind::Precondition,
            ErrorKind::MissingControlPlaneUrl,
            ErrorKind::InvalidConfiguration,
            ErrorKind::FailedToGetDelegatedRefreshToken,
            ErrorKind::FailedToGetIamTokens,
            ErrorKind::FailedToGetNamespaceConfig,
            ErrorKind::FailedToGetTenantStatus,
        ];
        if let Some(kind) = fixed.into_iter().find(|kind| kind.code() == code) {
            return Some(kind);
        }

        let offset = code.checked_sub(RESOURCE_CODE_BASE)?;
        let resource = ResourceKind::from_index(u16::try_from(offset / 1000).ok()?)?;
        let operation = Operation::from_index(u8::try_from((offset % 1000) / 10).ok()?)?;
        let reason = FailureReason::from_index(u8::try_from(offset % 10).ok()?)?;
        Some(ErrorKind::Resource {
            operation,
            resource,
            reason,
        })
    }

    /// Variant name, e.g. `FailedToCreateJobDefinitionBecauseAlreadyExistsError`.
    pub fn name(self) -> Cow<'static, str> {
        match self {
            ErrorKind::Precondition => Cow::Borrowed("PreconditionError"),
            ErrorKind::MissingControlPlaneUrl => Cow::Borrowed("MissingControlPlaneUrlError"),
            ErrorKind::InvalidConfiguration => Cow::Borrowed("InvalidConfigurationError"),
            ErrorKind::FailedToGetDelegatedRefreshToken => {
                Cow::Borrowed("FailedToGetDelegatedRefreshTokenError")
            }
            ErrorKind::FailedToGetIamTokens => Cow::Borrowed("FailedToGetIAMTokensError"),
            ErrorKind::FailedToGetNamespaceConfig => {
                Cow::Borrowed("FailedToGetNamespaceConfigError")
            }
            ErrorKind::FailedToGetTenantStatus => Cow::Borrowed("FailedToGetTenantStatusError"),
            ErrorKind::Resource {
                operation,
                resource,
                reason,
            } => {
                let subject = match operation {
                    Operation::List => resource.plural_name(),
                    _ => resource.name(),
                };
                Cow::Owned(format!(
                    "FailedTo{verb}{subject}{suffix}Error",
                    verb = operation.verb(),
                    suffix = reason.suffix()
                ))
            }
        }
    }

    /// Reason component of a resource kind, `None` for standalone kinds.
    pub fn reason(self) -> Option<FailureReason> {
        match self {
            ErrorKind::Resource { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Canonical error surface of the access layer.
///
/// Instances are created at the point of failure and never mutated once
/// handed to a caller. Equality checks should compare [`DomainError::code`].
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct DomainError {
    kind: ErrorKind,
    tier: ErrorTier,
    message: String,
    status: Option<u16>,
    reason: Option<String>,
    details: Option<Value>,
    #[source]
    cause: Option<Cause>,
}

impl DomainError {
    pub fn new(kind: ErrorKind, tier: ErrorTier, message: impl Into<String>) -> Self {
        Self {
            kind,
            tier,
            message: message.into(),
            status: None,
            reason: None,
            details: None,
            cause: None,
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Precondition, ErrorTier::Precondition, message)
    }

    pub fn transport<E>(kind: ErrorKind, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let message = cause.to_string();
        Self::new(kind, ErrorTier::Transport, message).with_cause(Arc::new(cause))
    }

    pub fn protocol(
        kind: ErrorKind,
        status: u16,
        reason: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(kind, ErrorTier::Protocol, message);
        error.status = Some(status);
        error.reason = reason;
        error
    }

    pub fn translation(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, ErrorTier::Translation, message)
    }

    /// Wraps a foreign error, returning it untouched when it already is a
    /// [`DomainError`].
    pub fn wrap<E>(kind: ErrorKind, tier: ErrorTier, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        match boxed.downcast::<DomainError>() {
            Ok(existing) => *existing,
            Err(other) => {
                let message = other.to_string();
                Self::new(kind, tier, message).with_cause(Arc::from(other))
            }
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    pub fn name(&self) -> Cow<'static, str> {
        self.kind.name()
    }

    pub fn tier(&self) -> ErrorTier {
        self.tier
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

/// Attach operation context to foreign errors without double-wrapping.
pub trait ResultExt<T> {
    fn or_wrap(self, kind: ErrorKind, tier: ErrorTier) -> Result<T>;
}

impl<T, E> ResultExt<T> for core::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_wrap(self, kind: ErrorKind, tier: ErrorTier) -> Result<T> {
        self.map_err(|err| DomainError::wrap(kind, tier, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn resource_names_follow_operation_and_reason() {
        let kind = ErrorKind::resource_because(
            Operation::Create,
            ResourceKind::JobDefinition,
            FailureReason::AlreadyExists,
        );
        assert_eq!(
            kind.name(),
            "FailedToCreateJobDefinitionBecauseAlreadyExistsError"
        );
        assert_eq!(
            ErrorKind::resource(Operation::List, ResourceKind::JobRun).name(),
            "FailedToListJobRunsError"
        );
        assert_eq!(ErrorKind::FailedToGetIamTokens.name(), "FailedToGetIAMTokensError");
    }

    #[test]
    fn codes_are_distinct_and_reversible() {
        let mut seen = std::collections::HashSet::new();
        for resource in ResourceKind::ALL {
            for operation in Operation::ALL {
                for reason in FailureReason::ALL {
                    let kind = ErrorKind::resource_because(operation, resource, reason);
                    assert!(seen.insert(kind.code()), "duplicate code for {kind}");
                    assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
                }
            }
        }
        assert_eq!(ErrorKind::from_code(2002), Some(ErrorKind::FailedToGetIamTokens));
        assert_eq!(ErrorKind::from_code(42), None);
    }

    #[test]
    fn create_conflict_code_differs_from_generic_create() {
        let generic = ErrorKind::resource(Operation::Create, ResourceKind::JobDefinition);
        let conflict = ErrorKind::resource_because(
            Operation::Create,
            ResourceKind::JobDefinition,
            FailureReason::AlreadyExists,
        );
        assert_ne!(generic.code(), conflict.code());
    }

    #[test]
    fn classification_prefers_reason_over_status() {
        assert_eq!(
            FailureReason::classify(409, Some("AlreadyExists")),
            FailureReason::AlreadyExists
        );
        assert_eq!(
            FailureReason::classify(400, Some("BadRequest")),
            FailureReason::BadRequest
        );
        assert_eq!(FailureReason::classify(409, Some("Conflict")), FailureReason::Generic);
        assert_eq!(FailureReason::classify(404, None), FailureReason::NotFound);
        assert_eq!(FailureReason::classify(500, None), FailureReason::Generic);
    }

    #[test]
    fn wrap_does_not_double_wrap() {
        let original = DomainError::precondition("namespace is required");
        let wrapped = DomainError::wrap(
            ErrorKind::FailedToGetNamespaceConfig,
            ErrorTier::Transport,
            original.clone(),
        );
        assert_eq!(wrapped.code(), original.code());
        assert_eq!(wrapped.tier(), ErrorTier::Precondition);
    }

    #[test]
    fn wrap_keeps_foreign_cause() {
        let io = std::io::Error::other("connection reset");
        let wrapped = Err::<(), _>(io)
            .or_wrap(ErrorKind::FailedToGetTenantStatus, ErrorTier::Transport);
        let err = wrapped.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedToGetTenantStatus);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "FailedToGetTenantStatusError: connection reset");
    }
}

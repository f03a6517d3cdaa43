use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Authenticated user on whose behalf backend calls are made.
#[derive(Clone)]
pub struct Principal {
    subject: String,
    account_id: Option<String>,
    refresh_token: String,
}

impl Principal {
    pub fn new(subject: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            account_id: None,
            refresh_token: refresh_token.into(),
        }
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Stable identity of the user (IAM id), used as part of token cache keys.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("subject", &self.subject)
            .field("account_id", &self.account_id)
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Per-request context created at the HTTP entry point and passed by
/// reference through every call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    transaction_id: String,
    started_at: Instant,
    principal: Option<Principal>,
}

impl RequestContext {
    pub fn new(transaction_id: impl Into<String>, principal: Option<Principal>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            started_at: Instant::now(),
            principal,
        }
    }

    /// Context with a freshly generated transaction id.
    pub fn generate(principal: Option<Principal>) -> Self {
        Self::new(Uuid::new_v4().to_string(), principal)
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_refresh_token() {
        let principal = Principal::new("IBMid-123", "super-secret").with_account("acc");
        let rendered = format!("{principal:?}");
        assert!(rendered.contains("IBMid-123"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn generated_contexts_have_distinct_ids() {
        let a = RequestContext::generate(None);
        let b = RequestContext::generate(None);
        assert_ne!(a.transaction_id(), b.transaction_id());
        assert!(a.principal().is_none());
    }
}

//! JSON calls against endpoints outside the namespaced resource API: the
//! control plane's project routes, the container registry and the resource
//! controller.

use console_access_core::client::{JSON_CONTENT_TYPE, NO_CACHE, parse_json, protocol_error};
use console_access_core::{CallFamily, Transport};
use console_access_spec::{DomainError, ErrorKind, Operation, ResourceKind, Result};
use reqwest::Method;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

/// Header carrying the account id on container registry calls.
pub const ACCOUNT_HEADER: &str = "Account";

/// How a non-2xx answer is classified.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Fixed(ErrorKind),
    Resource(Operation, ResourceKind),
}

impl Failure {
    fn kind(self) -> ErrorKind {
        match self {
            Failure::Fixed(kind) => kind,
            Failure::Resource(operation, resource) => ErrorKind::resource(operation, resource),
        }
    }

    fn protocol(self, status: u16, body: &str) -> DomainError {
        match self {
            Failure::Resource(operation, resource) => {
                protocol_error(operation, resource, status, body)
            }
            Failure::Fixed(kind) => {
                let parsed = serde_json::from_str::<Value>(body)
                    .ok()
                    .filter(Value::is_object);
                let reason = parsed
                    .as_ref()
                    .and_then(|value| value.get("reason"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let error = DomainError::protocol(
                    kind,
                    status,
                    reason,
                    format!("backend answered with status {status}"),
                );
                match parsed {
                    Some(details) => error.with_details(details),
                    None => error,
                }
            }
        }
    }
}

pub(crate) struct JsonCall<'a> {
    pub operation: &'a str,
    pub method: Method,
    pub url: String,
    pub token: &'a str,
    pub account: Option<&'a str>,
    pub body: Option<&'a Value>,
    pub failure: Failure,
}

impl<'a> JsonCall<'a> {
    pub fn get(operation: &'a str, url: String, token: &'a str, failure: Failure) -> Self {
        Self {
            operation,
            method: Method::GET,
            url,
            token,
            account: None,
            body: None,
            failure,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn account(mut self, account: &'a str) -> Self {
        self.account = Some(account);
        self
    }

    pub fn body(mut self, body: &'a Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Send one call and parse its 2xx body. An empty body reads as `null`.
pub(crate) async fn send_json(transport: &Transport, call: JsonCall<'_>) -> Result<Value> {
    let kind = call.failure.kind();
    let family = if call.method == Method::GET {
        CallFamily::Read
    } else {
        CallFamily::Write
    };
    let payload = match call.body {
        Some(body) => Some(serde_json::to_vec(body).map_err(|err| {
            DomainError::translation(kind, format!("failed to encode body: {err}"))
        })?),
        None => None,
    };

    debug!(method = %call.method, url = %call.url, "calling backend endpoint");
    let response = transport
        .execute(call.operation, family, |client| {
            let mut builder = client
                .request(call.method.clone(), &call.url)
                .header(ACCEPT, JSON_CONTENT_TYPE)
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .header(CACHE_CONTROL, NO_CACHE)
                .bearer_auth(call.token);
            if let Some(account) = call.account {
                builder = builder.header(ACCOUNT_HEADER, account);
            }
            match &payload {
                Some(bytes) => builder.body(bytes.clone()),
                None => builder,
            }
        })
        .await
        .map_err(|err| DomainError::transport(kind, err))?;

    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|err| DomainError::transport(kind, err))?;
    if !(200..300).contains(&status) {
        return Err(call.failure.protocol(status, &text));
    }
    parse_json(kind, &text)
}

/// Rejects blank values and values that would escape a single path segment.
pub(crate) fn path_segment<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        return Err(DomainError::precondition(format!(
            "{what} must be a non-empty path segment"
        )));
    }
    Ok(trimmed)
}

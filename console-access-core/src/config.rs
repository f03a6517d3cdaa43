use crate::http::{RetryPolicy, TimeoutPolicy};
use crate::token::{Receiver, StaticCredentials};
use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_IAM_ENDPOINT: &str = "https://iam.cloud.ibm.com";
const DEFAULT_RESOURCE_CONTROLLER_ENDPOINT: &str = "https://resource-controller.cloud.ibm.com";
const DEFAULT_CACHE_CAPACITY: usize = 1024;

const REGION_ENDPOINTS_ENV: &str = "CONSOLE_REGION_ENDPOINTS";
const IAM_ENDPOINT_ENV: &str = "CONSOLE_IAM_ENDPOINT";
const RESOURCE_CONTROLLER_ENV: &str = "CONSOLE_RESOURCE_CONTROLLER_ENDPOINT";
const REGISTRY_ENDPOINTS_ENV: &str = "CONSOLE_REGISTRY_ENDPOINTS";
const RETRIES_ENV: &str = "CONSOLE_HTTP_RETRIES";
const RETRY_DELAY_ENV: &str = "CONSOLE_HTTP_RETRY_DELAY_MS";
const READ_TIMEOUT_ENV: &str = "CONSOLE_HTTP_READ_TIMEOUT_MS";
const WRITE_TIMEOUT_ENV: &str = "CONSOLE_HTTP_WRITE_TIMEOUT_MS";
const TOKEN_TIMEOUT_ENV: &str = "CONSOLE_HTTP_TOKEN_TIMEOUT_MS";
const STATIC_ACCESS_TOKEN_ENV: &str = "CONSOLE_STATIC_ACCESS_TOKEN";
const STATIC_REFRESH_TOKEN_ENV: &str = "CONSOLE_STATIC_REFRESH_TOKEN";

/// OAuth client registered for one receiver of delegated tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct ReceiverCredential {
    client_id: String,
    client_secret: String,
}

impl ReceiverCredential {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `Authorization` header value for the identity service.
    pub fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for ReceiverCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverCredential")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Process-level configuration consumed by the access layer.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    region_endpoints: BTreeMap<String, String>,
    registry_endpoints: BTreeMap<String, String>,
    iam_endpoint: String,
    resource_controller_endpoint: String,
    receivers: BTreeMap<Receiver, ReceiverCredential>,
    retry: RetryPolicy,
    timeouts: TimeoutPolicy,
    static_credentials: Option<StaticCredentials>,
    cache_capacity: usize,
}

impl CoreConfig {
    pub fn new() -> Self {
        Self {
            region_endpoints: BTreeMap::new(),
            registry_endpoints: BTreeMap::new(),
            iam_endpoint: DEFAULT_IAM_ENDPOINT.to_string(),
            resource_controller_endpoint: DEFAULT_RESOURCE_CONTROLLER_ENDPOINT.to_string(),
            receivers: BTreeMap::new(),
            retry: RetryPolicy::default(),
            timeouts: TimeoutPolicy::default(),
            static_credentials: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Load configuration from `CONSOLE_*` environment variables.
    ///
    /// * `CONSOLE_REGION_ENDPOINTS` maps regions to control-plane URLs
    ///   (`us-south=https://..,eu-de=https://..`).
    /// * `CONSOLE_<RECEIVER>_CLIENT_ID` / `_CLIENT_SECRET` register the OAuth
    ///   clients used for token delegation.
    /// * `CONSOLE_STATIC_ACCESS_TOKEN` switches to static offline credentials.
    pub fn from_env() -> Result<Self> {
        let mut config = CoreConfig::new();

        if let Some(raw) = non_empty_var(REGION_ENDPOINTS_ENV) {
            config.region_endpoints = parse_endpoint_map(&raw)
                .with_context(|| format!("failed to parse {REGION_ENDPOINTS_ENV}"))?;
        }
        if let Some(raw) = non_empty_var(REGISTRY_ENDPOINTS_ENV) {
            config.registry_endpoints = parse_endpoint_map(&raw)
                .with_context(|| format!("failed to parse {REGISTRY_ENDPOINTS_ENV}"))?;
        }
        if let Some(iam) = non_empty_var(IAM_ENDPOINT_ENV) {
            config.iam_endpoint = iam.trim_end_matches('/').to_string();
        }
        if let Some(rc) = non_empty_var(RESOURCE_CONTROLLER_ENV) {
            config.resource_controller_endpoint = rc.trim_end_matches('/').to_string();
        }

        for receiver in Receiver::ALL {
            let prefix = receiver.env_prefix();
            let id = non_empty_var(&format!("CONSOLE_{prefix}_CLIENT_ID"));
            let secret = non_empty_var(&format!("CONSOLE_{prefix}_CLIENT_SECRET"));
            match (id, secret) {
                (Some(id), Some(secret)) => {
                    config
                        .receivers
                        .insert(receiver, ReceiverCredential::new(id, secret));
                }
                (None, None) => {}
                _ => bail!(
                    "set both CONSOLE_{prefix}_CLIENT_ID and CONSOLE_{prefix}_CLIENT_SECRET"
                ),
            }
        }

        if let Some(retries) = parse_u64(RETRIES_ENV)? {
            config.retry.max_retries = u32::try_from(retries)
                .with_context(|| format!("{RETRIES_ENV} is out of range"))?;
        }
        if let Some(ms) = parse_u64(RETRY_DELAY_ENV)? {
            config.retry.delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(READ_TIMEOUT_ENV)? {
            config.timeouts.read = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(WRITE_TIMEOUT_ENV)? {
            config.timeouts.write = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(TOKEN_TIMEOUT_ENV)? {
            config.timeouts.token = Duration::from_millis(ms);
        }

        if let Some(access_token) = non_empty_var(STATIC_ACCESS_TOKEN_ENV) {
            let refresh_token = non_empty_var(STATIC_REFRESH_TOKEN_ENV);
            config.static_credentials = Some(StaticCredentials::new(access_token, refresh_token));
        }

        Ok(config)
    }

    pub fn region_endpoint(mut self, region: impl Into<String>, url: impl Into<String>) -> Self {
        self.region_endpoints
            .insert(region.into(), url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn registry_endpoint(mut self, region: impl Into<String>, url: impl Into<String>) -> Self {
        self.registry_endpoints
            .insert(region.into(), url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn iam_endpoint(mut self, url: impl Into<String>) -> Self {
        self.iam_endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn resource_controller_endpoint(mut self, url: impl Into<String>) -> Self {
        self.resource_controller_endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn receiver(mut self, receiver: Receiver, credential: ReceiverCredential) -> Self {
        self.receivers.insert(receiver, credential);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn static_credentials(mut self, credentials: StaticCredentials) -> Self {
        self.static_credentials = Some(credentials);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Control-plane URL of a region, `None` when the region is unknown.
    pub fn control_plane_url(&self, region: &str) -> Option<&str> {
        self.region_endpoints.get(region).map(String::as_str)
    }

    pub fn registry_url(&self, region: &str) -> Option<&str> {
        self.registry_endpoints.get(region).map(String::as_str)
    }

    pub fn iam_url(&self) -> &str {
        &self.iam_endpoint
    }

    pub fn resource_controller_url(&self) -> &str {
        &self.resource_controller_endpoint
    }

    pub fn receiver_credential(&self, receiver: Receiver) -> Option<&ReceiverCredential> {
        self.receivers.get(&receiver)
    }

    pub fn receivers(&self) -> &BTreeMap<Receiver, ReceiverCredential> {
        &self.receivers
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        self.timeouts
    }

    pub fn static_credential(&self) -> Option<&StaticCredentials> {
        self.static_credentials.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.cache_capacity
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig::new()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_u64(name: &str) -> Result<Option<u64>> {
    non_empty_var(name)
        .map(|value| {
            value
                .parse::<u64>()
                .with_context(|| format!("{name} must be a non-negative integer, got {value:?}"))
        })
        .transpose()
}

fn parse_endpoint_map(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (region, url) = entry
            .split_once('=')
            .with_context(|| format!("expected region=url, got {entry:?}"))?;
        let region = region.trim();
        let url = url.trim();
        if region.is_empty() || url.is_empty() {
            bail!("expected region=url, got {entry:?}");
        }
        url::Url::parse(url).with_context(|| format!("invalid URL for region {region}"))?;
        map.insert(region.to_string(), url.trim_end_matches('/').to_string());
    }
    Ok(map)
}

//! Outbound HTTP with bounded retries, per-family timeouts and one monitoring
//! observation per call.

use crate::config::CoreConfig;
use anyhow::Context;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 250;
const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_TOKEN_TIMEOUT_MS: u64 = 15_000;

/// Fixed-delay retry budget applied to transport-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one.
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRIES,
            Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        )
    }
}

/// Operation family used to pick a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFamily {
    Read,
    Write,
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub read: Duration,
    pub write: Duration,
    pub token: Duration,
}

impl TimeoutPolicy {
    pub fn for_family(&self, family: CallFamily) -> Duration {
        match family {
            CallFamily::Read => self.read,
            CallFamily::Write => self.write,
            CallFamily::Token => self.token,
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            read: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            write: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            token: Duration::from_millis(DEFAULT_TOKEN_TIMEOUT_MS),
        }
    }
}

/// Timing and outcome of one logical backend call (all attempts included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub operation: String,
    /// Final HTTP status, `None` when no response was received.
    pub status: Option<u16>,
    pub success: bool,
    pub elapsed: Duration,
    pub attempts: u32,
}

/// Receives one [`Observation`] per backend call.
pub trait Monitor: Send + Sync {
    fn observe(&self, observation: &Observation);
}

/// Emits observations as structured tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitor;

impl Monitor for TracingMonitor {
    fn observe(&self, observation: &Observation) {
        info!(
            operation = %observation.operation,
            status = ?observation.status,
            success = observation.success,
            elapsed_ms = observation.elapsed.as_millis() as u64,
            attempts = observation.attempts,
            "backend call"
        );
    }
}

/// Shared HTTP client plus the retry, timeout and monitoring policies.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    retry: RetryPolicy,
    timeouts: TimeoutPolicy,
    monitor: Arc<dyn Monitor>,
}

impl Transport {
    pub fn new(
        retry: RetryPolicy,
        timeouts: TimeoutPolicy,
        monitor: Arc<dyn Monitor>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self::with_client(client, retry, timeouts, monitor))
    }

    pub fn with_client(
        client: Client,
        retry: RetryPolicy,
        timeouts: TimeoutPolicy,
        monitor: Arc<dyn Monitor>,
    ) -> Self {
        Self {
            client,
            retry,
            timeouts,
            monitor,
        }
    }

    /// Transport configured from [`CoreConfig`], reporting to a [`TracingMonitor`].
    pub fn from_config(config: &CoreConfig) -> anyhow::Result<Self> {
        Self::new(
            config.retry_policy(),
            config.timeout_policy(),
            Arc::new(TracingMonitor),
        )
        .context("failed to build reqwest client for console transport")
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run one logical call.
    ///
    /// `build` is invoked once per attempt. Connection failures, timeouts and
    /// 502/503/504 answers are retried up to the policy's budget; any other
    /// response is handed back untouched.
    pub async fn execute<F>(
        &self,
        operation: &str,
        family: CallFamily,
        build: F,
    ) -> Result<Response, reqwest::Error>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let started = Instant::now();
        let timeout = self.timeouts.for_family(family);
        let mut attempts = 0u32;

        let outcome = loop {
            attempts += 1;
            debug!(operation, attempt = attempts, "sending backend request");
            let result = build(&self.client).timeout(timeout).send().await;

            let retryable = match &result {
                Ok(response) => is_retryable_status(response.status()),
                Err(err) => is_retryable_error(err),
            };
            if !retryable || attempts > self.retry.max_retries {
                break result;
            }

            match &result {
                Ok(response) => warn!(
                    operation,
                    attempt = attempts,
                    status = response.status().as_u16(),
                    "retrying backend call after gateway failure"
                ),
                Err(err) => warn!(
                    operation,
                    attempt = attempts,
                    error = %err,
                    "retrying backend call after transport failure"
                ),
            }
            tokio::time::sleep(self.retry.delay).await;
        };

        let status = outcome
            .as_ref()
            .ok()
            .map(|response| response.status().as_u16());
        self.monitor.observe(&Observation {
            operation: operation.to_string(),
            status,
            success: status.is_some_and(|code| (200..300).contains(&code)),
            elapsed: started.elapsed(),
            attempts,
        });

        outcome
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

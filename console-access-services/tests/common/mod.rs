#![allow(dead_code)]

use console_access_core::{
    CoreConfig, MemoryCacheStore, Receiver, ReceiverCredential, RetryPolicy, StaticCredentials,
    TimeoutPolicy, TracingMonitor, Transport,
};
use console_access_services::Console;
use console_access_spec::{AccessDetails, Principal, RequestContext};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REGION: &str = "us-south";
pub const GUID: &str = "guid-1";

/// Every endpoint of the configuration points at `server`.
pub fn config(server: &MockServer) -> CoreConfig {
    CoreConfig::new()
        .region_endpoint(REGION, server.uri())
        .registry_endpoint(REGION, server.uri())
        .iam_endpoint(server.uri())
        .resource_controller_endpoint(server.uri())
        .receiver(Receiver::CodeEngine, ReceiverCredential::new("ce-client", "ce-secret"))
        .receiver(
            Receiver::ResourceController,
            ReceiverCredential::new("rc-client", "rc-secret"),
        )
        .receiver(
            Receiver::ContainerRegistry,
            ReceiverCredential::new("cr-client", "cr-secret"),
        )
        .cache_capacity(32)
}

fn transport() -> Arc<Transport> {
    let timeouts = TimeoutPolicy {
        read: Duration::from_secs(2),
        write: Duration::from_secs(2),
        token: Duration::from_secs(2),
    };
    Arc::new(
        Transport::new(
            RetryPolicy::new(2, Duration::from_millis(5)),
            timeouts,
            Arc::new(TracingMonitor),
        )
        .unwrap(),
    )
}

pub fn console_with(config: CoreConfig) -> Console {
    Console::new(config, transport(), Arc::new(MemoryCacheStore::new(32)))
}

/// Console exchanging tokens against the mocked identity endpoint.
pub fn console(server: &MockServer) -> Console {
    console_with(config(server))
}

/// Console holding the static `dev-access` token.
pub fn static_console(server: &MockServer) -> Console {
    console_with(config(server).static_credentials(StaticCredentials::new("dev-access", None)))
}

/// Both exchange hops, each expected `times` times.
pub async fn mount_token_exchange(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .and(query_param("response_type", "delegated_refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"delegated_refresh_token": "delegated"})),
        )
        .expect(times)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .and(query_param("response_type", "cloud_iam"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "iam-access",
            "expires_in": 3600
        })))
        .expect(times)
        .mount(server)
        .await;
}

pub fn access(server: &MockServer) -> AccessDetails {
    AccessDetails::new("ns1", "dev-access", server.uri(), REGION, GUID)
}

pub fn ctx() -> RequestContext {
    RequestContext::new(
        "tx-7",
        Some(Principal::new("IBMid-42", "user-refresh").with_account("acc-1")),
    )
}

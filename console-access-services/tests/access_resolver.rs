mod common;

use common::{GUID, REGION, console, ctx, mount_token_exchange};
use console_access_spec::{ErrorKind, ErrorTier};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn cached_namespace_config_skips_the_exchange_chain() {
    let server = MockServer::start().await;
    mount_token_exchange(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/project/{GUID}/config")))
        .and(header("Authorization", "Bearer iam-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"namespace": "ns-abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let console = console(&server);
    let ctx = ctx();
    let first = console.access.namespace_config(&ctx, REGION, GUID).await.unwrap();
    let second = console.access.namespace_config(&ctx, REGION, GUID).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.name, "ns-abc");
    assert_eq!(first.access_token, "iam-access");
    assert_eq!(first.base_url(), server.uri());
    assert_eq!(first.region, REGION);
    assert_eq!(first.guid, GUID);
}

#[tokio::test]
async fn unknown_region_fails_without_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let console = console(&server);
    let err = console
        .access
        .namespace_config(&ctx(), "eu-nowhere", GUID)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingControlPlaneUrl);
    assert_eq!(err.name(), "MissingControlPlaneUrlError");
    assert_eq!(err.tier(), ErrorTier::Precondition);
}

#[tokio::test]
async fn namespace_config_failures_are_typed_and_not_cached() {
    let server = MockServer::start().await;
    mount_token_exchange(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/project/{GUID}/config")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"reason": "Forbidden"})))
        .expect(2)
        .mount(&server)
        .await;

    let console = console(&server);
    for _ in 0..2 {
        let err = console
            .access
            .namespace_config(&ctx(), REGION, GUID)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedToGetNamespaceConfig);
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.reason(), Some("Forbidden"));
    }
}

#[tokio::test]
async fn only_ready_tenant_status_is_cached() {
    let server = MockServer::start().await;
    mount_token_exchange(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/project/{GUID}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "deploying"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/project/{GUID}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ready",
            "domain": "abc.us-south.codeengine.appdomain.cloud"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = console(&server);
    let ctx = ctx();
    let pending = console.access.tenant_status(&ctx, REGION, GUID).await.unwrap();
    assert!(!pending.is_ready());

    for _ in 0..2 {
        let ready = console.access.tenant_status(&ctx, REGION, GUID).await.unwrap();
        assert!(ready.is_ready());
        assert_eq!(
            ready.domain.as_deref(),
            Some("abc.us-south.codeengine.appdomain.cloud")
        );
    }
}

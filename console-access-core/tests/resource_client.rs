mod common;

use common::{RecordingMonitor, access, ctx, transport, transport_with};
use console_access_core::{ListQuery, ResourceClient};
use console_access_spec::{
    AccessDetails, ErrorKind, ErrorTier, FailureReason, Operation, ResourceKind,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, headers, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JOBRUNS: &str = "/apis/codeengine.cloud.ibm.com/v1beta1/namespaces/ns1/jobruns";

#[tokio::test]
async fn malformed_list_body_is_an_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JOBRUNS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let list = client
        .list(&ctx(), &access(&server), ResourceKind::JobRun, &ListQuery::new())
        .await
        .unwrap();

    assert!(list.is_empty());
    assert_eq!(
        serde_json::to_value(&list).unwrap(),
        json!({"items": [], "metadata": {}})
    );
}

#[tokio::test]
async fn list_sends_headers_and_sorts_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/ns1/pods"))
        .and(query_param("limit", "500"))
        .and(query_param("labelSelector", "serving.knative.dev/service=web"))
        .and(query_param("continue", "page=2"))
        .and(header("Authorization", "Bearer user-token"))
        .and(header("Accept", "application/json"))
        .and(headers("Cache-Control", vec!["max-age=0", "no-cache", "no-store"]))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "PodList",
            "metadata": {"continue": "page%3D3"},
            "items": [
                {"metadata": {"name": "old", "creationTimestamp": "2021-01-01T00:00:00Z"}},
                {"metadata": {"name": "undated"}},
                {"metadata": {"name": "new", "creationTimestamp": "2024-01-01T00:00:00Z"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let query = ListQuery::new()
        .label_selector("serving.knative.dev/service=web")
        .continue_from("page%3D2");
    let list = client
        .list(&ctx(), &access(&server), ResourceKind::Pod, &query)
        .await
        .unwrap();

    let names: Vec<_> = list
        .items
        .iter()
        .map(|item| item["metadata"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["new", "old", "undated"]);
    assert_eq!(list.continue_token(), Some("page%3D3"));
}

#[tokio::test]
async fn list_all_follows_continuation_sequentially() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JOBRUNS))
        .and(query_param("continue", "second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "JobRunList",
            "items": [{"metadata": {"name": "b", "creationTimestamp": "2024-03-01T00:00:00Z"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JOBRUNS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "JobRunList",
            "metadata": {"continue": "second"},
            "items": [{"metadata": {"name": "a", "creationTimestamp": "2024-01-01T00:00:00Z"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let list = client
        .list_all(&ctx(), &access(&server), ResourceKind::JobRun, &ListQuery::new())
        .await
        .unwrap();
    let names: Vec<_> = list
        .items
        .iter()
        .map(|item| item["metadata"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["b", "a"]);
    assert!(list.continue_token().is_none());
}

#[tokio::test]
async fn missing_namespace_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let no_namespace = AccessDetails::new("", "tok", server.uri(), "us-south", "guid-1");
    let err = client
        .list(&ctx(), &no_namespace, ResourceKind::Pod, &ListQuery::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(err.tier(), ErrorTier::Precondition);

    let err = client
        .get(&ctx(), &access(&server), ResourceKind::Pod, " ", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[tokio::test]
async fn create_conflict_maps_to_already_exists_variant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/apis/codeengine.cloud.ibm.com/v1beta1/namespaces/ns1/jobdefinitions",
        ))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "kind": "Status",
            "status": "Failure",
            "reason": "AlreadyExists",
            "message": "jobdefinitions \"nightly\" already exists",
            "code": 409
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let err = client
        .create(
            &ctx(),
            &access(&server),
            ResourceKind::JobDefinition,
            &json!({"metadata": {"name": "nightly"}}),
        )
        .await
        .unwrap_err();

    let conflict = ErrorKind::resource_because(
        Operation::Create,
        ResourceKind::JobDefinition,
        FailureReason::AlreadyExists,
    );
    assert_eq!(err.code(), conflict.code());
    assert_ne!(
        err.code(),
        ErrorKind::resource(Operation::Create, ResourceKind::JobDefinition).code()
    );
    assert_eq!(err.name(), "FailedToCreateJobDefinitionBecauseAlreadyExistsError");
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.reason(), Some("AlreadyExists"));
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/ns1/secrets/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "kind": "Status", "status": "Failure", "reason": "NotFound"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let err = client
        .get(&ctx(), &access(&server), ResourceKind::Secret, "missing", None)
        .await
        .unwrap_err();
    assert_eq!(err.name(), "FailedToGetSecretBecauseNotFoundError");
    assert_eq!(err.tier(), ErrorTier::Protocol);
}

#[tokio::test]
async fn gateway_failures_are_retried_and_observed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/ns1/configmaps/settings"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/ns1/configmaps/settings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"metadata": {"name": "settings"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let monitor = Arc::new(RecordingMonitor::default());
    let client = ResourceClient::new(transport_with(monitor.clone()));
    let body = client
        .get(&ctx(), &access(&server), ResourceKind::ConfigMap, "settings", None)
        .await
        .unwrap();
    assert_eq!(body["metadata"]["name"], "settings");

    let observations = monitor.observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].operation, "get_configmap");
    assert_eq!(observations[0].attempts, 3);
    assert_eq!(observations[0].status, Some(200));
    assert!(observations[0].success);
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let err = client
        .get(&ctx(), &access(&server), ResourceKind::Build, "b", None)
        .await
        .unwrap_err();
    assert_eq!(err.name(), "FailedToGetBuildError");
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn update_uses_merge_patch_and_requires_name_in_patch() {
    let server = MockServer::start().await;
    let patch = json!({"metadata": {"name": "web"}, "spec": {"template": {}}});
    Mock::given(method("PATCH"))
        .and(path("/apis/serving.knative.dev/v1/namespaces/ns1/services/web"))
        .and(header("Content-Type", "application/merge-patch+json"))
        .and(body_json(&patch))
        .respond_with(ResponseTemplate::new(200).set_body_json(&patch))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let updated = client
        .update(&ctx(), &access(&server), ResourceKind::Application, "web", &patch)
        .await
        .unwrap();
    assert_eq!(updated, patch);

    let err = client
        .update(
            &ctx(),
            &access(&server),
            ResourceKind::Application,
            "web",
            &json!({"spec": {}}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[tokio::test]
async fn update_rejects_a_patch_for_another_object() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let err = client
        .update(
            &ctx(),
            &access(&server),
            ResourceKind::ConfigMap,
            "b",
            &json!({"metadata": {"name": "a"}}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(err.tier(), ErrorTier::Precondition);
}

#[tokio::test]
async fn delete_requires_success_status() {
    let server = MockServer::start().await;
    let options = json!({
        "kind": "DeleteOptions",
        "apiVersion": "v1",
        "propagationPolicy": "Foreground"
    });
    Mock::given(method("DELETE"))
        .and(path(format!("{JOBRUNS}/done")))
        .and(body_json(&options))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Status", "apiVersion": "v1", "status": "Success"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{JOBRUNS}/odd")))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"kind": "JobRun", "metadata": {}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let status = client
        .delete(&ctx(), &access(&server), ResourceKind::JobRun, "done")
        .await
        .unwrap();
    assert!(status.is_success());

    let err = client
        .delete(&ctx(), &access(&server), ResourceKind::JobRun, "odd")
        .await
        .unwrap_err();
    assert_eq!(err.name(), "FailedToDeleteJobRunError");
    assert_eq!(err.tier(), ErrorTier::Protocol);
    assert_eq!(err.status(), Some(202));
}

#[tokio::test]
async fn invalid_json_is_a_translation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = ResourceClient::new(transport());
    let err = client
        .get(&ctx(), &access(&server), ResourceKind::Pod, "p", None)
        .await
        .unwrap_err();
    assert_eq!(err.tier(), ErrorTier::Translation);
    assert_eq!(err.name(), "FailedToGetPodError");
}

#[tokio::test]
async fn timed_out_reads_are_retried_then_reported_as_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apis/shipwright.io/v1alpha1/namespaces/ns1/builds/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"metadata": {"name": "slow"}}))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(3)
        .mount(&server)
        .await;

    let monitor = Arc::new(RecordingMonitor::default());
    let client = ResourceClient::new(transport_with(monitor.clone()));
    let err = client
        .get(&ctx(), &access(&server), ResourceKind::Build, "slow", None)
        .await
        .unwrap_err();
    assert_eq!(err.tier(), ErrorTier::Transport);
    assert_eq!(err.name(), "FailedToGetBuildError");
    assert!(err.status().is_none());

    let observations = monitor.observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].attempts, 3);
    assert!(!observations[0].success);
}

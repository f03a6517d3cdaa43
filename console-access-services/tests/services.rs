mod common;

use common::{access, console, ctx, mount_token_exchange, static_console};
use console_access_core::ListQuery;
use console_access_services::NewProject;
use console_access_spec::{
    EntityMeta, ErrorKind, ErrorTier, FailureReason, InstancePhase, JobDefinition, Operation,
    RegistryAccess, ResourceKind,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JOBS_API: &str = "/apis/codeengine.cloud.ibm.com/v1beta1/namespaces/ns1";

#[tokio::test]
async fn empty_object_job_list_reads_as_no_jobs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{JOBS_API}/jobdefinitions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let list = console
        .jobs
        .list_definitions(&ctx(), &access(&server), &ListQuery::new())
        .await
        .unwrap();
    assert!(list.is_empty());
    assert!(list.continue_token().is_none());
}

#[tokio::test]
async fn job_runs_can_be_narrowed_to_one_definition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{JOBS_API}/jobruns")))
        .and(query_param(
            "labelSelector",
            "codeengine.cloud.ibm.com/job-definition-name=nightly",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "JobRunList",
            "items": [
                {"metadata": {"name": "nightly-a", "creationTimestamp": "2024-01-01T00:00:00Z"}},
                {"metadata": {}},
                {"metadata": {"name": "nightly-b", "creationTimestamp": "2024-02-01T00:00:00Z"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let runs = console
        .jobs
        .list_runs(&ctx(), &access(&server), Some("nightly"), &ListQuery::new())
        .await
        .unwrap();
    let names: Vec<_> = runs.items.iter().map(|run| run.meta.name.as_str()).collect();
    assert_eq!(names, ["nightly-b", "nightly-a"]);
}

#[tokio::test]
async fn duplicate_job_definition_is_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{JOBS_API}/jobdefinitions")))
        .and(header("Authorization", "Bearer dev-access"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "kind": "Status",
            "status": "Failure",
            "reason": "AlreadyExists",
            "code": 409
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let definition = JobDefinition::new("nightly", "icr.io/team/batch:1");
    let err = console
        .jobs
        .create_definition(&ctx(), &access(&server), &definition)
        .await
        .unwrap_err();
    assert_eq!(
        err.kind(),
        ErrorKind::resource_because(
            Operation::Create,
            ResourceKind::JobDefinition,
            FailureReason::AlreadyExists
        )
    );
}

#[tokio::test]
async fn created_job_definition_is_translated_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{JOBS_API}/jobdefinitions")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "metadata": {"name": "nightly", "uid": "u-1"},
            "spec": {"template": {"containers": [{"name": "job", "image": "icr.io/team/batch:1"}]}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let created = console
        .jobs
        .create_definition(
            &ctx(),
            &access(&server),
            &JobDefinition::new("nightly", "icr.io/team/batch:1"),
        )
        .await
        .unwrap();
    assert_eq!(created.meta.id.as_deref(), Some("u-1"));
    assert_eq!(created.image.as_deref(), Some("icr.io/team/batch:1"));
}

#[tokio::test]
async fn untranslatable_get_is_a_translation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apis/serving.knative.dev/v1/namespaces/ns1/services/web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"spec": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let err = console
        .applications
        .get(&ctx(), &access(&server), "web")
        .await
        .unwrap_err();
    assert_eq!(err.tier(), ErrorTier::Translation);
    assert_eq!(err.name(), "FailedToGetApplicationError");
}

#[tokio::test]
async fn application_instances_are_pods_of_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/ns1/pods"))
        .and(query_param("labelSelector", "serving.knative.dev/service=web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "PodList",
            "items": [{
                "metadata": {
                    "name": "web-00001-deployment-abc",
                    "labels": {"serving.knative.dev/revision": "web-00001"}
                },
                "status": {
                    "phase": "Running",
                    "containerStatuses": [{"restartCount": 1}, {"restartCount": 2}]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let instances = console
        .applications
        .list_instances(&ctx(), &access(&server), "web", &ListQuery::new())
        .await
        .unwrap();
    assert_eq!(instances.len(), 1);
    let instance = &instances.items[0];
    assert_eq!(instance.revision.as_deref(), Some("web-00001"));
    assert_eq!(instance.phase, InstancePhase::Running);
    assert_eq!(instance.restarts, 3);
}

#[tokio::test]
async fn build_runs_are_started_from_a_build() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apis/shipwright.io/v1alpha1/namespaces/ns1/buildruns"))
        .and(body_json(json!({
            "apiVersion": "shipwright.io/v1alpha1",
            "kind": "BuildRun",
            "metadata": {
                "generateName": "app-build-run-",
                "labels": {"build.shipwright.io/name": "app-build"}
            },
            "spec": {"buildRef": {"name": "app-build"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "metadata": {"name": "app-build-run-x7k2"},
            "spec": {"buildRef": {"name": "app-build"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let run = console
        .builds
        .create_run(&ctx(), &access(&server), "app-build", None)
        .await
        .unwrap();
    assert_eq!(run.meta.name, "app-build-run-x7k2");
    assert_eq!(run.build_name.as_deref(), Some("app-build"));

    let err = console
        .builds
        .create_run(&ctx(), &access(&server), " ", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[tokio::test]
async fn secret_delete_checks_the_status_object() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/namespaces/ns1/secrets/api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Status", "apiVersion": "v1", "status": "Success"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/namespaces/ns1/configmaps/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Status", "status": "Failure", "reason": "NotFound", "code": 404
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let status = console
        .secrets
        .delete(&ctx(), &access(&server), "api-key")
        .await
        .unwrap();
    assert!(status.is_success());

    let err = console
        .config_maps
        .delete(&ctx(), &access(&server), "settings")
        .await
        .unwrap_err();
    assert_eq!(err.name(), "FailedToDeleteConfigMapBecauseNotFoundError");
}

#[tokio::test]
async fn secret_data_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/ns1/secrets/api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"name": "api-key"},
            "type": "Opaque",
            "data": {"token": "c2VjcmV0"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let secret = console
        .secrets
        .get(&ctx(), &access(&server), "api-key")
        .await
        .unwrap();
    assert_eq!(secret.data.get("token").map(String::as_str), Some("secret"));
}

#[tokio::test]
async fn registry_access_lists_only_docker_config_secrets() {
    let server = MockServer::start().await;
    let docker_config = r#"{"auths":{"icr.io":{"username":"iamapikey","email":"a@b.c"}}}"#;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/ns1/secrets"))
        .and(query_param("fieldSelector", "type=kubernetes.io/dockerconfigjson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "SecretList",
            "items": [{
                "metadata": {"name": "icr-pull"},
                "type": "kubernetes.io/dockerconfigjson",
                "data": {".dockerconfigjson": base64_of(docker_config)}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let list = console
        .registries
        .list_access(&ctx(), &access(&server), &ListQuery::new())
        .await
        .unwrap();
    assert_eq!(
        list.items,
        vec![RegistryAccess {
            meta: EntityMeta::named("icr-pull"),
            server: "icr.io".into(),
            username: Some("iamapikey".into()),
            email: Some("a@b.c".into()),
        }]
    );
}

#[tokio::test]
async fn registry_namespaces_send_the_account_header() {
    let server = MockServer::start().await;
    mount_token_exchange(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .and(header("Account", "acc-1"))
        .and(header("Authorization", "Bearer iam-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["team-b", "team-a"])))
        .expect(1)
        .mount(&server)
        .await;

    let console = console(&server);
    let namespaces = console
        .registries
        .list_namespaces(&ctx(), common::REGION)
        .await
        .unwrap();
    assert_eq!(namespaces, ["team-a", "team-b"]);
}

#[tokio::test]
async fn projects_follow_next_url_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/resource_instances"))
        .and(query_param("start", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": [{"guid": "g-2", "name": "second"}],
            "next_url": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/resource_instances"))
        .and(query_param("type", "service_instance"))
        .and(header("Authorization", "Bearer dev-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": [{"guid": "g-1", "name": "first", "region_id": "us-south"}],
            "next_url": "/v2/resource_instances?start=page2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let projects = console.projects.list_projects(&ctx(), None).await.unwrap();
    let names: Vec<_> = projects.iter().map(|project| project.name.as_str()).collect();
    assert_eq!(names, ["first", "second"]);
}

#[tokio::test]
async fn projects_are_created_and_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/resource_instances"))
        .and(body_json(json!({
            "name": "demo",
            "target": "us-south",
            "resource_group": "rg-1",
            "resource_plan_id": "plan-1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "guid": "g-9", "name": "demo", "state": "provisioning"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/resource_instances/g-9"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let console = static_console(&server);
    let created = console
        .projects
        .create_project(
            &ctx(),
            &NewProject {
                name: "demo".into(),
                region: "us-south".into(),
                resource_group_id: "rg-1".into(),
                resource_plan_id: "plan-1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.guid, "g-9");
    assert_eq!(created.state.as_deref(), Some("provisioning"));

    console.projects.delete_project(&ctx(), "g-9").await.unwrap();
}

fn base64_of(text: &str) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(text)
}

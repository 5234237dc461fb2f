//! HTTP-level tests for the Nomad client against a mock agent.

use nomad::{ClientConfig, Error, NomadClient, Variable, VariableItems};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> NomadClient {
    NomadClient::new(&ClientConfig {
        address: server.uri(),
        token: Some("secret-token".to_string()),
        region: None,
    })
    .unwrap()
}

#[tokio::test]
async fn list_variables_sends_prefix_namespace_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/vars"))
        .and(query_param("prefix", "nomadops/v1/gitrepository/"))
        .and(query_param("namespace", "*"))
        .and(header("X-Nomad-Token", "secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "Namespace": "default",
                "Path": "nomadops/v1/gitrepository/payments",
                "CreateIndex": 10,
                "ModifyIndex": 12,
                "CreateTime": 1_700_000_000,
                "ModifyTime": 1_700_000_100
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let listed = client_for(&server)
        .list_variables("nomadops/v1/gitrepository/", nomad::ALL_NAMESPACES)
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].path, "nomadops/v1/gitrepository/payments");
    assert_eq!(listed[0].modify_index, 12);
}

#[tokio::test]
async fn list_variables_treats_null_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/vars"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let listed = client_for(&server)
        .list_variables("nothing/", "default")
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn read_variable_returns_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/var/nomadops/v1/gitrepository/payments"))
        .and(query_param("namespace", "default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Namespace": "default",
            "Path": "nomadops/v1/gitrepository/payments",
            "ModifyIndex": 12,
            "Items": {
                "controller_name": "nomadops",
                "url": "https://example.test/payments.git"
            }
        })))
        .mount(&server)
        .await;

    let variable = client_for(&server)
        .read_variable("nomadops/v1/gitrepository/payments", "default")
        .await
        .unwrap();

    assert_eq!(variable.items.get("controller_name").unwrap(), "nomadops");
    assert_eq!(variable.items.len(), 2);
}

#[tokio::test]
async fn read_missing_variable_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/var/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("variable not found"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .read_variable("missing", "default")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::VariableNotFound { .. }));
}

#[tokio::test]
async fn upsert_variable_puts_items() {
    let server = MockServer::start().await;
    let mut items = VariableItems::new();
    items.insert("status_current_commit".to_string(), "abc123".to_string());
    let variable = Variable::new("default", "nomadops/v1/gitrepository/payments", items);

    Mock::given(method("PUT"))
        .and(path("/v1/var/nomadops/v1/gitrepository/payments"))
        .and(query_param("namespace", "default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Namespace": "default",
            "Path": "nomadops/v1/gitrepository/payments",
            "ModifyIndex": 13,
            "Items": { "status_current_commit": "abc123" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stored = client_for(&server).upsert_variable(&variable).await.unwrap();
    assert_eq!(stored.modify_index, 13);
}

#[tokio::test]
async fn parse_job_posts_hcl_with_canonicalize() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs/parse"))
        .and(body_json(json!({
            "JobHCL": "job \"web\" {}",
            "Canonicalize": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ID": "web",
            "Name": "web",
            "Meta": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let job = client_for(&server)
        .parse_job("job \"web\" {}")
        .await
        .unwrap();
    assert_eq!(job.get("Name").and_then(|v| v.as_str()), Some("web"));
}

#[tokio::test]
async fn register_job_returns_eval_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .and(body_json(json!({ "Job": { "ID": "web" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "EvalID": "eval-1",
            "EvalCreateIndex": 40,
            "JobModifyIndex": 41,
            "Warnings": ""
        })))
        .mount(&server)
        .await;

    let mut job = serde_json::Map::new();
    job.insert("ID".to_string(), json!("web"));

    let response = client_for(&server).register_job(&job).await.unwrap();
    assert_eq!(response.eval_id, "eval-1");
    assert_eq!(response.job_modify_index, 41);
}

#[tokio::test]
async fn api_errors_carry_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .register_job(&serde_json::Map::new())
        .await
        .unwrap_err();
    match err {
        Error::Api {
            status,
            endpoint,
            body,
        } => {
            assert_eq!(status, 500);
            assert_eq!(endpoint, "/v1/jobs");
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

//! End-to-end handler tests against mocked provider APIs
//!
//! These run the real dispatch table and handlers, pointing the provider
//! clients at a wiremock server through the config endpoint overrides.

use std::time::Duration;

use makerctl_core::{
    AwsSettings, Config, DispatchTable, DoSettings, OpContext, OpParams, PollSettings, Provider,
    ResourceKind, Verb,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn do_config(server: &MockServer) -> Config {
    Config {
        digitalocean: Some(DoSettings {
            token: "dop_v1_test".into(),
            region: "nyc3".into(),
            api_url: server.uri(),
            spaces_key: None,
            spaces_secret: None,
            spaces_endpoint: None,
        }),
        aws: None,
        gcp: None,
    }
}

fn aws_config(server: &MockServer) -> Config {
    Config {
        digitalocean: None,
        aws: Some(AwsSettings {
            access_key_id: "AKIATESTKEY".into(),
            secret_access_key: "testsecret".into(),
            region: "us-east-2".into(),
            endpoint_url: Some(server.uri()),
        }),
        gcp: None,
    }
}

fn fast_poll() -> PollSettings {
    PollSettings::new(Duration::from_millis(10), Duration::from_secs(5))
}

/// `create vm` on DigitalOcean issues exactly one create-droplet call and
/// returns a reference carrying the requested name.
#[tokio::test]
async fn do_create_vm_calls_create_droplet_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "account": {"email": "dev@example.com"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/account/keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ssh_keys": [{"id": 512189, "name": "laptop"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/droplets"))
        .and(body_string_contains("\"name\":\"test-vm\""))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "droplet": {"id": 3164494, "name": "test-vm", "status": "new"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = OpParams::new()
        .with("name", "test-vm")
        .with("size", "s-1vcpu-1gb")
        .with("image", "ubuntu-16-04-x64")
        .with("region", "nyc3");
    let ctx = OpContext::new(do_config(&server), params);

    let output = DispatchTable::builtin()
        .execute(Provider::Do, ResourceKind::Vm, Verb::Create, &ctx)
        .await
        .unwrap();

    let reference = output.reference.expect("create returns a reference");
    assert_eq!(reference.name, "test-vm");
    assert_eq!(reference.id, "3164494");
    assert!(output.summary.contains("test-vm"));
}

/// Duplicate droplet names make `status vm` fail rather than guess.
#[tokio::test]
async fn do_status_vm_rejects_ambiguous_names() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "account": {"email": "dev@example.com"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/droplets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "droplets": [
                {"id": 1, "name": "web", "status": "active"},
                {"id": 2, "name": "web", "status": "active"}
            ]
        })))
        .mount(&server)
        .await;

    let ctx = OpContext::new(do_config(&server), OpParams::new().with("name", "web"));
    let err = DispatchTable::builtin()
        .execute(Provider::Do, ResourceKind::Vm, Verb::Status, &ctx)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("2 vms named 'web'"));
}

fn mount_sts(server: &MockServer) -> impl std::future::Future<Output = ()> + '_ {
    let xml = r#"<GetCallerIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <GetCallerIdentityResult>
    <Arn>arn:aws:iam::123456789012:user/lab</Arn>
    <UserId>AIDATEST</UserId>
    <Account>123456789012</Account>
  </GetCallerIdentityResult>
  <ResponseMetadata><RequestId>test-request</RequestId></ResponseMetadata>
</GetCallerIdentityResponse>"#;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("Action=GetCallerIdentity"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(xml, "text/xml"))
        .mount(server)
}

/// `delete cluster` on AWS polls the node group to a terminal (gone) state
/// before issuing the cluster deletion — node group first, cluster last.
#[tokio::test]
async fn aws_delete_cluster_waits_for_node_group_first() {
    let server = MockServer::start().await;
    mount_sts(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/clusters/demo/node-groups/demo-nodegroup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nodegroup": {"nodegroupName": "demo-nodegroup", "status": "DELETING"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    // First describe still sees the node group, the next one finds it gone.
    Mock::given(method("GET"))
        .and(path("/clusters/demo/node-groups/demo-nodegroup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "nodegroup": {"nodegroupName": "demo-nodegroup", "status": "DELETING"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clusters/demo/node-groups/demo-nodegroup"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-amzn-errortype", "ResourceNotFoundException")
                .set_body_json(serde_json::json!({
                    "message": "No node group found for name: demo-nodegroup"
                })),
        )
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/clusters/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cluster": {"name": "demo", "status": "DELETING"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = OpContext::new(aws_config(&server), OpParams::new().with("name", "demo"))
        .with_poll(fast_poll());

    let output = DispatchTable::builtin()
        .execute(Provider::Aws, ResourceKind::Cluster, Verb::Delete, &ctx)
        .await
        .unwrap();
    assert!(output.summary.contains("demo"));

    // The cluster deletion must be the final call, after the node group
    // polls observed a terminal state.
    let requests = server.received_requests().await.unwrap();
    let last = requests.last().unwrap();
    assert_eq!(last.method.as_str(), "DELETE");
    assert_eq!(last.url.path(), "/clusters/demo");

    let nodegroup_gone_at = requests
        .iter()
        .position(|r| {
            r.method.as_str() == "GET" && r.url.path() == "/clusters/demo/node-groups/demo-nodegroup"
        })
        .expect("node group was polled");
    let cluster_deleted_at = requests
        .iter()
        .position(|r| r.method.as_str() == "DELETE" && r.url.path() == "/clusters/demo")
        .expect("cluster was deleted");
    assert!(nodegroup_gone_at < cluster_deleted_at);
}

/// A node group that was already gone skips the poll and goes straight to
/// cluster deletion.
#[tokio::test]
async fn aws_delete_cluster_skips_poll_when_node_group_absent() {
    let server = MockServer::start().await;
    mount_sts(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/clusters/demo/node-groups/demo-nodegroup"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-amzn-errortype", "ResourceNotFoundException")
                .set_body_json(serde_json::json!({"message": "no such node group"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/clusters/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cluster": {"name": "demo", "status": "DELETING"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = OpContext::new(aws_config(&server), OpParams::new().with("name", "demo"))
        .with_poll(fast_poll());

    DispatchTable::builtin()
        .execute(Provider::Aws, ResourceKind::Cluster, Verb::Delete, &ctx)
        .await
        .unwrap();

    let describes = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert_eq!(describes, 0, "no polling when the node group never existed");
}

/// Missing credentials surface as a config error telling the user to run
/// `auth`, before any network call.
#[tokio::test]
async fn missing_provider_section_is_a_config_error() {
    let ctx = OpContext::new(Config::default(), OpParams::new().with("name", "x"));
    let err = DispatchTable::builtin()
        .execute(Provider::Do, ResourceKind::Vm, Verb::Status, &ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("makerctl auth --provider do"));
}

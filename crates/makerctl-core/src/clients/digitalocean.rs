//! DigitalOcean API client
//!
//! Thin typed wrapper over the v2 REST surface covering exactly what the
//! handlers need: account identity, SSH keys, droplets, managed Kubernetes
//! clusters (including kubeconfig download), and managed databases.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::op::Provider;

const USER_AGENT: &str = concat!("makerctl/", env!("CARGO_PKG_VERSION"));

/// Listings cap at one page of this size; names are expected to be unique
/// well below it.
const PAGE_SIZE: u32 = 200;

pub struct DoClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    account: Account,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SshKeysEnvelope {
    ssh_keys: Vec<SshKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub disk: Option<u64>,
    #[serde(default)]
    pub region: serde_json::Value,
    #[serde(default)]
    pub image: serde_json::Value,
    #[serde(default)]
    pub networks: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DropletEnvelope {
    droplet: Droplet,
}

#[derive(Debug, Deserialize)]
struct DropletsEnvelope {
    droplets: Vec<Droplet>,
}

#[derive(Debug, Serialize)]
pub struct DropletCreateRequest {
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ssh_keys: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesCluster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub status: Option<ClusterStatus>,
    #[serde(default)]
    pub node_pools: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl KubernetesCluster {
    pub fn state(&self) -> &str {
        self.status.as_ref().map(|s| s.state.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct ClusterEnvelope {
    kubernetes_cluster: KubernetesCluster,
}

#[derive(Debug, Deserialize)]
struct ClustersEnvelope {
    kubernetes_clusters: Vec<KubernetesCluster>,
}

#[derive(Debug, Serialize)]
pub struct ClusterCreateRequest {
    pub name: String,
    pub region: String,
    pub version: String,
    pub node_pools: Vec<NodePoolCreateRequest>,
}

#[derive(Debug, Serialize)]
pub struct NodePoolCreateRequest {
    pub name: String,
    pub size: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub num_nodes: Option<u32>,
    #[serde(default)]
    pub connection: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatabaseEnvelope {
    database: Database,
}

#[derive(Debug, Deserialize)]
struct DatabasesEnvelope {
    databases: Vec<Database>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseCreateRequest {
    pub name: String,
    pub engine: String,
    pub version: String,
    pub region: String,
    pub size: String,
    pub num_nodes: u32,
}

impl DoClient {
    pub fn new(token: &str, base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CoreError::provider(Provider::Do, e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!(%url, "DigitalOcean API call");
        let mut request = self.http.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CoreError::provider(Provider::Do, format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_default();
        let message = if message.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            format!("HTTP {}: {}", status.as_u16(), message)
        };
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(CoreError::auth(Provider::Do, message))
        } else {
            Err(CoreError::provider(Provider::Do, message))
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let response = self.send(method, path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CoreError::provider(Provider::Do, format!("invalid response body: {e}")))
    }

    /// Account identity; doubles as the eager credential check.
    pub async fn account(&self) -> Result<Account> {
        let envelope: AccountEnvelope = self.request(Method::GET, "/v2/account", None).await?;
        Ok(envelope.account)
    }

    pub async fn list_ssh_keys(&self) -> Result<Vec<SshKey>> {
        let path = format!("/v2/account/keys?page=1&per_page={PAGE_SIZE}");
        let envelope: SshKeysEnvelope = self.request(Method::GET, &path, None).await?;
        Ok(envelope.ssh_keys)
    }

    pub async fn create_droplet(&self, request: &DropletCreateRequest) -> Result<Droplet> {
        let body = serde_json::to_value(request)
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        let envelope: DropletEnvelope = self
            .request(Method::POST, "/v2/droplets", Some(&body))
            .await?;
        Ok(envelope.droplet)
    }

    pub async fn list_droplets(&self) -> Result<Vec<Droplet>> {
        let path = format!("/v2/droplets?page=1&per_page={PAGE_SIZE}");
        let envelope: DropletsEnvelope = self.request(Method::GET, &path, None).await?;
        Ok(envelope.droplets)
    }

    pub async fn get_droplet(&self, id: u64) -> Result<Droplet> {
        let envelope: DropletEnvelope = self
            .request(Method::GET, &format!("/v2/droplets/{id}"), None)
            .await?;
        Ok(envelope.droplet)
    }

    pub async fn delete_droplet(&self, id: u64) -> Result<()> {
        self.send(Method::DELETE, &format!("/v2/droplets/{id}"), None)
            .await?;
        Ok(())
    }

    pub async fn create_cluster(&self, request: &ClusterCreateRequest) -> Result<KubernetesCluster> {
        let body = serde_json::to_value(request)
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        let envelope: ClusterEnvelope = self
            .request(Method::POST, "/v2/kubernetes/clusters", Some(&body))
            .await?;
        Ok(envelope.kubernetes_cluster)
    }

    pub async fn list_clusters(&self) -> Result<Vec<KubernetesCluster>> {
        let path = format!("/v2/kubernetes/clusters?page=1&per_page={PAGE_SIZE}");
        let envelope: ClustersEnvelope = self.request(Method::GET, &path, None).await?;
        Ok(envelope.kubernetes_clusters)
    }

    pub async fn get_cluster(&self, id: &str) -> Result<KubernetesCluster> {
        let envelope: ClusterEnvelope = self
            .request(Method::GET, &format!("/v2/kubernetes/clusters/{id}"), None)
            .await?;
        Ok(envelope.kubernetes_cluster)
    }

    pub async fn delete_cluster(&self, id: &str) -> Result<()> {
        self.send(
            Method::DELETE,
            &format!("/v2/kubernetes/clusters/{id}"),
            None,
        )
        .await?;
        Ok(())
    }

    /// Ready-made kubeconfig YAML for a provisioned cluster.
    pub async fn kubeconfig(&self, id: &str) -> Result<String> {
        let response = self
            .send(
                Method::GET,
                &format!("/v2/kubernetes/clusters/{id}/kubeconfig"),
                None,
            )
            .await?;
        response
            .text()
            .await
            .map_err(|e| CoreError::provider(Provider::Do, format!("invalid response body: {e}")))
    }

    pub async fn create_database(&self, request: &DatabaseCreateRequest) -> Result<Database> {
        let body = serde_json::to_value(request)
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        let envelope: DatabaseEnvelope = self
            .request(Method::POST, "/v2/databases", Some(&body))
            .await?;
        Ok(envelope.database)
    }

    pub async fn list_databases(&self) -> Result<Vec<Database>> {
        let path = format!("/v2/databases?page=1&per_page={PAGE_SIZE}");
        let envelope: DatabasesEnvelope = self.request(Method::GET, &path, None).await?;
        Ok(envelope.databases)
    }

    pub async fn get_database(&self, id: &str) -> Result<Database> {
        let envelope: DatabaseEnvelope = self
            .request(Method::GET, &format!("/v2/databases/{id}"), None)
            .await?;
        Ok(envelope.database)
    }

    pub async fn delete_database(&self, id: &str) -> Result<()> {
        self.send(Method::DELETE, &format!("/v2/databases/{id}"), None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> DoClient {
        DoClient::new("test-token", &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn account_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "account": {"email": "dev@example.com", "status": "active"}
            })))
            .mount(&server)
            .await;

        let account = client(&server).await.account().await.unwrap();
        assert_eq!(account.email, "dev@example.com");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "id": "unauthorized",
                "message": "Unable to authenticate you"
            })))
            .mount(&server)
            .await;

        let err = client(&server).await.account().await.unwrap_err();
        assert!(err.is_auth(), "expected auth error, got {err}");
        assert!(err.to_string().contains("Unable to authenticate"));
    }

    #[tokio::test]
    async fn create_droplet_posts_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/droplets"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "droplet": {"id": 3164494, "name": "test-vm", "status": "new"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let droplet = client(&server)
            .await
            .create_droplet(&DropletCreateRequest {
                name: "test-vm".into(),
                region: "nyc3".into(),
                size: "s-1vcpu-1gb".into(),
                image: "ubuntu-16-04-x64".into(),
                ssh_keys: vec![512189],
            })
            .await
            .unwrap();

        assert_eq!(droplet.id, 3164494);
        assert_eq!(droplet.name, "test-vm");
    }

    #[tokio::test]
    async fn server_error_carries_provider_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/droplets"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "id": "server_error",
                "message": "something broke"
            })))
            .mount(&server)
            .await;

        let err = client(&server).await.list_droplets().await.unwrap_err();
        assert!(matches!(err, CoreError::Provider { .. }));
        assert!(err.to_string().contains("something broke"));
    }

    #[tokio::test]
    async fn kubeconfig_returns_raw_yaml() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/kubernetes/clusters/abc-123/kubeconfig"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("apiVersion: v1\nkind: Config\n"),
            )
            .mount(&server)
            .await;

        let yaml = client(&server).await.kubeconfig("abc-123").await.unwrap();
        assert!(yaml.starts_with("apiVersion: v1"));
    }

    #[tokio::test]
    async fn delete_droplet_tolerates_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v2/droplets/42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).await.delete_droplet(42).await.unwrap();
    }
}

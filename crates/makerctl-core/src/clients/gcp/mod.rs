//! GCP API client
//!
//! Google's resource APIs are plain JSON REST behind a bearer token, so this
//! client drives them directly with reqwest and keeps responses as raw
//! `serde_json::Value` — the payloads are large and the handlers only pick a
//! handful of fields out of them.

pub mod auth;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::config::GcpSettings;
use crate::error::{CoreError, Result};
use crate::op::Provider;

const USER_AGENT: &str = concat!("makerctl/", env!("CARGO_PKG_VERSION"));

const COMPUTE_BASE: &str = "https://compute.googleapis.com";
const CONTAINER_BASE: &str = "https://container.googleapis.com";
const STORAGE_BASE: &str = "https://storage.googleapis.com";
const SQLADMIN_BASE: &str = "https://sqladmin.googleapis.com";

pub struct GcpClient {
    http: reqwest::Client,
    token: String,
    pub project: String,
    pub zone: String,
    compute_base: String,
    container_base: String,
    storage_base: String,
    sqladmin_base: String,
}

#[derive(Debug, serde::Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiError>,
}

impl GcpClient {
    /// Build a client from settings: loads the key file and performs the
    /// token exchange, which doubles as the eager credential check.
    pub async fn connect(settings: &GcpSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CoreError::provider(Provider::Gcp, e.to_string()))?;

        let key = auth::load_key(&settings.keyfile_path())?;
        let token_override = settings
            .endpoint_url
            .as_ref()
            .map(|base| format!("{}/token", base.trim_end_matches('/')));
        let token = auth::fetch_access_token(&http, &key, token_override.as_deref()).await?;
        tracing::debug!(account = %key.client_email, "authenticated with GCP");

        let base_or = |default: &str| {
            settings
                .endpoint_url
                .clone()
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };

        let project = if settings.project.is_empty() {
            key.project_id.clone().unwrap_or_default()
        } else {
            settings.project.clone()
        };

        Ok(Self {
            http,
            token,
            project,
            zone: settings.zone.clone(),
            compute_base: base_or(COMPUTE_BASE),
            container_base: base_or(CONTAINER_BASE),
            storage_base: base_or(STORAGE_BASE),
            sqladmin_base: base_or(SQLADMIN_BASE),
        })
    }

    /// Bearer token, reused as kubeconfig user credential for GKE.
    pub fn access_token(&self) -> &str {
        &self.token
    }

    /// Service-account identity on the signed-in project, for `auth`.
    pub fn identity(&self) -> String {
        format!("project {} (zone {})", self.project, self.zone)
    }

    async fn request(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value> {
        tracing::trace!(%url, "GCP API call");
        let mut request = self
            .http
            .request(method, url.clone())
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CoreError::provider(Provider::Gcp, format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            return response.json().await.map_err(|e| {
                CoreError::provider(Provider::Gcp, format!("invalid response body: {e}"))
            });
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .map(|e| e.message)
            .unwrap_or_default();
        let message = if message.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            format!("HTTP {}: {}", status.as_u16(), message)
        };
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(CoreError::auth(Provider::Gcp, message))
        } else {
            Err(CoreError::provider(Provider::Gcp, message))
        }
    }

    fn url(&self, base: &str, path: &str) -> Result<Url> {
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| CoreError::Validation(format!("bad URL: {e}")))
    }

    // --- Compute Engine ---

    pub async fn insert_instance(
        &self,
        name: &str,
        machine_type: &str,
        source_image: &str,
    ) -> Result<Value> {
        let url = self.url(
            &self.compute_base,
            &format!(
                "/compute/v1/projects/{}/zones/{}/instances",
                self.project, self.zone
            ),
        )?;
        let body = serde_json::json!({
            "name": name,
            "machineType": format!(
                "projects/{}/zones/{}/machineTypes/{}",
                self.project, self.zone, machine_type
            ),
            "disks": [{
                "boot": true,
                "initializeParams": { "sourceImage": source_image },
                "diskSizeGb": "10",
            }],
            "networkInterfaces": [{
                "accessConfigs": [{
                    "name": "External NAT",
                    "type": "ONE_TO_ONE_NAT",
                    "networkTier": "PREMIUM",
                }],
            }],
        });
        self.request(Method::POST, url, Some(&body)).await
    }

    pub async fn get_instance(&self, name: &str) -> Result<Value> {
        let url = self.url(
            &self.compute_base,
            &format!(
                "/compute/v1/projects/{}/zones/{}/instances/{}",
                self.project, self.zone, name
            ),
        )?;
        self.request(Method::GET, url, None).await
    }

    pub async fn delete_instance(&self, name: &str) -> Result<Value> {
        let url = self.url(
            &self.compute_base,
            &format!(
                "/compute/v1/projects/{}/zones/{}/instances/{}",
                self.project, self.zone, name
            ),
        )?;
        self.request(Method::DELETE, url, None).await
    }

    // --- GKE ---

    fn cluster_parent(&self) -> String {
        format!(
            "/v1/projects/{}/locations/{}/clusters",
            self.project, self.zone
        )
    }

    pub async fn create_cluster(
        &self,
        name: &str,
        node_size: &str,
        node_count: u32,
        version: Option<&str>,
    ) -> Result<Value> {
        let url = self.url(&self.container_base, &self.cluster_parent())?;
        let mut cluster = serde_json::json!({
            "name": name,
            "description": "cluster created by makerctl",
            "nodePools": [{
                "name": format!("{name}-nodepool"),
                "config": { "machineType": node_size },
                "initialNodeCount": node_count,
            }],
        });
        if let Some(version) = version {
            cluster["initialClusterVersion"] = Value::String(version.to_string());
        }
        let body = serde_json::json!({ "cluster": cluster });
        self.request(Method::POST, url, Some(&body)).await
    }

    pub async fn get_cluster(&self, name: &str) -> Result<Value> {
        let url = self.url(
            &self.container_base,
            &format!("{}/{}", self.cluster_parent(), name),
        )?;
        self.request(Method::GET, url, None).await
    }

    pub async fn delete_cluster(&self, name: &str) -> Result<Value> {
        let url = self.url(
            &self.container_base,
            &format!("{}/{}", self.cluster_parent(), name),
        )?;
        self.request(Method::DELETE, url, None).await
    }

    // --- Cloud Storage ---

    pub async fn create_bucket(&self, name: &str) -> Result<Value> {
        let mut url = self.url(&self.storage_base, "/storage/v1/b")?;
        url.query_pairs_mut().append_pair("project", &self.project);
        let body = serde_json::json!({ "name": name });
        self.request(Method::POST, url, Some(&body)).await
    }

    pub async fn get_bucket(&self, name: &str) -> Result<Value> {
        let url = self.url(&self.storage_base, &format!("/storage/v1/b/{name}"))?;
        self.request(Method::GET, url, None).await
    }

    pub async fn list_object_names(&self, bucket: &str) -> Result<Vec<String>> {
        let url = self.url(&self.storage_base, &format!("/storage/v1/b/{bucket}/o"))?;
        let listing = self.request(Method::GET, url, None).await?;
        Ok(listing["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|o| o["name"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn delete_object(&self, bucket: &str, object: &str) -> Result<()> {
        let mut url = self.url(&self.storage_base, "/")?;
        url.path_segments_mut()
            .map_err(|_| CoreError::Validation("storage base URL cannot take a path".into()))?
            .clear()
            .push("storage")
            .push("v1")
            .push("b")
            .push(bucket)
            .push("o")
            .push(object);
        self.request(Method::DELETE, url, None).await?;
        Ok(())
    }

    pub async fn delete_bucket(&self, name: &str) -> Result<()> {
        let url = self.url(&self.storage_base, &format!("/storage/v1/b/{name}"))?;
        self.request(Method::DELETE, url, None).await?;
        Ok(())
    }

    // --- Cloud SQL ---

    pub async fn create_sql_instance(
        &self,
        name: &str,
        tier: &str,
        root_password: &str,
    ) -> Result<Value> {
        let url = self.url(
            &self.sqladmin_base,
            &format!("/v1/projects/{}/instances", self.project),
        )?;
        let body = serde_json::json!({
            "name": name,
            "databaseVersion": "POSTGRES_12",
            "rootPassword": root_password,
            "gceZone": self.zone,
            "settings": { "tier": tier },
        });
        self.request(Method::POST, url, Some(&body)).await
    }

    pub async fn get_sql_instance(&self, name: &str) -> Result<Value> {
        let url = self.url(
            &self.sqladmin_base,
            &format!("/v1/projects/{}/instances/{}", self.project, name),
        )?;
        self.request(Method::GET, url, None).await
    }

    pub async fn delete_sql_instance(&self, name: &str) -> Result<Value> {
        let url = self.url(
            &self.sqladmin_base,
            &format!("/v1/projects/{}/instances/{}", self.project, name),
        )?;
        self.request(Method::DELETE, url, None).await
    }
}

/// Pull a status-ish string field out of a raw GCP resource.
pub fn status_of(resource: &Value) -> String {
    resource["status"]
        .as_str()
        .or_else(|| resource["state"].as_str())
        .unwrap_or("UNKNOWN")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_of_reads_status_then_state() {
        assert_eq!(status_of(&serde_json::json!({"status": "RUNNING"})), "RUNNING");
        assert_eq!(status_of(&serde_json::json!({"state": "RUNNABLE"})), "RUNNABLE");
        assert_eq!(status_of(&serde_json::json!({})), "UNKNOWN");
    }
}

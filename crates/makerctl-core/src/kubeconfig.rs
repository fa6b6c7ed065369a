//! Kubeconfig writer
//!
//! Handlers supply the raw cluster-access material (or the provider's
//! ready-made YAML); this module owns templating and file placement. Files
//! land next to the config file as `<provider>_kubeconfig`, one per
//! provider, overwritten on each fetch.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::op::Provider;

#[derive(Serialize)]
struct KubeConfig {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    kind: &'static str,
    #[serde(rename = "current-context")]
    current_context: String,
    preferences: serde_json::Value,
    clusters: Vec<NamedCluster>,
    contexts: Vec<NamedContext>,
    users: Vec<NamedUser>,
}

#[derive(Serialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    certificate_authority_data: String,
}

#[derive(Serialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Serialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

#[derive(Serialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Serialize)]
struct UserEntry {
    token: String,
}

fn target_path(dir: &Path, provider: Provider) -> PathBuf {
    dir.join(format!("{provider}_kubeconfig"))
}

/// Write provider-emitted kubeconfig YAML (DigitalOcean hands us the full
/// file) verbatim.
pub fn write_raw(dir: &Path, provider: Provider, yaml: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = target_path(dir, provider);
    fs::write(&path, yaml)?;
    tracing::info!(path = %path.display(), "kubeconfig written");
    Ok(path)
}

/// Build and write a token-based kubeconfig from cluster-access material
/// (endpoint, base64 CA bundle, bearer token). Used for GKE, where the API
/// returns the pieces rather than a file.
pub fn write_token_config(
    dir: &Path,
    provider: Provider,
    context_name: &str,
    endpoint: &str,
    ca_data: &str,
    token: &str,
) -> Result<PathBuf> {
    let server = if endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    };

    let config = KubeConfig {
        api_version: "v1",
        kind: "Config",
        current_context: context_name.to_string(),
        preferences: serde_json::json!({}),
        clusters: vec![NamedCluster {
            name: context_name.to_string(),
            cluster: ClusterEntry {
                server,
                certificate_authority_data: ca_data.to_string(),
            },
        }],
        contexts: vec![NamedContext {
            name: context_name.to_string(),
            context: ContextEntry {
                cluster: context_name.to_string(),
                user: context_name.to_string(),
            },
        }],
        users: vec![NamedUser {
            name: context_name.to_string(),
            user: UserEntry {
                token: token.to_string(),
            },
        }],
    };

    let yaml = serde_yaml::to_string(&config)
        .map_err(|e| CoreError::Validation(format!("failed to render kubeconfig: {e}")))?;
    write_raw(dir, provider, &yaml)
}

/// Conventional GKE context name, mirroring `gcloud container clusters
/// get-credentials`.
pub fn gke_context_name(project: &str, zone: &str, cluster: &str) -> String {
    format!("gke_{project}_{zone}_{cluster}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_yaml_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "apiVersion: v1\nkind: Config\n";
        let path = write_raw(dir.path(), Provider::Do, yaml).unwrap();
        assert_eq!(path.file_name().unwrap(), "do_kubeconfig");
        assert_eq!(fs::read_to_string(path).unwrap(), yaml);
    }

    #[test]
    fn token_config_contains_access_material() {
        let dir = tempfile::tempdir().unwrap();
        let context = gke_context_name("lab", "us-east1-b", "demo");
        let path = write_token_config(
            dir.path(),
            Provider::Gcp,
            &context,
            "203.0.113.10",
            "Q0FEQVRB",
            "ya29.token",
        )
        .unwrap();

        let rendered = fs::read_to_string(path).unwrap();
        assert!(rendered.contains("server: https://203.0.113.10"));
        assert!(rendered.contains("certificate-authority-data: Q0FEQVRB"));
        assert!(rendered.contains("token: ya29.token"));
        assert!(rendered.contains("current-context: gke_lab_us-east1-b_demo"));
    }

    #[test]
    fn https_endpoints_are_not_double_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_token_config(
            dir.path(),
            Provider::Gcp,
            "ctx",
            "https://203.0.113.10",
            "Q0E=",
            "tok",
        )
        .unwrap();
        let rendered = fs::read_to_string(path).unwrap();
        assert!(rendered.contains("server: https://203.0.113.10"));
        assert!(!rendered.contains("https://https://"));
    }
}

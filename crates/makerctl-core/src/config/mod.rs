//! Configuration management
//!
//! Per-provider credentials and defaults live in one TOML file with a
//! section per provider. The file is read once at process start into an
//! explicit [`Config`] value that is passed into the client factory and
//! handlers — nothing reads ambient global state. Saves are whole-file
//! overwrites; the tool is single-invocation, single-user, so no locking.
//!
//! ```toml
//! [digitalocean]
//! token = "dop_v1_..."
//! region = "nyc3"
//!
//! [aws]
//! access_key_id = "AKIA..."
//! secret_access_key = "..."
//! region = "us-east-2"
//!
//! [gcp]
//! keyfile = "~/.config/makerctl/maker-sa.json"
//! zone = "us-east1-b"
//! project = "my-project"
//! ```
//!
//! Environment variables override individual fields (`MAKERCTL_DO_TOKEN`,
//! `AWS_ACCESS_KEY_ID`, ...), so CI can run without a config file at all.

mod error;

pub use error::{ConfigError, Result};

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Root configuration: one optional section per provider.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitalocean: Option<DoSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpSettings>,
}

/// DigitalOcean: personal access token plus a default region. Spaces
/// (bucket) operations additionally need an access-key pair because the
/// Spaces surface is S3-compatible rather than part of the main REST API.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DoSettings {
    pub token: String,
    pub region: String,
    #[serde(default = "default_do_api_url")]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spaces_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spaces_secret: Option<String>,
    /// Override for the Spaces endpoint; defaults to the regional one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spaces_endpoint: Option<String>,
}

fn default_do_api_url() -> String {
    "https://api.digitalocean.com".to_string()
}

impl DoSettings {
    pub fn spaces_endpoint(&self) -> String {
        self.spaces_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.digitaloceanspaces.com", self.region))
    }
}

/// AWS: static access-key pair plus a default region.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AwsSettings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Endpoint override, used by tests and localstack-style setups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

/// GCP: path to a service-account key file plus default zone and project.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GcpSettings {
    pub keyfile: String,
    pub zone: String,
    pub project: String,
    /// Single base-URL override for every Google API surface (tests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

impl GcpSettings {
    /// Key-file path with `~` expanded.
    pub fn keyfile_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.keyfile).into_owned())
    }
}

impl Config {
    /// Load from the default location; a missing file yields an empty config
    /// so that `auth` can run on a fresh machine.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; starting empty");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::default_path()?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Save {
                path: path.display().to_string(),
                source,
            })?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).map_err(|source| ConfigError::Save {
            path: path.display().to_string(),
            source,
        })
    }

    /// Directory holding the config file and generated kubeconfigs.
    pub fn config_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "makerctl").ok_or(ConfigError::ConfigDir)?;
        Ok(dirs.config_dir().to_path_buf())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// DigitalOcean settings with environment overrides applied.
    ///
    /// `MAKERCTL_DO_TOKEN` + `MAKERCTL_DO_REGION` form a complete credential
    /// set on their own; individually they override the file's values.
    pub fn digitalocean(&self) -> Result<DoSettings> {
        let env_token = std::env::var("MAKERCTL_DO_TOKEN").ok();
        let env_region = std::env::var("MAKERCTL_DO_REGION").ok();

        let mut settings = match (&self.digitalocean, &env_token, &env_region) {
            (Some(s), _, _) => s.clone(),
            (None, Some(token), Some(region)) => DoSettings {
                token: token.clone(),
                region: region.clone(),
                api_url: default_do_api_url(),
                spaces_key: None,
                spaces_secret: None,
                spaces_endpoint: None,
            },
            (None, _, _) => {
                return Err(ConfigError::MissingProvider {
                    provider: "do".to_string(),
                });
            }
        };
        if let Some(token) = env_token {
            settings.token = token;
        }
        if let Some(region) = env_region {
            settings.region = region;
        }
        Ok(settings)
    }

    /// AWS settings with the conventional `AWS_*` environment overrides.
    pub fn aws(&self) -> Result<AwsSettings> {
        let env_key = std::env::var("AWS_ACCESS_KEY_ID").ok();
        let env_secret = std::env::var("AWS_SECRET_ACCESS_KEY").ok();
        let env_region = std::env::var("AWS_DEFAULT_REGION").ok();

        let mut settings = match (&self.aws, &env_key, &env_secret, &env_region) {
            (Some(s), _, _, _) => s.clone(),
            (None, Some(key), Some(secret), Some(region)) => AwsSettings {
                access_key_id: key.clone(),
                secret_access_key: secret.clone(),
                region: region.clone(),
                endpoint_url: None,
            },
            (None, _, _, _) => {
                return Err(ConfigError::MissingProvider {
                    provider: "aws".to_string(),
                });
            }
        };
        if let Some(key) = env_key {
            settings.access_key_id = key;
        }
        if let Some(secret) = env_secret {
            settings.secret_access_key = secret;
        }
        if let Some(region) = env_region {
            settings.region = region;
        }
        Ok(settings)
    }

    /// GCP settings with `MAKERCTL_GCP_*` environment overrides.
    pub fn gcp(&self) -> Result<GcpSettings> {
        let env_keyfile = std::env::var("MAKERCTL_GCP_KEYFILE").ok();
        let env_zone = std::env::var("MAKERCTL_GCP_ZONE").ok();
        let env_project = std::env::var("MAKERCTL_GCP_PROJECT").ok();

        let mut settings = match (&self.gcp, &env_keyfile, &env_zone, &env_project) {
            (Some(s), _, _, _) => s.clone(),
            (None, Some(keyfile), Some(zone), Some(project)) => GcpSettings {
                keyfile: keyfile.clone(),
                zone: zone.clone(),
                project: project.clone(),
                endpoint_url: None,
            },
            (None, _, _, _) => {
                return Err(ConfigError::MissingProvider {
                    provider: "gcp".to_string(),
                });
            }
        };
        if let Some(keyfile) = env_keyfile {
            settings.keyfile = keyfile;
        }
        if let Some(zone) = env_zone {
            settings.zone = zone;
        }
        if let Some(project) = env_project {
            settings.project = project;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_all_sections() {
        let raw = r#"
            [digitalocean]
            token = "dop_v1_abc"
            region = "nyc3"

            [aws]
            access_key_id = "AKIAEXAMPLE"
            secret_access_key = "secret"
            region = "us-east-2"

            [gcp]
            keyfile = "/tmp/sa.json"
            zone = "us-east1-b"
            project = "lab-project"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        let digitalocean = config.digitalocean.as_ref().unwrap();
        assert_eq!(digitalocean.token, "dop_v1_abc");
        assert_eq!(digitalocean.api_url, "https://api.digitalocean.com");
        assert_eq!(config.aws.as_ref().unwrap().region, "us-east-2");
        assert_eq!(config.gcp.as_ref().unwrap().project, "lab-project");
    }

    #[test]
    fn partial_config_leaves_other_sections_empty() {
        let config: Config =
            toml::from_str("[digitalocean]\ntoken = \"t\"\nregion = \"sfo2\"\n").unwrap();
        assert!(config.digitalocean.is_some());
        assert!(config.aws.is_none());
        assert!(matches!(
            config.aws(),
            Err(ConfigError::MissingProvider { .. }) | Ok(_)
        ));
    }

    #[test]
    fn missing_file_loads_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("nope.toml")).unwrap();
        assert!(config.digitalocean.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            digitalocean: Some(DoSettings {
                token: "tok".into(),
                region: "ams3".into(),
                api_url: default_do_api_url(),
                spaces_key: None,
                spaces_secret: None,
                spaces_endpoint: None,
            }),
            aws: None,
            gcp: None,
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.digitalocean.unwrap().region, "ams3");
        assert!(loaded.gcp.is_none());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not [valid toml").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn spaces_endpoint_derives_from_region() {
        let settings = DoSettings {
            token: "t".into(),
            region: "nyc3".into(),
            api_url: default_do_api_url(),
            spaces_key: None,
            spaces_secret: None,
            spaces_endpoint: None,
        };
        assert_eq!(
            settings.spaces_endpoint(),
            "https://nyc3.digitaloceanspaces.com"
        );
    }
}

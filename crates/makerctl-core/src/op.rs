//! Operation descriptor types
//!
//! A single CLI invocation maps to one [`OpRequest`]: a (provider, kind, verb)
//! triple plus a bag of named parameters. The descriptor is built once by the
//! front end, stays immutable, and is discarded when the operation completes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Supported cloud platforms
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// DigitalOcean
    Do,
    /// Amazon Web Services
    Aws,
    /// Google Cloud Platform
    Gcp,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Do => write!(f, "do"),
            Provider::Aws => write!(f, "aws"),
            Provider::Gcp => write!(f, "gcp"),
        }
    }
}

/// Kinds of resources the tool manages
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Vm,
    Cluster,
    Bucket,
    Database,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Vm => write!(f, "vm"),
            ResourceKind::Cluster => write!(f, "cluster"),
            ResourceKind::Bucket => write!(f, "bucket"),
            ResourceKind::Database => write!(f, "database"),
        }
    }
}

/// Operations applicable to a resource kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Status,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Create => write!(f, "create"),
            Verb::Status => write!(f, "status"),
            Verb::Delete => write!(f, "delete"),
        }
    }
}

/// Named parameters for one operation.
///
/// Keys required vary per (provider, kind, verb); handlers validate at the
/// point of use rather than against a schema object.
#[derive(Debug, Clone, Default)]
pub struct OpParams(BTreeMap<String, String>);

impl OpParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert, handy in tests and the CLI front end.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| CoreError::Validation(format!("missing required parameter '{key}'")))
    }

    pub fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                CoreError::Validation(format!("parameter '{key}' must be an integer, got '{raw}'"))
            }),
        }
    }

    /// Comma-separated list parameter (e.g. `--subnets subnet-a,subnet-b`).
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One requested action, constructed once per invocation.
#[derive(Debug, Clone)]
pub struct OpRequest {
    pub provider: Provider,
    pub kind: ResourceKind,
    pub verb: Verb,
    pub params: OpParams,
}

impl OpRequest {
    pub fn new(provider: Provider, kind: ResourceKind, verb: Verb, params: OpParams) -> Self {
        Self {
            provider,
            kind,
            verb,
            params,
        }
    }
}

/// A provider-assigned identifier plus the human-assigned name used to find it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Final state of a completed operation, handed to the presenter.
#[derive(Debug, Clone, Serialize)]
pub struct OpOutput {
    /// One-line human summary
    pub summary: String,
    /// Reference to the resource acted upon, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ResourceRef>,
    /// Structured details for json/yaml/table rendering
    pub details: serde_json::Value,
}

impl OpOutput {
    pub fn new(summary: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            summary: summary.into(),
            reference: None,
            details,
        }
    }

    /// Summary-only output with no structured payload.
    pub fn message(summary: impl Into<String>) -> Self {
        Self::new(summary, serde_json::Value::Null)
    }

    pub fn with_reference(mut self, reference: ResourceRef) -> Self {
        self.reference = Some(reference);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_require_present_and_missing() {
        let params = OpParams::new().with("name", "test-vm");
        assert_eq!(params.require("name").unwrap(), "test-vm");
        let err = params.require("size").unwrap_err();
        assert!(err.to_string().contains("size"));
    }

    #[test]
    fn params_u32_parsing() {
        let params = OpParams::new().with("node-count", "3").with("bad", "three");
        assert_eq!(params.get_u32("node-count").unwrap(), Some(3));
        assert_eq!(params.get_u32("absent").unwrap(), None);
        assert!(params.get_u32("bad").is_err());
    }

    #[test]
    fn params_list_splits_and_trims() {
        let params = OpParams::new().with("subnets", "subnet-a, subnet-b,");
        assert_eq!(params.get_list("subnets"), vec!["subnet-a", "subnet-b"]);
        assert!(params.get_list("absent").is_empty());
    }

    #[test]
    fn display_names_match_cli_surface() {
        assert_eq!(Provider::Do.to_string(), "do");
        assert_eq!(ResourceKind::Database.to_string(), "database");
        assert_eq!(Verb::Status.to_string(), "status");
    }
}

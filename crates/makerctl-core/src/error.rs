//! Unified error handling for makerctl-core
//!
//! Every failure a handler or the poller can hit maps onto one of these
//! kinds. Nothing is retried locally; errors propagate unchanged to the
//! top-level reporter in the CLI, which prints them and exits nonzero.

use std::time::Duration;

use thiserror::Error;

use crate::op::{Provider, ResourceKind, Verb};

/// Core error type for all operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local configuration absent or unusable
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Provider rejected the credentials, or the identity check failed
    #[error("{provider} authentication failed: {message}")]
    Auth { provider: Provider, message: String },

    /// No handler registered for the requested triple
    #[error("'{verb} {kind}' is not supported on provider '{provider}'")]
    Unsupported {
        provider: Provider,
        kind: ResourceKind,
        verb: Verb,
    },

    /// Name-based lookup found nothing
    #[error("no {kind} named '{name}' found")]
    LookupNotFound { kind: ResourceKind, name: String },

    /// Name-based lookup found more than one live resource
    #[error("found {count} {kind}s named '{name}'; cannot pick one by name")]
    LookupAmbiguous {
        kind: ResourceKind,
        name: String,
        count: usize,
    },

    /// The remote call itself failed; carries provider-supplied detail
    #[error("{provider} API error: {message}")]
    Provider { provider: Provider, message: String },

    /// Poll loop exceeded its deadline without reaching a terminal state
    #[error("timed out after {0:?} waiting for a terminal state")]
    PollTimeout(Duration),

    /// The resource reached a recognized failure state
    #[error("operation reached failure state '{status}'")]
    PollFailed { status: String },

    /// The wait was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Bad or missing input caught at the point of use
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn auth(provider: Provider, message: impl Into<String>) -> Self {
        CoreError::Auth {
            provider,
            message: message.into(),
        }
    }

    pub fn provider(provider: Provider, message: impl Into<String>) -> Self {
        CoreError::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Returns true if this is a name-lookup miss
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::LookupNotFound { .. })
    }

    /// Returns true if this is an authentication failure
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, CoreError::Auth { .. })
    }

    /// Returns true if the poll deadline expired
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::PollTimeout(_))
    }

    /// Returns true for unsupported (provider, kind, verb) combinations
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, CoreError::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_names_the_triple() {
        let err = CoreError::Unsupported {
            provider: Provider::Gcp,
            kind: ResourceKind::Database,
            verb: Verb::Status,
        };
        let msg = err.to_string();
        assert!(msg.contains("status database"));
        assert!(msg.contains("gcp"));
        assert!(err.is_unsupported());
    }

    #[test]
    fn timeout_helper() {
        let err = CoreError::PollTimeout(Duration::from_secs(60));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn lookup_helpers() {
        let missing = CoreError::LookupNotFound {
            kind: ResourceKind::Vm,
            name: "web-1".into(),
        };
        assert!(missing.is_not_found());

        let dup = CoreError::LookupAmbiguous {
            kind: ResourceKind::Vm,
            name: "web-1".into(),
            count: 2,
        };
        assert!(!dup.is_not_found());
        assert!(dup.to_string().contains("2 vms"));
    }
}

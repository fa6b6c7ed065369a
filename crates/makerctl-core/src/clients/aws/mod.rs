//! AWS session construction and shared error mapping
//!
//! Wraps the official SDK: one [`AwsSession`] per invocation, built from the
//! static credentials in the config file and verified eagerly through STS
//! before any real operation runs.

pub mod ec2;
pub mod eks;
pub mod rds;
pub mod s3;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::config::Credentials;

use crate::config::AwsSettings;
use crate::error::{CoreError, Result};
use crate::op::Provider;

const CREDENTIALS_PROVIDER_NAME: &str = "makerctl-config";

/// Authenticated handle for all AWS service clients.
#[derive(Clone)]
pub struct AwsSession {
    pub config: SdkConfig,
    pub region: String,
}

pub async fn connect(settings: &AwsSettings) -> AwsSession {
    let credentials = Credentials::new(
        settings.access_key_id.clone(),
        settings.secret_access_key.clone(),
        None,
        None,
        CREDENTIALS_PROVIDER_NAME,
    );

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .credentials_provider(credentials);
    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint.clone());
    }

    AwsSession {
        config: loader.load().await,
        region: settings.region.clone(),
    }
}

/// Eager credential check: a round trip to STS that also surfaces the
/// account identity for `auth`.
pub async fn verify(session: &AwsSession) -> Result<String> {
    let sts = aws_sdk_sts::Client::new(&session.config);
    let identity = sts
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| CoreError::auth(Provider::Aws, error_detail(e)))?;

    Ok(format!(
        "{} (account {})",
        identity.arn().unwrap_or("unknown"),
        identity.account().unwrap_or("unknown")
    ))
}

/// Render an SDK error with its full source chain, which is where the
/// service-supplied message lives.
pub(crate) fn error_detail<E>(err: E) -> String
where
    E: std::error::Error,
{
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message = format!("{message}: {inner}");
        source = inner.source();
    }
    message
}

pub(crate) fn sdk_error<E>(err: E) -> CoreError
where
    E: std::error::Error,
{
    CoreError::provider(Provider::Aws, error_detail(err))
}

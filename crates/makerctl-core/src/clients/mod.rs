//! Provider client factory
//!
//! One factory per invocation, borrowing the loaded [`Config`]. Every
//! accessor builds the provider handle lazily, right before first use, and
//! validates the credentials eagerly with a whoami-style round trip so auth
//! problems surface before any mutating call. Handles are never explicitly
//! closed; process exit reclaims them.

pub mod aws;
pub mod digitalocean;
pub mod gcp;

use crate::config::Config;
use crate::error::{CoreError, Result};

use self::digitalocean::DoClient;

pub struct ClientFactory<'a> {
    config: &'a Config,
}

impl<'a> ClientFactory<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// DigitalOcean client, validated against `/v2/account`.
    pub async fn digitalocean(&self) -> Result<DoClient> {
        let settings = self.config.digitalocean()?;
        let client = DoClient::new(&settings.token, &settings.api_url)?;
        let account = client.account().await?;
        tracing::debug!(email = %account.email, "authenticated with DigitalOcean");
        Ok(client)
    }

    /// DigitalOcean client plus its account identity, for `auth`.
    pub async fn digitalocean_identity(&self) -> Result<String> {
        let settings = self.config.digitalocean()?;
        let client = DoClient::new(&settings.token, &settings.api_url)?;
        let account = client.account().await?;
        Ok(account.email)
    }

    /// AWS session, validated through STS `GetCallerIdentity`.
    pub async fn aws(&self) -> Result<aws::AwsSession> {
        let settings = self.config.aws()?;
        let session = aws::connect(&settings).await;
        let identity = aws::verify(&session).await?;
        tracing::debug!(%identity, "authenticated with AWS");
        Ok(session)
    }

    pub async fn aws_identity(&self) -> Result<String> {
        let settings = self.config.aws()?;
        let session = aws::connect(&settings).await;
        aws::verify(&session).await
    }

    /// S3 client for DigitalOcean Spaces, built from the Spaces key pair.
    pub async fn spaces_s3(&self) -> Result<aws_sdk_s3::Client> {
        let settings = self.config.digitalocean()?;
        let (Some(key), Some(secret)) = (&settings.spaces_key, &settings.spaces_secret) else {
            return Err(CoreError::Config(
                crate::config::ConfigError::MissingKey {
                    provider: "do".to_string(),
                    key: "spaces_key/spaces_secret".to_string(),
                },
            ));
        };
        Ok(aws::s3::client_for_endpoint(&settings.spaces_endpoint(), key, secret).await)
    }

    /// GCP client; the token exchange validates the key file.
    pub async fn gcp(&self) -> Result<gcp::GcpClient> {
        let settings = self.config.gcp()?;
        gcp::GcpClient::connect(&settings).await
    }
}

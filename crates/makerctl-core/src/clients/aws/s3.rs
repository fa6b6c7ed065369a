//! S3-compatible bucket operations
//!
//! Serves two providers: AWS S3 proper, and DigitalOcean Spaces, which
//! speaks the same protocol behind a regional endpoint. The Spaces variant
//! builds its own client from the Spaces key pair rather than the AWS
//! session.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};

use super::{AwsSession, sdk_error};
use crate::error::Result;

pub fn client(session: &AwsSession) -> Client {
    Client::new(&session.config)
}

/// Client for DigitalOcean Spaces (or any custom S3 endpoint). Path-style
/// addressing avoids relying on wildcard DNS for virtual-host buckets.
pub async fn client_for_endpoint(endpoint: &str, access_key: &str, secret_key: &str) -> Client {
    let credentials = Credentials::new(
        access_key.to_string(),
        secret_key.to_string(),
        None,
        None,
        "makerctl-spaces",
    );
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .endpoint_url(endpoint.to_string())
        .credentials_provider(credentials)
        .load()
        .await;
    let config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();
    Client::from_conf(config)
}

pub async fn create_bucket(client: &Client, name: &str, region: Option<&str>) -> Result<()> {
    let mut request = client.create_bucket().bucket(name);
    // us-east-1 is the one region that must not be sent as a location
    // constraint.
    if let Some(region) = region.filter(|r| *r != "us-east-1") {
        request = request.create_bucket_configuration(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        );
    }
    request.send().await.map_err(sdk_error)?;
    Ok(())
}

/// Creation date of the named bucket, if the account owns it.
pub async fn bucket_created_at(client: &Client, name: &str) -> Result<Option<String>> {
    let output = client.list_buckets().send().await.map_err(sdk_error)?;
    Ok(output
        .buckets()
        .iter()
        .find(|b| b.name() == Some(name))
        .and_then(|b| b.creation_date())
        .map(|t| format!("{t:?}")))
}

pub async fn list_object_keys(client: &Client, bucket: &str) -> Result<Vec<String>> {
    let output = client
        .list_objects_v2()
        .bucket(bucket)
        .send()
        .await
        .map_err(sdk_error)?;
    Ok(output
        .contents()
        .iter()
        .filter_map(|o| o.key().map(String::from))
        .collect())
}

/// Delete every object in the bucket. Buckets must be empty before they can
/// be removed.
pub async fn empty_bucket(client: &Client, bucket: &str) -> Result<usize> {
    let keys = list_object_keys(client, bucket).await?;
    for key in &keys {
        client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;
    }
    if !keys.is_empty() {
        tracing::info!(bucket, count = keys.len(), "deleted objects before bucket removal");
    }
    Ok(keys.len())
}

pub async fn delete_bucket(client: &Client, bucket: &str) -> Result<()> {
    client
        .delete_bucket()
        .bucket(bucket)
        .send()
        .await
        .map_err(sdk_error)?;
    Ok(())
}

//! EC2 instance operations
//!
//! Instances are tagged `Name=<name>` at create time and found again through
//! a tag filter, since EC2 ids are not human-assignable.

use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::{Filter, Instance, InstanceType, Tag};

use super::{AwsSession, sdk_error};
use crate::error::{CoreError, Result};
use crate::lookup::find_by_name;
use crate::op::ResourceKind;

pub fn client(session: &AwsSession) -> Client {
    Client::new(&session.config)
}

/// SSH key names registered on the account; VM create requires one.
pub async fn key_pair_names(client: &Client) -> Result<Vec<String>> {
    let output = client
        .describe_key_pairs()
        .send()
        .await
        .map_err(sdk_error)?;
    Ok(output
        .key_pairs()
        .iter()
        .filter_map(|k| k.key_name().map(String::from))
        .collect())
}

pub async fn run_instance(
    client: &Client,
    name: &str,
    instance_type: &str,
    ami: &str,
    key_name: &str,
) -> Result<String> {
    let output = client
        .run_instances()
        .image_id(ami)
        .instance_type(InstanceType::from(instance_type))
        .min_count(1)
        .max_count(1)
        .key_name(key_name)
        .send()
        .await
        .map_err(sdk_error)?;

    let instance_id = output
        .instances()
        .first()
        .and_then(|i| i.instance_id())
        .ok_or_else(|| {
            CoreError::provider(crate::op::Provider::Aws, "RunInstances returned no instance")
        })?
        .to_string();

    client
        .create_tags()
        .resources(&instance_id)
        .tags(Tag::builder().key("Name").value(name).build())
        .send()
        .await
        .map_err(sdk_error)?;

    tracing::info!(%instance_id, name, "EC2 instance launched and tagged");
    Ok(instance_id)
}

fn is_live(instance: &Instance) -> bool {
    let state = instance
        .state()
        .and_then(|s| s.name())
        .map(|n| n.as_str())
        .unwrap_or("");
    !matches!(state, "terminated" | "shutting-down")
}

fn name_tag(instance: &Instance) -> &str {
    instance
        .tags()
        .iter()
        .find(|t| t.key() == Some("Name"))
        .and_then(|t| t.value())
        .unwrap_or("")
}

/// Find the single live instance tagged with `name`.
pub async fn find_instance(client: &Client, name: &str) -> Result<Instance> {
    let output = client
        .describe_instances()
        .filters(Filter::builder().name("tag:Name").values(name).build())
        .send()
        .await
        .map_err(sdk_error)?;

    let live: Vec<Instance> = output
        .reservations()
        .iter()
        .flat_map(|r| r.instances().iter().cloned())
        .filter(is_live)
        .collect();

    find_by_name(ResourceKind::Vm, name, live, name_tag)
}

pub async fn terminate_instance(client: &Client, instance_id: &str) -> Result<String> {
    let output = client
        .terminate_instances()
        .instance_ids(instance_id)
        .send()
        .await
        .map_err(sdk_error)?;

    let state = output
        .terminating_instances()
        .first()
        .and_then(|t| t.current_state())
        .and_then(|s| s.name())
        .map(|n| n.as_str().to_string())
        .unwrap_or_else(|| "shutting-down".to_string());
    Ok(state)
}

/// Flatten the interesting instance fields for the presenter.
pub fn instance_details(instance: &Instance) -> serde_json::Value {
    serde_json::json!({
        "name": name_tag(instance),
        "id": instance.instance_id(),
        "ami": instance.image_id(),
        "instance_type": instance.instance_type().map(|t| t.as_str()),
        "public_ip": instance.public_ip_address(),
        "public_dns": instance.public_dns_name(),
        "availability_zone": instance.placement().and_then(|p| p.availability_zone()),
        "state": instance.state().and_then(|s| s.name()).map(|n| n.as_str()),
        "launch_time": instance.launch_time().map(|t| format!("{t:?}")),
    })
}

pub fn instance_state(instance: &Instance) -> String {
    instance
        .state()
        .and_then(|s| s.name())
        .map(|n| n.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

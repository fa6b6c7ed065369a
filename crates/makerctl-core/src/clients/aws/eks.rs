//! EKS cluster and node-group operations
//!
//! Cluster and node-group provisioning are separate asynchronous operations:
//! the node group can only be created once the cluster reports `ACTIVE`, and
//! the cluster can only be deleted once its node group is gone. The handlers
//! drive those dependencies through the poller; this module exposes the raw
//! calls plus the status describers the poller consumes.

use aws_sdk_eks::Client;
use aws_sdk_eks::types::{Cluster, NodegroupScalingConfig, VpcConfigRequest};
use aws_sdk_iam::Client as IamClient;

use super::{AwsSession, sdk_error};
use crate::error::{CoreError, Result};
use crate::op::Provider;

const CLUSTER_ROLE_NAME: &str = "EKSClusterRole";

/// Trust policy allowing EKS and EC2 to assume the shared cluster/node role.
const ASSUME_ROLE_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"Service":["eks.amazonaws.com","ec2.amazonaws.com"]},"Action":"sts:AssumeRole"}]}"#;

const ROLE_POLICY_ARNS: &[&str] = &[
    "arn:aws:iam::aws:policy/AmazonEKSClusterPolicy",
    "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy",
    "arn:aws:iam::aws:policy/AmazonEC2ContainerRegistryReadOnly",
    "arn:aws:iam::aws:policy/AmazonEKS_CNI_Policy",
];

pub fn client(session: &AwsSession) -> Client {
    Client::new(&session.config)
}

pub fn nodegroup_name(cluster_name: &str) -> String {
    format!("{cluster_name}-nodegroup")
}

/// Get or create the shared EKS role and return its ARN.
pub async fn ensure_cluster_role(session: &AwsSession) -> Result<String> {
    let iam = IamClient::new(&session.config);

    match iam.get_role().role_name(CLUSTER_ROLE_NAME).send().await {
        Ok(output) => {
            let role = output.role().ok_or_else(|| {
                CoreError::provider(Provider::Aws, "GetRole returned no role")
            })?;
            return Ok(role.arn().to_string());
        }
        Err(err) => {
            let absent = err
                .as_service_error()
                .is_some_and(|e| e.is_no_such_entity_exception());
            if !absent {
                return Err(sdk_error(err));
            }
        }
    }

    tracing::info!(role = CLUSTER_ROLE_NAME, "creating EKS cluster role");
    let created = iam
        .create_role()
        .role_name(CLUSTER_ROLE_NAME)
        .description("EKS role with cluster and node policies")
        .assume_role_policy_document(ASSUME_ROLE_POLICY)
        .send()
        .await
        .map_err(sdk_error)?;

    for policy_arn in ROLE_POLICY_ARNS {
        iam.attach_role_policy()
            .role_name(CLUSTER_ROLE_NAME)
            .policy_arn(*policy_arn)
            .send()
            .await
            .map_err(sdk_error)?;
    }

    let role = created
        .role()
        .ok_or_else(|| CoreError::provider(Provider::Aws, "CreateRole returned no role"))?;
    Ok(role.arn().to_string())
}

pub async fn create_cluster(
    client: &Client,
    name: &str,
    role_arn: &str,
    subnets: &[String],
    version: Option<&str>,
) -> Result<()> {
    let mut request = client
        .create_cluster()
        .name(name)
        .role_arn(role_arn)
        .resources_vpc_config(
            VpcConfigRequest::builder()
                .set_subnet_ids(Some(subnets.to_vec()))
                .build(),
        );
    if let Some(version) = version {
        request = request.version(version);
    }
    request.send().await.map_err(sdk_error)?;
    Ok(())
}

pub async fn get_cluster(client: &Client, name: &str) -> Result<Cluster> {
    let output = client
        .describe_cluster()
        .name(name)
        .send()
        .await
        .map_err(sdk_error)?;
    output
        .cluster()
        .cloned()
        .ok_or_else(|| CoreError::provider(Provider::Aws, "DescribeCluster returned no cluster"))
}

pub async fn cluster_status(client: &Client, name: &str) -> Result<String> {
    let cluster = get_cluster(client, name).await?;
    Ok(cluster
        .status()
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string()))
}

pub async fn create_nodegroup(
    client: &Client,
    cluster_name: &str,
    role_arn: &str,
    node_size: &str,
    node_count: u32,
    subnets: &[String],
) -> Result<String> {
    let nodegroup = nodegroup_name(cluster_name);
    client
        .create_nodegroup()
        .cluster_name(cluster_name)
        .nodegroup_name(&nodegroup)
        .node_role(role_arn)
        .instance_types(node_size)
        .scaling_config(
            NodegroupScalingConfig::builder()
                .desired_size(node_count as i32)
                .min_size(node_count as i32)
                .max_size(node_count as i32)
                .build(),
        )
        .set_subnets(Some(subnets.to_vec()))
        .send()
        .await
        .map_err(sdk_error)?;
    Ok(nodegroup)
}

/// Node-group status, or `None` once the node group no longer exists.
pub async fn nodegroup_status(
    client: &Client,
    cluster_name: &str,
    nodegroup: &str,
) -> Result<Option<String>> {
    match client
        .describe_nodegroup()
        .cluster_name(cluster_name)
        .nodegroup_name(nodegroup)
        .send()
        .await
    {
        Ok(output) => Ok(Some(
            output
                .nodegroup()
                .and_then(|n| n.status())
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
        )),
        Err(err) => {
            let gone = err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception());
            if gone { Ok(None) } else { Err(sdk_error(err)) }
        }
    }
}

/// Request node-group deletion; returns false if it was already gone.
pub async fn delete_nodegroup(client: &Client, cluster_name: &str, nodegroup: &str) -> Result<bool> {
    match client
        .delete_nodegroup()
        .cluster_name(cluster_name)
        .nodegroup_name(nodegroup)
        .send()
        .await
    {
        Ok(_) => Ok(true),
        Err(err) => {
            let gone = err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception());
            if gone { Ok(false) } else { Err(sdk_error(err)) }
        }
    }
}

pub async fn delete_cluster(client: &Client, name: &str) -> Result<()> {
    client
        .delete_cluster()
        .name(name)
        .send()
        .await
        .map_err(sdk_error)?;
    Ok(())
}

/// Flatten the interesting cluster fields for the presenter.
pub fn cluster_details(cluster: &Cluster) -> serde_json::Value {
    serde_json::json!({
        "name": cluster.name(),
        "arn": cluster.arn(),
        "endpoint": cluster.endpoint(),
        "version": cluster.version(),
        "status": cluster.status().map(|s| s.as_str()),
        "service_cidr": cluster
            .kubernetes_network_config()
            .and_then(|c| c.service_ipv4_cidr()),
        "created_at": cluster.created_at().map(|t| format!("{t:?}")),
    })
}

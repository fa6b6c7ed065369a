//! AWS handlers: EC2 instances, EKS clusters, S3 buckets, RDS databases
//!
//! The EKS pair encodes the only cross-resource dependencies in the tool:
//! a node group attaches only after its cluster is ACTIVE, and a cluster
//! deletes only after its node group is gone. Both edges run through the
//! poller.

use crate::clients::aws::{ec2, eks, rds, s3};
use crate::dispatch::{HandlerFuture, OpContext};
use crate::error::{CoreError, Result};
use crate::op::{OpOutput, ResourceRef};
use crate::poll;

/// Default master password for lab RDS instances, overridable via
/// `--master-password`.
const RDS_DEFAULT_PASSWORD: &str = "rdsadmin";

fn choose_key_pair(names: &[String], requested: Option<&str>) -> Result<String> {
    if names.is_empty() {
        return Err(CoreError::Validation(
            "an SSH key pair is required to access an EC2 instance and none exist; \
             create one (https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/ec2-key-pairs.html) \
             and try again"
                .into(),
        ));
    }
    match requested {
        Some(name) => names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "no key pair named '{name}'; available: {}",
                    names.join(", ")
                ))
            }),
        None if names.len() == 1 => Ok(names[0].clone()),
        None => Err(CoreError::Validation(format!(
            "multiple key pairs found; pass --ssh-key with one of: {}",
            names.join(", ")
        ))),
    }
}

pub fn create_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let size = ctx.params.require("size")?;
        let ami = ctx.params.require("image")?;

        let session = ctx.factory().aws().await?;
        let client = ec2::client(&session);
        let key_names = ec2::key_pair_names(&client).await?;
        let key = choose_key_pair(&key_names, ctx.params.get("ssh-key"))?;

        let instance_id = ec2::run_instance(&client, name, size, ami, &key).await?;
        Ok(OpOutput::new(
            format!("Instance {instance_id} created and tagged Name={name}"),
            serde_json::json!({ "id": instance_id, "name": name, "key_pair": key }),
        )
        .with_reference(ResourceRef::new(instance_id, name)))
    })
}

pub fn status_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let session = ctx.factory().aws().await?;
        let client = ec2::client(&session);
        let instance = ec2::find_instance(&client, name).await?;

        let state = ec2::instance_state(&instance);
        let id = instance.instance_id().unwrap_or_default().to_string();
        Ok(OpOutput::new(
            format!("Instance {name} is {state}"),
            ec2::instance_details(&instance),
        )
        .with_reference(ResourceRef::new(id, name)))
    })
}

pub fn delete_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let session = ctx.factory().aws().await?;
        let client = ec2::client(&session);
        let instance = ec2::find_instance(&client, name).await?;
        let id = instance.instance_id().unwrap_or_default().to_string();

        let state = ec2::terminate_instance(&client, &id).await?;
        Ok(
            OpOutput::message(format!("Instance {name} ({id}) is {state}"))
                .with_reference(ResourceRef::new(id, name)),
        )
    })
}

pub fn create_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let node_size = ctx.params.require("node-size")?;
        let node_count = ctx.params.get_u32("node-count")?.unwrap_or(1);
        let subnets = ctx.params.get_list("subnets");
        if subnets.len() < 2 {
            return Err(CoreError::Validation(
                "EKS needs at least two subnets in different availability zones \
                 (--subnets subnet-a,subnet-b)"
                    .into(),
            ));
        }

        let session = ctx.factory().aws().await?;
        let client = eks::client(&session);
        let role_arn = eks::ensure_cluster_role(&session).await?;
        eks::create_cluster(&client, name, &role_arn, &subnets, ctx.params.get("version")).await?;
        let reference = ResourceRef::new(name, name);

        if !ctx.wait {
            return Ok(OpOutput::new(
                format!(
                    "Cluster {name} creating; node group not attached (waiting disabled)"
                ),
                serde_json::json!({ "name": name, "status": "CREATING" }),
            )
            .with_reference(reference));
        }

        // The node group can only attach once the cluster is ACTIVE.
        poll::wait_for_status(
            &format!("cluster {name}"),
            || eks::cluster_status(&client, name),
            |status| status == "ACTIVE",
            |status| status == "FAILED",
            ctx.poll,
            &ctx.cancel,
            ctx.progress.as_ref(),
        )
        .await?;

        let nodegroup =
            eks::create_nodegroup(&client, name, &role_arn, node_size, node_count, &subnets)
                .await?;

        poll::wait_for(
            &format!("node group {nodegroup}"),
            || eks::nodegroup_status(&client, name, &nodegroup),
            |status: &Option<String>| status.clone().unwrap_or_else(|| "GONE".into()),
            |status| status.as_deref() == Some("ACTIVE"),
            |status| matches!(status.as_deref(), Some("CREATE_FAILED") | Some("DEGRADED")),
            ctx.poll,
            &ctx.cancel,
            ctx.progress.as_ref(),
        )
        .await?;

        let cluster = eks::get_cluster(&client, name).await?;
        Ok(OpOutput::new(
            format!("Cluster {name} is ACTIVE with node group {nodegroup}"),
            eks::cluster_details(&cluster),
        )
        .with_reference(reference))
    })
}

pub fn status_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let session = ctx.factory().aws().await?;
        let client = eks::client(&session);

        let cluster = eks::get_cluster(&client, name).await?;
        let nodegroup = eks::nodegroup_name(name);
        let nodegroup_status = eks::nodegroup_status(&client, name, &nodegroup).await?;

        let mut details = eks::cluster_details(&cluster);
        details["nodegroup"] = serde_json::json!({
            "name": nodegroup,
            "status": nodegroup_status,
        });

        let status = cluster
            .status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "UNKNOWN".into());
        Ok(OpOutput::new(format!("Cluster {name} is {status}"), details)
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn delete_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let session = ctx.factory().aws().await?;
        let client = eks::client(&session);
        let nodegroup = eks::nodegroup_name(name);

        // Node group before cluster; EKS refuses cluster deletion while the
        // node group exists, so this wait is not optional.
        let requested = eks::delete_nodegroup(&client, name, &nodegroup).await?;
        if requested {
            poll::wait_for(
                &format!("node group {nodegroup} deletion"),
                || eks::nodegroup_status(&client, name, &nodegroup),
                |status: &Option<String>| status.clone().unwrap_or_else(|| "DELETED".into()),
                |status| status.is_none(),
                |status| status.as_deref() == Some("DELETE_FAILED"),
                ctx.poll,
                &ctx.cancel,
                ctx.progress.as_ref(),
            )
            .await?;
        }

        eks::delete_cluster(&client, name).await?;
        Ok(OpOutput::message(format!("Cluster {name} deleted"))
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn create_bucket(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let session = ctx.factory().aws().await?;
        let client = s3::client(&session);
        s3::create_bucket(&client, name, Some(&session.region)).await?;
        Ok(OpOutput::message(format!("Bucket {name} created"))
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn status_bucket(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let session = ctx.factory().aws().await?;
        let client = s3::client(&session);
        let created_at = s3::bucket_created_at(&client, name).await?;
        let objects = s3::list_object_keys(&client, name).await?;
        Ok(OpOutput::new(
            format!("Bucket {name} holds {} objects", objects.len()),
            serde_json::json!({
                "name": name,
                "created_at": created_at,
                "objects": objects,
            }),
        )
        .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn delete_bucket(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        super::require_force(&ctx.params)?;
        let session = ctx.factory().aws().await?;
        let client = s3::client(&session);
        let removed = s3::empty_bucket(&client, name).await?;
        s3::delete_bucket(&client, name).await?;
        Ok(OpOutput::message(format!(
            "Bucket {name} deleted ({removed} objects removed)"
        ))
        .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn create_database(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let size = ctx.params.require("size")?;
        let password = ctx
            .params
            .get("master-password")
            .unwrap_or(RDS_DEFAULT_PASSWORD);

        let session = ctx.factory().aws().await?;
        let client = rds::client(&session);
        rds::create_instance(&client, name, size, password).await?;
        Ok(OpOutput::message(format!("Database {name} creating"))
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn status_database(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let session = ctx.factory().aws().await?;
        let client = rds::client(&session);
        let instance = rds::get_instance(&client, name).await?;

        let status = instance
            .db_instance_status()
            .unwrap_or("unknown")
            .to_string();
        Ok(OpOutput::new(
            format!("Database {name} is {status}"),
            rds::instance_details(&instance),
        )
        .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn delete_database(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let session = ctx.factory().aws().await?;
        let client = rds::client(&session);
        rds::delete_instance(&client, name).await?;
        Ok(OpOutput::message(format!("Database {name} is being deleted"))
            .with_reference(ResourceRef::new(name, name)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pair_selection_mirrors_droplet_rules() {
        assert!(choose_key_pair(&[], None).is_err());

        let one = vec!["lab".to_string()];
        assert_eq!(choose_key_pair(&one, None).unwrap(), "lab");

        let many = vec!["lab".to_string(), "work".to_string()];
        assert!(choose_key_pair(&many, None).is_err());
        assert_eq!(choose_key_pair(&many, Some("work")).unwrap(), "work");
        assert!(choose_key_pair(&many, Some("nope")).is_err());
    }
}

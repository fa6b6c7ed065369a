//! GCP handlers: Compute Engine, GKE, Cloud Storage, Cloud SQL

use serde_json::Value;

use crate::clients::gcp::status_of;
use crate::config::Config;
use crate::dispatch::{HandlerFuture, OpContext};
use crate::error::{CoreError, Result};
use crate::kubeconfig;
use crate::op::{OpOutput, Provider, ResourceRef};
use crate::poll;

/// Default root password for lab Cloud SQL instances, overridable via
/// `--master-password`.
const SQL_DEFAULT_PASSWORD: &str = "cloudsqltemp";

/// GCE wants images as `projects/<project>/global/images/<name>`; the CLI
/// takes the shorter `project/image` form.
fn source_image(image: &str) -> Result<String> {
    let Some((project, name)) = image.split_once('/') else {
        return Err(CoreError::Validation(
            "GCP images must be given as 'project/image-name', \
             e.g. 'ubuntu-os-cloud/ubuntu-1604-xenial-v20210119'"
                .into(),
        ));
    };
    if project.is_empty() || name.is_empty() || name.contains('/') {
        return Err(CoreError::Validation(format!(
            "'{image}' is not a valid 'project/image-name' image"
        )));
    }
    Ok(format!("projects/{project}/global/images/{name}"))
}

pub fn create_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let size = ctx.params.require("size")?;
        let image = source_image(ctx.params.require("image")?)?;

        let client = ctx.factory().gcp().await?;
        let operation = client.insert_instance(name, size, &image).await?;
        tracing::debug!(operation = %operation["name"].as_str().unwrap_or(""), "GCE insert submitted");

        Ok(
            OpOutput::message(format!("Compute instance {name} is being created"))
                .with_reference(ResourceRef::new(name, name)),
        )
    })
}

pub fn status_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().gcp().await?;
        let instance = client.get_instance(name).await?;

        let status = status_of(&instance);
        let details = serde_json::json!({
            "name": instance["name"],
            "machine_type": instance["machineType"],
            "zone": instance["zone"],
            "public_ip": instance["networkInterfaces"][0]["accessConfigs"][0]["natIP"],
            "status": status,
        });
        Ok(OpOutput::new(format!("Instance {name} is {status}"), details)
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn delete_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().gcp().await?;
        client.delete_instance(name).await?;
        Ok(OpOutput::message(format!("Instance {name} has been deleted"))
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn create_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let node_size = ctx.params.require("node-size")?;
        let node_count = ctx.params.get_u32("node-count")?.unwrap_or(1);

        let client = ctx.factory().gcp().await?;
        client
            .create_cluster(name, node_size, node_count, ctx.params.get("version"))
            .await?;
        let reference = ResourceRef::new(name, name);

        if !ctx.wait {
            return Ok(OpOutput::message(format!("GKE cluster {name} creating"))
                .with_reference(reference));
        }

        // The endpoint only populates once the cluster is RUNNING, and the
        // kubeconfig is useless without it.
        let ready = poll::wait_for(
            &format!("cluster {name}"),
            || client.get_cluster(name),
            |c: &Value| status_of(c),
            |c| status_of(c) == "RUNNING" && c["endpoint"].as_str().is_some_and(|e| !e.is_empty()),
            |c| status_of(c) == "ERROR",
            ctx.poll,
            &ctx.cancel,
            ctx.progress.as_ref(),
        )
        .await?;

        let endpoint = ready["endpoint"].as_str().unwrap_or_default();
        let ca_data = ready["masterAuth"]["clusterCaCertificate"]
            .as_str()
            .unwrap_or_default();
        let context = kubeconfig::gke_context_name(&client.project, &client.zone, name);
        let path = kubeconfig::write_token_config(
            &Config::config_dir()?,
            Provider::Gcp,
            &context,
            endpoint,
            ca_data,
            client.access_token(),
        )?;

        Ok(OpOutput::new(
            format!(
                "Cluster {name} is running; kubeconfig written to {}",
                path.display()
            ),
            ready,
        )
        .with_reference(reference))
    })
}

pub fn status_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().gcp().await?;
        let cluster = client.get_cluster(name).await?;

        let status = status_of(&cluster);
        let details = serde_json::json!({
            "name": cluster["name"],
            "version": cluster["currentNodeVersion"],
            "endpoint": cluster["endpoint"],
            "node_pool": cluster["nodePools"][0]["name"],
            "node_count": cluster["currentNodeCount"],
            "status": status,
            "created_at": cluster["createTime"],
        });
        Ok(OpOutput::new(format!("Cluster {name} is {status}"), details)
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn delete_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().gcp().await?;
        client.delete_cluster(name).await?;
        Ok(OpOutput::message(format!("Cluster {name} deleted"))
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn create_bucket(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().gcp().await?;
        client.create_bucket(name).await?;
        Ok(OpOutput::message(format!("Bucket {name} created"))
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn status_bucket(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().gcp().await?;
        let bucket = client.get_bucket(name).await?;
        let objects = client.list_object_names(name).await?;

        Ok(OpOutput::new(
            format!("Bucket {name} holds {} objects", objects.len()),
            serde_json::json!({
                "name": bucket["name"],
                "location": bucket["location"],
                "storage_class": bucket["storageClass"],
                "created_at": bucket["timeCreated"],
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
        let client = ctx.factory().gcp().await?;

        let objects = client.list_object_names(name).await?;
        for object in &objects {
            client.delete_object(name, object).await?;
        }
        client.delete_bucket(name).await?;

        Ok(OpOutput::message(format!(
            "Bucket {name} deleted ({} objects removed)",
            objects.len()
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
            .unwrap_or(SQL_DEFAULT_PASSWORD);

        let client = ctx.factory().gcp().await?;
        client.create_sql_instance(name, size, password).await?;
        Ok(
            OpOutput::message(format!("SQL instance {name} is being created"))
                .with_reference(ResourceRef::new(name, name)),
        )
    })
}

pub fn status_database(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().gcp().await?;
        let instance = client.get_sql_instance(name).await?;

        let status = status_of(&instance);
        let details = serde_json::json!({
            "name": instance["name"],
            "connection_name": instance["connectionName"],
            "database_version": instance["databaseVersion"],
            "tier": instance["settings"]["tier"],
            "ip_address": instance["ipAddresses"][0]["ipAddress"],
            "region": instance["region"],
            "status": status,
        });
        Ok(OpOutput::new(format!("SQL instance {name} is {status}"), details)
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn delete_database(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().gcp().await?;
        client.delete_sql_instance(name).await?;
        Ok(
            OpOutput::message(format!("SQL instance {name} has been deleted"))
                .with_reference(ResourceRef::new(name, name)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_shorthand_expands_to_full_path() {
        assert_eq!(
            source_image("ubuntu-os-cloud/ubuntu-1604-xenial-v20210119").unwrap(),
            "projects/ubuntu-os-cloud/global/images/ubuntu-1604-xenial-v20210119"
        );
    }

    #[test]
    fn image_without_project_is_rejected() {
        let err = source_image("ubuntu-1604").unwrap_err();
        assert!(err.to_string().contains("project/image-name"));
        assert!(source_image("a/b/c").is_err());
        assert!(source_image("/image").is_err());
    }
}

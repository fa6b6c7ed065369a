//! DigitalOcean handlers: droplets, managed Kubernetes, Spaces, databases

use crate::clients::aws::s3;
use crate::clients::digitalocean::{
    ClusterCreateRequest, DatabaseCreateRequest, DropletCreateRequest, KubernetesCluster,
    NodePoolCreateRequest, SshKey,
};
use crate::config::Config;
use crate::dispatch::{HandlerFuture, OpContext};
use crate::error::{CoreError, Result};
use crate::kubeconfig;
use crate::lookup::find_by_name;
use crate::op::{OpOutput, Provider, ResourceKind, ResourceRef};
use crate::poll;

/// Default engine settings for managed databases, matching the tool's
/// "small lab Postgres" shape everywhere.
const DB_ENGINE: &str = "pg";
const DB_VERSION: &str = "10";
const DB_NODES: u32 = 1;

fn choose_ssh_key<'k>(keys: &'k [SshKey], requested: Option<&str>) -> Result<&'k SshKey> {
    if keys.is_empty() {
        return Err(CoreError::Validation(
            "an SSH key is required to access a droplet and none are registered; \
             upload one (https://docs.digitalocean.com/products/droplets/how-to/add-ssh-keys/) \
             and try again"
                .into(),
        ));
    }
    match requested {
        Some(name) => keys.iter().find(|k| k.name == name).ok_or_else(|| {
            CoreError::Validation(format!(
                "no SSH key named '{name}'; available: {}",
                key_names(keys)
            ))
        }),
        None if keys.len() == 1 => Ok(&keys[0]),
        None => Err(CoreError::Validation(format!(
            "multiple SSH keys found; pass --ssh-key with one of: {}",
            key_names(keys)
        ))),
    }
}

fn key_names(keys: &[SshKey]) -> String {
    keys.iter()
        .map(|k| k.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let size = ctx.params.require("size")?;
        let image = ctx.params.require("image")?;
        let settings = ctx.config.digitalocean()?;
        let region = ctx
            .params
            .get("region")
            .unwrap_or(&settings.region)
            .to_string();

        let client = ctx.factory().digitalocean().await?;
        let keys = client.list_ssh_keys().await?;
        let key = choose_ssh_key(&keys, ctx.params.get("ssh-key"))?;
        tracing::debug!(key = %key.name, "using SSH key");

        let droplet = client
            .create_droplet(&DropletCreateRequest {
                name: name.to_string(),
                region,
                size: size.to_string(),
                image: image.to_string(),
                ssh_keys: vec![key.id],
            })
            .await?;

        let reference = ResourceRef::new(droplet.id.to_string(), &droplet.name);
        Ok(
            OpOutput::new(
                format!("Droplet {} created", droplet.name),
                serde_json::to_value(&droplet)?,
            )
            .with_reference(reference),
        )
    })
}

pub fn status_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().digitalocean().await?;
        let droplets = client.list_droplets().await?;
        let found = find_by_name(ResourceKind::Vm, name, droplets, |d| d.name.as_str())?;
        let droplet = client.get_droplet(found.id).await?;

        let status = droplet.status.clone().unwrap_or_else(|| "unknown".into());
        let reference = ResourceRef::new(droplet.id.to_string(), &droplet.name);
        Ok(
            OpOutput::new(
                format!("Droplet {name} is {status}"),
                serde_json::to_value(&droplet)?,
            )
            .with_reference(reference),
        )
    })
}

pub fn delete_vm(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().digitalocean().await?;
        let droplets = client.list_droplets().await?;
        let found = find_by_name(ResourceKind::Vm, name, droplets, |d| d.name.as_str())?;
        client.delete_droplet(found.id).await?;
        Ok(OpOutput::message(format!("Droplet {name} deleted"))
            .with_reference(ResourceRef::new(found.id.to_string(), name)))
    })
}

pub fn create_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let node_size = ctx.params.require("node-size")?;
        let version = ctx.params.require("version")?;
        let node_count = ctx.params.get_u32("node-count")?.unwrap_or(1);
        let settings = ctx.config.digitalocean()?;
        let region = ctx
            .params
            .get("region")
            .unwrap_or(&settings.region)
            .to_string();

        let client = ctx.factory().digitalocean().await?;
        let cluster = client
            .create_cluster(&ClusterCreateRequest {
                name: name.to_string(),
                region,
                version: version.to_string(),
                node_pools: vec![NodePoolCreateRequest {
                    name: format!("{name}-pool"),
                    size: node_size.to_string(),
                    count: node_count,
                }],
            })
            .await?;
        let reference = ResourceRef::new(&cluster.id, &cluster.name);

        if !ctx.wait {
            return Ok(OpOutput::new(
                format!("Cluster {name} creating"),
                serde_json::to_value(&cluster)?,
            )
            .with_reference(reference));
        }

        let id = cluster.id.clone();
        let ready = poll::wait_for(
            &format!("cluster {name}"),
            || client.get_cluster(&id),
            |c: &KubernetesCluster| c.state().to_string(),
            |c| c.state() == "running",
            |c| c.state() == "error",
            ctx.poll,
            &ctx.cancel,
            ctx.progress.as_ref(),
        )
        .await?;

        let yaml = client.kubeconfig(&id).await?;
        let path = kubeconfig::write_raw(&Config::config_dir()?, Provider::Do, &yaml)?;

        Ok(OpOutput::new(
            format!(
                "Cluster {name} is running; kubeconfig written to {}",
                path.display()
            ),
            serde_json::to_value(&ready)?,
        )
        .with_reference(reference))
    })
}

pub fn status_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().digitalocean().await?;
        let clusters = client.list_clusters().await?;
        let found = find_by_name(ResourceKind::Cluster, name, clusters, |c| c.name.as_str())?;
        let cluster = client.get_cluster(&found.id).await?;

        let reference = ResourceRef::new(&cluster.id, &cluster.name);
        let state = cluster.state().to_string();
        Ok(
            OpOutput::new(
                format!("Cluster {name} is {state}"),
                serde_json::to_value(&cluster)?,
            )
            .with_reference(reference),
        )
    })
}

pub fn delete_cluster(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().digitalocean().await?;
        let clusters = client.list_clusters().await?;
        let found = find_by_name(ResourceKind::Cluster, name, clusters, |c| c.name.as_str())?;
        client.delete_cluster(&found.id).await?;
        Ok(OpOutput::message(format!("Cluster {name} deleted"))
            .with_reference(ResourceRef::new(&found.id, name)))
    })
}

pub fn create_bucket(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().spaces_s3().await?;
        // The Spaces region is baked into the endpoint; no location
        // constraint is sent.
        s3::create_bucket(&client, name, None).await?;
        Ok(OpOutput::message(format!("Space {name} created"))
            .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn status_bucket(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().spaces_s3().await?;
        let created_at = s3::bucket_created_at(&client, name).await?;
        let objects = s3::list_object_keys(&client, name).await?;
        Ok(OpOutput::new(
            format!("Space {name} holds {} objects", objects.len()),
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
        let client = ctx.factory().spaces_s3().await?;
        let removed = s3::empty_bucket(&client, name).await?;
        s3::delete_bucket(&client, name).await?;
        Ok(OpOutput::message(format!(
            "Space {name} deleted ({removed} objects removed)"
        ))
        .with_reference(ResourceRef::new(name, name)))
    })
}

pub fn create_database(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let size = ctx.params.require("size")?;
        let settings = ctx.config.digitalocean()?;
        let region = ctx
            .params
            .get("region")
            .unwrap_or(&settings.region)
            .to_string();
        let version = ctx.params.get("version").unwrap_or(DB_VERSION);

        let client = ctx.factory().digitalocean().await?;
        let database = client
            .create_database(&DatabaseCreateRequest {
                name: name.to_string(),
                engine: DB_ENGINE.to_string(),
                version: version.to_string(),
                region,
                size: size.to_string(),
                num_nodes: DB_NODES,
            })
            .await?;

        let reference = ResourceRef::new(&database.id, &database.name);
        Ok(
            OpOutput::new(
                format!("Database {} created", database.name),
                serde_json::to_value(&database)?,
            )
            .with_reference(reference),
        )
    })
}

pub fn status_database(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().digitalocean().await?;
        let databases = client.list_databases().await?;
        let found = find_by_name(ResourceKind::Database, name, databases, |d| d.name.as_str())?;
        let database = client.get_database(&found.id).await?;

        let status = database.status.clone().unwrap_or_else(|| "unknown".into());
        let reference = ResourceRef::new(&database.id, &database.name);
        Ok(
            OpOutput::new(
                format!("Database {name} is {status}"),
                serde_json::to_value(&database)?,
            )
            .with_reference(reference),
        )
    })
}

pub fn delete_database(ctx: &OpContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let name = ctx.params.require("name")?;
        let client = ctx.factory().digitalocean().await?;
        let databases = client.list_databases().await?;
        let found = find_by_name(ResourceKind::Database, name, databases, |d| d.name.as_str())?;
        client.delete_database(&found.id).await?;
        Ok(OpOutput::message(format!("Database {name} deleted"))
            .with_reference(ResourceRef::new(&found.id, name)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u64, name: &str) -> SshKey {
        SshKey {
            id,
            name: name.to_string(),
            fingerprint: None,
        }
    }

    #[test]
    fn no_ssh_keys_is_a_hard_error() {
        let err = choose_ssh_key(&[], None).unwrap_err();
        assert!(err.to_string().contains("SSH key is required"));
    }

    #[test]
    fn single_key_is_used_automatically() {
        let keys = vec![key(1, "laptop")];
        assert_eq!(choose_ssh_key(&keys, None).unwrap().id, 1);
    }

    #[test]
    fn multiple_keys_need_an_explicit_choice() {
        let keys = vec![key(1, "laptop"), key(2, "desktop")];
        let err = choose_ssh_key(&keys, None).unwrap_err();
        assert!(err.to_string().contains("--ssh-key"));
        assert!(err.to_string().contains("desktop"));

        assert_eq!(choose_ssh_key(&keys, Some("desktop")).unwrap().id, 2);
        assert!(choose_ssh_key(&keys, Some("nope")).is_err());
    }
}

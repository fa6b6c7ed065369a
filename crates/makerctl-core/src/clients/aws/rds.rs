//! RDS managed-database operations

use aws_sdk_rds::Client;
use aws_sdk_rds::types::DbInstance;

use super::{AwsSession, sdk_error};
use crate::error::{CoreError, Result};
use crate::op::Provider;

/// Lab defaults matching the rest of the tool's "small Postgres" shape.
const ENGINE: &str = "postgres";
const ALLOCATED_STORAGE_GB: i32 = 5;
const MASTER_USERNAME: &str = "rdsadmintemp";

pub fn client(session: &AwsSession) -> Client {
    Client::new(&session.config)
}

pub async fn create_instance(
    client: &Client,
    name: &str,
    instance_class: &str,
    master_password: &str,
) -> Result<()> {
    client
        .create_db_instance()
        .db_instance_identifier(name)
        .db_instance_class(instance_class)
        .engine(ENGINE)
        .allocated_storage(ALLOCATED_STORAGE_GB)
        .master_username(MASTER_USERNAME)
        .master_user_password(master_password)
        .send()
        .await
        .map_err(sdk_error)?;
    Ok(())
}

pub async fn get_instance(client: &Client, name: &str) -> Result<DbInstance> {
    let output = client
        .describe_db_instances()
        .db_instance_identifier(name)
        .send()
        .await
        .map_err(sdk_error)?;
    output
        .db_instances()
        .first()
        .cloned()
        .ok_or_else(|| {
            CoreError::provider(Provider::Aws, format!("database instance '{name}' not found"))
        })
}

pub async fn delete_instance(client: &Client, name: &str) -> Result<()> {
    client
        .delete_db_instance()
        .db_instance_identifier(name)
        .skip_final_snapshot(true)
        .send()
        .await
        .map_err(sdk_error)?;
    Ok(())
}

/// Flatten the interesting instance fields for the presenter.
pub fn instance_details(instance: &DbInstance) -> serde_json::Value {
    serde_json::json!({
        "name": instance.db_instance_identifier(),
        "arn": instance.db_instance_arn(),
        "class": instance.db_instance_class(),
        "engine": instance.engine(),
        "engine_version": instance.engine_version(),
        "master_username": instance.master_username(),
        "endpoint": instance.endpoint().and_then(|e| e.address()),
        "availability_zone": instance.availability_zone(),
        "status": instance.db_instance_status(),
        "created_at": instance.instance_create_time().map(|t| format!("{t:?}")),
    })
}

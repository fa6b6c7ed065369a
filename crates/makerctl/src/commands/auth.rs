//! `makerctl auth` — credential setup
//!
//! Prompts for the provider's credentials, persists them to the config
//! file, then validates them eagerly with a whoami round trip and prints
//! the account identity. An existing section is shown first and kept if
//! the user confirms it is still accurate.

use std::io::Write;
use std::path::PathBuf;

use makerctl_core::clients::ClientFactory;
use makerctl_core::{
    AwsSettings, Config, CoreError, DoSettings, GcpSettings, Provider, Result,
};

use crate::cli::{AuthArgs, Cli};

pub async fn run(args: &AuthArgs, cli: &Cli) -> Result<()> {
    let path = config_path(cli)?;
    let mut config = Config::load_from_path(&path)?;
    let provider = args.provider.provider;

    let changed = match provider {
        Provider::Do => configure_digitalocean(&mut config)?,
        Provider::Aws => configure_aws(&mut config)?,
        Provider::Gcp => configure_gcp(&mut config)?,
    };

    if changed {
        config.save_to_path(&path)?;
        println!("Config written to {}", path.display());
    }

    let factory = ClientFactory::new(&config);
    let identity = match provider {
        Provider::Do => factory.digitalocean_identity().await?,
        Provider::Aws => factory.aws_identity().await?,
        Provider::Gcp => factory.gcp().await?.identity(),
    };
    println!("Successfully authenticated with {provider}");
    println!("Identity: {identity}");
    Ok(())
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config_file {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(Config::default_path().map_err(CoreError::Config)?),
    }
}

/// Show the current section and ask whether to keep it. Returns true when
/// the user wants to re-enter the values.
fn wants_replacement<T: serde::Serialize>(section: &T) -> Result<bool> {
    let rendered = toml::to_string_pretty(section)
        .map_err(|e| CoreError::Validation(format!("cannot render config section: {e}")))?;
    println!("\nCurrent config:\n\n{rendered}");
    let answer = prompt_line("Is this info still accurate? (Y/n): ")?;
    Ok(!answer.trim().eq_ignore_ascii_case("y") && !answer.trim().is_empty())
}

fn configure_digitalocean(config: &mut Config) -> Result<bool> {
    if let Some(existing) = &config.digitalocean
        && !wants_replacement(existing)?
    {
        return Ok(false);
    }

    println!("Tokens can be generated at https://cloud.digitalocean.com/account/api/tokens");
    let token = prompt_secret("Enter PAT token: ")?;
    let region = prompt_line("Default region (e.g. nyc3): ")?;
    println!("Spaces access keys are only needed for bucket commands; leave blank to skip.");
    let spaces_key = optional(prompt_line("Spaces access key: ")?);
    let spaces_secret = match &spaces_key {
        Some(_) => optional(prompt_secret("Spaces secret key: ")?),
        None => None,
    };

    let defaults = DoSettings {
        token,
        region,
        api_url: "https://api.digitalocean.com".to_string(),
        spaces_key,
        spaces_secret,
        spaces_endpoint: None,
    };
    config.digitalocean = Some(defaults);
    Ok(true)
}

fn configure_aws(config: &mut Config) -> Result<bool> {
    if let Some(existing) = &config.aws
        && !wants_replacement(existing)?
    {
        return Ok(false);
    }

    let access_key_id = prompt_line("Enter AWS access key id: ")?;
    let secret_access_key = prompt_secret("Enter AWS secret access key: ")?;
    let region = prompt_line("Default region (e.g. us-east-2): ")?;

    config.aws = Some(AwsSettings {
        access_key_id,
        secret_access_key,
        region,
        endpoint_url: None,
    });
    Ok(true)
}

fn configure_gcp(config: &mut Config) -> Result<bool> {
    if let Some(existing) = &config.gcp
        && !wants_replacement(existing)?
    {
        return Ok(false);
    }

    println!(
        "GCP needs a service-account key file; see \
         https://cloud.google.com/iam/docs/creating-managing-service-account-keys"
    );
    let keyfile = prompt_line("Path to the key file: ")?;
    let zone = prompt_line("Default compute zone (e.g. us-east1-b): ")?;
    let project = prompt_line("Target GCP project: ")?;

    config.gcp = Some(GcpSettings {
        keyfile,
        zone,
        project,
        endpoint_url: None,
    });
    Ok(true)
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_secret(prompt: &str) -> Result<String> {
    let secret = rpassword::prompt_password(prompt)?;
    Ok(secret.trim().to_string())
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

//! CLI structure and command definitions
//!
//! The surface is verb-first: `create|status|delete <object>` plus `auth`
//! for credential setup. Every leaf command carries `--provider`, and the
//! (provider, object, verb) triple is handed to the core dispatch table
//! untouched — the CLI owns flags and usage text, nothing else.

use clap::{Args, Parser, Subcommand};
use makerctl_core::{OpParams, Provider, ResourceKind, Verb};

use crate::output::OutputFormat;

/// Multi-cloud lab provisioning CLI
#[derive(Parser, Debug)]
#[command(name = "makerctl")]
#[command(
    version,
    about = "Spin up and tear down lab infrastructure on DigitalOcean, AWS, and GCP"
)]
#[command(long_about = "
Spin up and tear down lab infrastructure on DigitalOcean, AWS, and GCP.

makerctl is not a replacement for each provider's own CLI; it covers the
handful of objects you need for labs and development work — VMs, managed
Kubernetes clusters, object-storage buckets, and small Postgres databases —
behind one uniform command surface.

EXAMPLES:
    # Store credentials for a provider (prompted)
    makerctl auth --provider do

    # Create a VM
    makerctl create vm --provider do --name test-vm --size s-1vcpu-1gb --image ubuntu-16-04-x64

    # Create a cluster and wait for it (kubeconfig lands in the config dir)
    makerctl create cluster --provider aws --name demo --node-size t3.medium \\
        --node-count 2 --subnets subnet-a,subnet-b

    # Inspect and tear down
    makerctl status cluster --provider aws --name demo
    makerctl delete cluster --provider aws --name demo

    # JSON output for scripting
    makerctl status vm --provider do --name test-vm -o json
")]
pub struct Cli {
    /// Path to alternate configuration file
    #[arg(long, global = true, env = "MAKERCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a resource on the chosen provider
    #[command(subcommand)]
    Create(CreateObject),

    /// Show the current state of a resource
    #[command(subcommand)]
    Status(StatusObject),

    /// Tear a resource down
    #[command(subcommand)]
    Delete(DeleteObject),

    /// Configure credentials for a provider (prompted, then verified)
    Auth(AuthArgs),

    /// Version information
    #[command(visible_alias = "ver")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum CreateObject {
    /// Create a VM
    Vm(CreateVmArgs),
    /// Create a managed Kubernetes cluster
    Cluster(CreateClusterArgs),
    /// Create an object-storage bucket
    Bucket(BucketNameArgs),
    /// Create a managed Postgres database
    #[command(visible_alias = "database")]
    Db(CreateDbArgs),
}

#[derive(Subcommand, Debug)]
pub enum StatusObject {
    /// Show VM state
    Vm(NameArgs),
    /// Show cluster state
    Cluster(NameArgs),
    /// Show bucket metadata and contents
    Bucket(NameArgs),
    /// Show database state
    #[command(visible_alias = "database")]
    Db(NameArgs),
}

#[derive(Subcommand, Debug)]
pub enum DeleteObject {
    /// Delete a VM
    Vm(NameArgs),
    /// Delete a cluster (node group first on AWS)
    Cluster(ClusterDeleteArgs),
    /// Delete a bucket and everything in it
    Bucket(BucketDeleteArgs),
    /// Delete a database
    #[command(visible_alias = "database")]
    Db(NameArgs),
}

/// Shared `--provider` flag
#[derive(Args, Debug, Clone)]
pub struct ProviderArg {
    /// Cloud provider to target
    #[arg(long, short = 'p', value_enum)]
    pub provider: Provider,
}

/// Flags controlling waits on long-running operations
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Return as soon as the provider accepts the request instead of
    /// waiting for completion
    #[arg(long)]
    pub no_wait: bool,

    /// Maximum time to wait, in seconds
    #[arg(long, default_value = "1800")]
    pub wait_timeout: u64,

    /// Polling interval, in seconds
    #[arg(long, default_value = "60")]
    pub wait_interval: u64,
}

impl Default for WaitArgs {
    fn default() -> Self {
        Self {
            no_wait: false,
            wait_timeout: 1800,
            wait_interval: 60,
        }
    }
}

#[derive(Args, Debug)]
pub struct CreateVmArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Name of the VM
    #[arg(long, short = 'n')]
    pub name: String,

    /// VM size / instance type (provider specific)
    #[arg(long, short = 's')]
    pub size: String,

    /// OS image, AMI id, or 'project/image-name' on GCP
    #[arg(long, short = 'i')]
    pub image: String,

    /// Region override (defaults to the configured one)
    #[arg(long)]
    pub region: Option<String>,

    /// SSH key name to attach when the account has several
    #[arg(long)]
    pub ssh_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateClusterArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Name of the cluster
    #[arg(long, short = 'n')]
    pub name: String,

    /// Node VM size / instance type
    #[arg(long, short = 's')]
    pub node_size: String,

    /// Node pool size
    #[arg(long, short = 'c', default_value = "1")]
    pub node_count: u32,

    /// Kubernetes version (required on DigitalOcean)
    #[arg(long)]
    pub version: Option<String>,

    /// Comma-separated subnet ids (AWS; at least two)
    #[arg(long)]
    pub subnets: Option<String>,

    /// Region override (defaults to the configured one)
    #[arg(long)]
    pub region: Option<String>,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct CreateDbArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Name of the database
    #[arg(long, short = 'n')]
    pub name: String,

    /// Database size / instance class / tier
    #[arg(long, short = 's')]
    pub size: String,

    /// Region override (defaults to the configured one)
    #[arg(long)]
    pub region: Option<String>,

    /// Master/root password (lab default used when omitted)
    #[arg(long)]
    pub master_password: Option<String>,
}

#[derive(Args, Debug)]
pub struct BucketNameArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Name of the bucket
    #[arg(long, short = 'n')]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Name of the resource
    #[arg(long, short = 'n')]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct ClusterDeleteArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Name of the cluster
    #[arg(long, short = 'n')]
    pub name: String,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Args, Debug)]
pub struct BucketDeleteArgs {
    #[command(flatten)]
    pub provider: ProviderArg,

    /// Name of the bucket
    #[arg(long, short = 'n')]
    pub name: String,

    /// Confirm deleting the bucket together with all of its objects
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(flatten)]
    pub provider: ProviderArg,
}

/// A resolved operation: the descriptor pieces plus the wait flags.
pub struct Operation {
    pub provider: Provider,
    pub kind: ResourceKind,
    pub verb: Verb,
    pub params: OpParams,
    pub wait: WaitArgs,
}

impl Commands {
    /// Map a parsed command onto an operation descriptor. `None` for the
    /// commands that never reach the dispatch table.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Commands::Create(object) => Some(object.operation()),
            Commands::Status(object) => Some(object.operation()),
            Commands::Delete(object) => Some(object.operation()),
            Commands::Auth(_) | Commands::Version | Commands::Completions { .. } => None,
        }
    }
}

fn set_opt(params: &mut OpParams, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        params.set(key, value);
    }
}

impl CreateObject {
    fn operation(&self) -> Operation {
        match self {
            CreateObject::Vm(args) => {
                let mut params = OpParams::new()
                    .with("name", &args.name)
                    .with("size", &args.size)
                    .with("image", &args.image);
                set_opt(&mut params, "region", &args.region);
                set_opt(&mut params, "ssh-key", &args.ssh_key);
                Operation {
                    provider: args.provider.provider,
                    kind: ResourceKind::Vm,
                    verb: Verb::Create,
                    params,
                    wait: WaitArgs::default(),
                }
            }
            CreateObject::Cluster(args) => {
                let mut params = OpParams::new()
                    .with("name", &args.name)
                    .with("node-size", &args.node_size)
                    .with("node-count", args.node_count.to_string());
                set_opt(&mut params, "version", &args.version);
                set_opt(&mut params, "subnets", &args.subnets);
                set_opt(&mut params, "region", &args.region);
                Operation {
                    provider: args.provider.provider,
                    kind: ResourceKind::Cluster,
                    verb: Verb::Create,
                    params,
                    wait: args.wait.clone(),
                }
            }
            CreateObject::Bucket(args) => Operation {
                provider: args.provider.provider,
                kind: ResourceKind::Bucket,
                verb: Verb::Create,
                params: OpParams::new().with("name", &args.name),
                wait: WaitArgs::default(),
            },
            CreateObject::Db(args) => {
                let mut params = OpParams::new()
                    .with("name", &args.name)
                    .with("size", &args.size);
                set_opt(&mut params, "region", &args.region);
                set_opt(&mut params, "master-password", &args.master_password);
                Operation {
                    provider: args.provider.provider,
                    kind: ResourceKind::Database,
                    verb: Verb::Create,
                    params,
                    wait: WaitArgs::default(),
                }
            }
        }
    }
}

impl StatusObject {
    fn operation(&self) -> Operation {
        let (args, kind) = match self {
            StatusObject::Vm(args) => (args, ResourceKind::Vm),
            StatusObject::Cluster(args) => (args, ResourceKind::Cluster),
            StatusObject::Bucket(args) => (args, ResourceKind::Bucket),
            StatusObject::Db(args) => (args, ResourceKind::Database),
        };
        Operation {
            provider: args.provider.provider,
            kind,
            verb: Verb::Status,
            params: OpParams::new().with("name", &args.name),
            wait: WaitArgs::default(),
        }
    }
}

impl DeleteObject {
    fn operation(&self) -> Operation {
        match self {
            DeleteObject::Vm(args) => Operation {
                provider: args.provider.provider,
                kind: ResourceKind::Vm,
                verb: Verb::Delete,
                params: OpParams::new().with("name", &args.name),
                wait: WaitArgs::default(),
            },
            DeleteObject::Cluster(args) => Operation {
                provider: args.provider.provider,
                kind: ResourceKind::Cluster,
                verb: Verb::Delete,
                params: OpParams::new().with("name", &args.name),
                wait: args.wait.clone(),
            },
            DeleteObject::Bucket(args) => {
                let mut params = OpParams::new().with("name", &args.name);
                if args.force {
                    params.set("force", "true");
                }
                Operation {
                    provider: args.provider.provider,
                    kind: ResourceKind::Bucket,
                    verb: Verb::Delete,
                    params,
                    wait: WaitArgs::default(),
                }
            }
            DeleteObject::Db(args) => Operation {
                provider: args.provider.provider,
                kind: ResourceKind::Database,
                verb: Verb::Delete,
                params: OpParams::new().with("name", &args.name),
                wait: WaitArgs::default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_vm_maps_to_descriptor() {
        let cli = Cli::parse_from([
            "makerctl", "create", "vm", "--provider", "do", "--name", "test-vm", "--size",
            "s-1vcpu-1gb", "--image", "ubuntu-16-04-x64",
        ]);
        let op = cli.command.operation().unwrap();
        assert_eq!(op.provider, Provider::Do);
        assert_eq!(op.kind, ResourceKind::Vm);
        assert_eq!(op.verb, Verb::Create);
        assert_eq!(op.params.get("name"), Some("test-vm"));
        assert_eq!(op.params.get("size"), Some("s-1vcpu-1gb"));
        assert_eq!(op.params.get("region"), None);
    }

    #[test]
    fn db_alias_matches_database() {
        let cli = Cli::parse_from([
            "makerctl", "status", "database", "--provider", "gcp", "--name", "labdb",
        ]);
        let op = cli.command.operation().unwrap();
        assert_eq!(op.kind, ResourceKind::Database);
        assert_eq!(op.verb, Verb::Status);
    }

    #[test]
    fn delete_bucket_force_flows_into_params() {
        let cli = Cli::parse_from([
            "makerctl", "delete", "bucket", "-p", "aws", "-n", "logs", "--force",
        ]);
        let op = cli.command.operation().unwrap();
        assert_eq!(op.params.get("force"), Some("true"));

        let cli = Cli::parse_from(["makerctl", "delete", "bucket", "-p", "aws", "-n", "logs"]);
        let op = cli.command.operation().unwrap();
        assert_eq!(op.params.get("force"), None);
    }

    #[test]
    fn cluster_wait_flags_are_captured() {
        let cli = Cli::parse_from([
            "makerctl",
            "create",
            "cluster",
            "-p",
            "aws",
            "-n",
            "demo",
            "--node-size",
            "t3.medium",
            "--subnets",
            "subnet-a,subnet-b",
            "--no-wait",
            "--wait-interval",
            "30",
        ]);
        let op = cli.command.operation().unwrap();
        assert!(op.wait.no_wait);
        assert_eq!(op.wait.wait_interval, 30);
        assert_eq!(op.wait.wait_timeout, 1800);
        assert_eq!(op.params.get("subnets"), Some("subnet-a,subnet-b"));
    }

    #[test]
    fn auth_and_version_have_no_operation() {
        let cli = Cli::parse_from(["makerctl", "auth", "--provider", "aws"]);
        assert!(cli.command.operation().is_none());
        let cli = Cli::parse_from(["makerctl", "version"]);
        assert!(cli.command.operation().is_none());
    }
}

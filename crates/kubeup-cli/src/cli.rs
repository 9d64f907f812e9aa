//! Command-line surface (spec §6). One in-process binary, no client/server
//! split: every subcommand below calls straight into `kubeup-compose`/
//! `kubeup-graph`/`kubeup-cloud` in the same process.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "kubeup", version, about = "Provisions and reconciles a Kubernetes cluster on AWS or GCE")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provisions or reconciles a cluster.
    Create {
        #[command(subcommand)]
        command: CreateCommand,
    },
    /// Tears down a cluster.
    Delete {
        #[command(subcommand)]
        command: DeleteCommand,
    },
    /// Lists clusters visible in a region.
    Discover {
        #[command(subcommand)]
        command: DiscoverCommand,
    },
    /// Extracts a running cluster's configuration and certificates.
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
}

#[derive(Subcommand)]
pub enum CreateCommand {
    /// Composes and runs the full Unit tree for one cluster.
    Cluster(CreateClusterArgs),
    /// Downloads a client cert/key from a running master and writes a kubeconfig.
    Kubecfg(CreateKubecfgArgs),
}

#[derive(Subcommand)]
pub enum DeleteCommand {
    /// Discovers and removes every tagged resource belonging to a cluster.
    Cluster(DeleteClusterArgs),
}

#[derive(Subcommand)]
pub enum DiscoverCommand {
    /// Lists cluster ids visible via cloud tags in a region.
    Clusters(DiscoverClustersArgs),
}

#[derive(Subcommand)]
pub enum ExportCommand {
    /// SSHes to master and node, extracts settings/certs into kubernetes.yaml.
    Cluster(ExportClusterArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum CloudArg {
    Aws,
    Gce,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum TargetArg {
    Direct,
    Bash,
    Dryrun,
}

#[derive(clap::Args)]
pub struct CreateClusterArgs {
    #[arg(long)]
    pub cloud: CloudArg,

    /// Directory `kubernetes.yaml` and the local PKI (`pki/`) live under.
    #[arg(long)]
    pub dir: PathBuf,

    /// Directory holding the release artifacts (server binary tar, salt
    /// tar, bootstrap script) named per spec §4.6's layout.
    #[arg(long)]
    pub release: PathBuf,

    #[arg(long = "cluster-id")]
    pub cluster_id: String,

    #[arg(long)]
    pub zone: String,

    /// Path to the SSH public key granted to cluster nodes.
    #[arg(short = 'i', long = "ssh-public-key")]
    pub ssh_public_key: PathBuf,

    #[arg(long = "s3-bucket")]
    pub s3_bucket: Option<String>,

    #[arg(long = "s3-region")]
    pub s3_region: Option<String>,

    /// GCE project id; required when `--cloud gce`.
    #[arg(long)]
    pub project: Option<String>,

    #[arg(long, value_enum, default_value = "direct")]
    pub target: TargetArg,
}

#[derive(clap::Args)]
pub struct DeleteClusterArgs {
    #[arg(long = "cluster-id")]
    pub cluster_id: String,

    #[arg(long)]
    pub zone: String,

    #[arg(long)]
    pub cloud: CloudArg,

    /// GCE project id; required when `--cloud gce`.
    #[arg(long)]
    pub project: Option<String>,

    /// Must be passed to actually delete anything (spec §6).
    #[arg(long)]
    pub yes: bool,
}

#[derive(clap::Args)]
pub struct DiscoverClustersArgs {
    #[arg(long)]
    pub region: String,

    #[arg(long)]
    pub cloud: CloudArg,

    #[arg(long)]
    pub project: Option<String>,

    /// Restricts the listing to a single cluster id.
    pub cluster_id: Option<String>,
}

#[derive(clap::Args)]
pub struct ExportClusterArgs {
    #[arg(long)]
    pub master: String,

    #[arg(long)]
    pub node: String,

    #[arg(short = 'i', long = "ssh-private-key")]
    pub ssh_private_key: PathBuf,

    #[arg(long)]
    pub dest: PathBuf,
}

#[derive(clap::Args)]
pub struct CreateKubecfgArgs {
    #[arg(long)]
    pub master: String,

    #[arg(short = 'i', long = "ssh-private-key")]
    pub ssh_private_key: PathBuf,
}

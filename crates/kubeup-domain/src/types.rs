use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Stable identifier for a cluster, used as the default prefix for every
/// named cloud resource the composer emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub String);

impl ClusterId {
    pub fn new(s: impl Into<String>) -> Self {
        ClusterId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Cloud provider ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    Aws,
    Gce,
}

impl std::fmt::Display for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cloud::Aws => write!(f, "aws"),
            Cloud::Gce => write!(f, "gce"),
        }
    }
}

impl std::str::FromStr for Cloud {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(Cloud::Aws),
            "gce" => Ok(Cloud::Gce),
            other => Err(crate::error::DomainError::UnknownCloud(other.to_string())),
        }
    }
}

/// Output-storage execution backend selected at run start (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Direct,
    Bash,
    Dryrun,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Direct => write!(f, "direct"),
            TargetKind::Bash => write!(f, "bash"),
            TargetKind::Dryrun => write!(f, "dryrun"),
        }
    }
}

// ── ClusterConfig ─────────────────────────────────────────────────────────────

/// The top-level declarative description of a cluster (spec §3, §9).
///
/// Closed, enumerated mapping: unknown YAML keys are a hard parse error
/// (`serde(deny_unknown_fields)`). Required fields have no `Option`; every
/// optional field left unset is filled in by `ClusterComposer` with a
/// provider-specific default (see `kubeup-compose::defaults`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    // Required.
    pub cluster_id: ClusterId,
    pub cloud: Cloud,
    pub zone: String,

    // Release artefacts — local paths the composer wraps as `Resource`s.
    pub server_binary_tar_path: String,
    pub salt_tar_path: String,
    pub bootstrap_script_path: String,

    // Networking.
    #[serde(default)]
    pub vpc_cidr: Option<String>,
    #[serde(default)]
    pub subnet_cidr: Option<String>,
    #[serde(default)]
    pub cluster_ip_range: Option<String>,
    #[serde(default)]
    pub service_cluster_ip_range: Option<String>,
    #[serde(default)]
    pub master_ip_range: Option<String>,
    #[serde(default)]
    pub master_internal_ip: Option<String>,
    #[serde(default)]
    pub allocate_node_cidrs: Option<bool>,
    #[serde(default)]
    pub dns_domain: Option<String>,
    #[serde(default)]
    pub dns_server_ip: Option<String>,
    #[serde(default)]
    pub dns_replicas: Option<u32>,

    // Sizing.
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub master_instance_type: Option<String>,
    #[serde(default)]
    pub node_instance_type: Option<String>,
    #[serde(default)]
    pub node_count: Option<u32>,
    #[serde(default)]
    pub master_volume_size_gb: Option<i64>,
    #[serde(default)]
    pub master_volume_type: Option<String>,

    // Naming.
    #[serde(default)]
    pub instance_prefix: Option<String>,
    #[serde(default)]
    pub node_instance_prefix: Option<String>,
    #[serde(default)]
    pub master_name: Option<String>,

    // Credentials.
    #[serde(default)]
    pub kube_user: Option<String>,
    #[serde(default)]
    pub kube_password: Option<String>,
    #[serde(default)]
    pub kubelet_token: Option<String>,
    #[serde(default)]
    pub kube_proxy_token: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub ssh_public_key_path: Option<String>,

    // Feature toggles.
    #[serde(default)]
    pub enable_cluster_dns: Option<bool>,
    #[serde(default)]
    pub enable_cluster_logging: Option<bool>,
    #[serde(default)]
    pub enable_cluster_monitoring: Option<String>,
    #[serde(default)]
    pub enable_cluster_ui: Option<bool>,
    #[serde(default)]
    pub enable_cluster_registry: Option<bool>,
    #[serde(default)]
    pub admission_control: Option<String>,
    #[serde(default)]
    pub network_provider: Option<String>,
    #[serde(default)]
    pub docker_storage: Option<String>,

    // Extra SANs for the master certificate (spec §4.9).
    #[serde(default)]
    pub master_extra_sans: Vec<String>,

    // AWS-only.
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub s3_region: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub internet_gateway_id: Option<String>,
    #[serde(default)]
    pub route_table_id: Option<String>,
    #[serde(default)]
    pub dhcp_options_id: Option<String>,
    #[serde(default)]
    pub master_elastic_ip: Option<String>,

    // GCE-only.
    #[serde(default)]
    pub gce_project: Option<String>,
    #[serde(default)]
    pub gce_network: Option<String>,
}

impl ClusterConfig {
    /// Validates the required fields (spec §3: "cluster identifier, zone,
    /// and cloud provider are required").
    pub fn validate(&self) -> Result<(), crate::error::DomainError> {
        if self.cluster_id.as_str().is_empty() {
            return Err(crate::error::DomainError::InvalidConfig(
                "cluster_id is required".into(),
            ));
        }
        if self.zone.len() <= 2 {
            return Err(crate::error::DomainError::InvalidConfig(format!(
                "invalid zone: {:?}",
                self.zone
            )));
        }
        if matches!(self.cloud, Cloud::Gce) && self.gce_project.is_none() {
            return Err(crate::error::DomainError::InvalidConfig(
                "gce_project is required for cloud = gce".into(),
            ));
        }
        Ok(())
    }
}

/// Resolved bootstrap environment: the flattened string map the bootstrap
/// script consumes via `/etc/kubernetes/kube_env.yaml` (spec §4.11).
pub type BootstrapEnv = HashMap<String, String>;

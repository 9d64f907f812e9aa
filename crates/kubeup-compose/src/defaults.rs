//! Fills every optional `ClusterConfig` field the caller left unset with a
//! provider-aware default, the way the original's `PopulateClusterSpec` pass
//! does before any Unit is ever built (SPEC_FULL §4.9).

use kubeup_domain::{Cloud, ClusterConfig};

const DEFAULT_VPC_CIDR: &str = "172.20.0.0/16";
const DEFAULT_SUBNET_CIDR: &str = "172.20.0.0/24";
const DEFAULT_CLUSTER_IP_RANGE: &str = "10.244.0.0/16";
const DEFAULT_SERVICE_CLUSTER_IP_RANGE: &str = "10.0.0.0/16";
const DEFAULT_DNS_DOMAIN: &str = "cluster.local";
const DEFAULT_DNS_REPLICAS: u32 = 1;
const DEFAULT_MASTER_VOLUME_TYPE_AWS: &str = "gp3";
const DEFAULT_MASTER_VOLUME_TYPE_GCE: &str = "pd-ssd";

// Small/medium/large node-count tiers pick a bigger master so etcd keeps up,
// mirroring the original's `getMasterInstanceType` table.
const SMALL_CLUSTER_NODE_COUNT: u32 = 5;
const MEDIUM_CLUSTER_NODE_COUNT: u32 = 50;

/// Fills in every `Option` field `ClusterComposer` needs a concrete value
/// for. Required fields (`cluster_id`, `cloud`, `zone`, the three release
/// artifact paths) are assumed already validated by the caller.
pub fn apply(config: &mut ClusterConfig) {
    config.vpc_cidr.get_or_insert_with(|| DEFAULT_VPC_CIDR.to_string());
    config.subnet_cidr.get_or_insert_with(|| DEFAULT_SUBNET_CIDR.to_string());
    config.cluster_ip_range.get_or_insert_with(|| DEFAULT_CLUSTER_IP_RANGE.to_string());
    config.service_cluster_ip_range.get_or_insert_with(|| DEFAULT_SERVICE_CLUSTER_IP_RANGE.to_string());
    config.dns_domain.get_or_insert_with(|| DEFAULT_DNS_DOMAIN.to_string());
    config.dns_replicas.get_or_insert(DEFAULT_DNS_REPLICAS);
    config.allocate_node_cidrs.get_or_insert(true);

    config.node_count.get_or_insert(2);
    let node_count = config.node_count.unwrap_or(2);

    config.image_id.get_or_insert_with(|| default_image_id(config.cloud));
    config.master_instance_type.get_or_insert_with(|| default_master_instance_type(node_count));
    config.node_instance_type.get_or_insert_with(|| default_node_instance_type(config.cloud));
    config.master_volume_size_gb.get_or_insert(20);
    config.master_volume_type.get_or_insert_with(|| match config.cloud {
        Cloud::Aws => DEFAULT_MASTER_VOLUME_TYPE_AWS.to_string(),
        Cloud::Gce => DEFAULT_MASTER_VOLUME_TYPE_GCE.to_string(),
    });

    let prefix = config.instance_prefix.clone().unwrap_or_else(|| config.cluster_id.as_str().to_string());
    config.instance_prefix.get_or_insert_with(|| prefix.clone());
    config.node_instance_prefix.get_or_insert_with(|| format!("{prefix}-node"));
    config.master_name.get_or_insert_with(|| format!("{prefix}-master"));

    config.enable_cluster_dns.get_or_insert(true);
    config.enable_cluster_logging.get_or_insert(true);
    config.enable_cluster_monitoring.get_or_insert_with(|| "none".to_string());
    config.enable_cluster_ui.get_or_insert(true);
    config.enable_cluster_registry.get_or_insert(false);
    config.admission_control.get_or_insert_with(String::new);
    config.network_provider.get_or_insert_with(|| "kubenet".to_string());
    config.docker_storage.get_or_insert_with(|| "aufs".to_string());

    config.kube_user.get_or_insert_with(|| "admin".to_string());
}

/// Stand-in for the original's provider image registry lookup: a single
/// fixed AMI/image family per cloud rather than a live API query, since
/// resolving the latest published image is explicitly out of scope here.
fn default_image_id(cloud: Cloud) -> String {
    match cloud {
        Cloud::Aws => "ami-0c94855ba95c71c99".to_string(),
        Cloud::Gce => "projects/debian-cloud/global/images/family/debian-12".to_string(),
    }
}

fn default_master_instance_type(node_count: u32) -> String {
    if node_count <= SMALL_CLUSTER_NODE_COUNT {
        "m3.medium".to_string()
    } else if node_count <= MEDIUM_CLUSTER_NODE_COUNT {
        "m3.large".to_string()
    } else {
        "m3.xlarge".to_string()
    }
}

fn default_node_instance_type(cloud: Cloud) -> String {
    match cloud {
        Cloud::Aws => "t3.medium".to_string(),
        Cloud::Gce => "n1-standard-2".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeup_domain::ClusterId;

    fn base(cloud: Cloud) -> ClusterConfig {
        ClusterConfig {
            cluster_id: ClusterId::new("tstc"),
            cloud,
            zone: "us-east-1b".into(),
            server_binary_tar_path: "/tmp/server.tar.gz".into(),
            salt_tar_path: "/tmp/salt.tar.gz".into(),
            bootstrap_script_path: "/tmp/bootstrap.sh".into(),
            vpc_cidr: None,
            subnet_cidr: None,
            cluster_ip_range: None,
            service_cluster_ip_range: None,
            master_ip_range: None,
            master_internal_ip: None,
            allocate_node_cidrs: None,
            dns_domain: None,
            dns_server_ip: None,
            dns_replicas: None,
            image_id: None,
            master_instance_type: None,
            node_instance_type: None,
            node_count: None,
            master_volume_size_gb: None,
            master_volume_type: None,
            instance_prefix: None,
            node_instance_prefix: None,
            master_name: None,
            kube_user: None,
            kube_password: None,
            kubelet_token: None,
            kube_proxy_token: None,
            bearer_token: None,
            ssh_public_key_path: None,
            enable_cluster_dns: None,
            enable_cluster_logging: None,
            enable_cluster_monitoring: None,
            enable_cluster_ui: None,
            enable_cluster_registry: None,
            admission_control: None,
            network_provider: None,
            docker_storage: None,
            master_extra_sans: Vec::new(),
            s3_bucket: None,
            s3_region: None,
            vpc_id: None,
            subnet_id: None,
            internet_gateway_id: None,
            route_table_id: None,
            dhcp_options_id: None,
            master_elastic_ip: None,
            gce_project: None,
            gce_network: None,
        }
    }

    #[test]
    fn picks_bigger_master_for_bigger_clusters() {
        let mut small = base(Cloud::Aws);
        small.node_count = Some(3);
        apply(&mut small);
        assert_eq!(small.master_instance_type.as_deref(), Some("m3.medium"));

        let mut large = base(Cloud::Aws);
        large.node_count = Some(200);
        apply(&mut large);
        assert_eq!(large.master_instance_type.as_deref(), Some("m3.xlarge"));
    }

    #[test]
    fn does_not_override_explicit_values() {
        let mut config = base(Cloud::Aws);
        config.vpc_cidr = Some("10.1.0.0/16".to_string());
        apply(&mut config);
        assert_eq!(config.vpc_cidr.as_deref(), Some("10.1.0.0/16"));
    }

    #[test]
    fn gce_volume_type_differs_from_aws() {
        let mut config = base(Cloud::Gce);
        apply(&mut config);
        assert_eq!(config.master_volume_type.as_deref(), Some("pd-ssd"));
    }

    #[test]
    fn naming_derives_from_cluster_id_when_prefix_unset() {
        let mut config = base(Cloud::Aws);
        apply(&mut config);
        assert_eq!(config.instance_prefix.as_deref(), Some("tstc"));
        assert_eq!(config.node_instance_prefix.as_deref(), Some("tstc-node"));
        assert_eq!(config.master_name.as_deref(), Some("tstc-master"));
    }
}

//! Implementations of the five subcommands (spec §6). Kept as one flat
//! module, section-divided by command, since each is a short, linear
//! pipeline rather than something that benefits from its own file.
//!
//! Every command here is a plain synchronous function taking a
//! `&tokio::runtime::Handle`. `run_tree` drives each Unit's `find`/`render`
//! through `RunCtx::block_on`, and both `FileStore`s' `put` does the same —
//! neither can be called from inside an already-running async task without
//! tokio panicking ("Cannot start a runtime from within a runtime"), so
//! nothing in this module runs as an `async fn` polled by the main runtime.
//! Anything that genuinely needs `.await` (ADC token fetch, SSH subprocess
//! calls) reaches for `rt.block_on` itself, once, from plain sync code.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use kubeup_cloud::{AwsAdapter, AwsCredentials, CloudAdapter, GceAdapter};
use kubeup_domain::{Cloud, ClusterConfig, ClusterId};
use kubeup_graph::{run_tree, validate};
use kubeup_pki::CertificateStore;
use kubeup_resource::{HashAlgorithm, Resource, ResourcePutter};
use kubeup_target::{DryRunTarget, ScriptTarget};
use kubeup_units::{RenderMode, RunCtx, CLUSTER_TAG_KEY};

use crate::cli::{CloudArg, CreateClusterArgs, CreateKubecfgArgs, DeleteClusterArgs, DiscoverClustersArgs, ExportClusterArgs, TargetArg};

const KUBERNETES_YAML: &str = "kubernetes.yaml";
const ELASTIC_IP_SENTINEL_TAG: &str = "kubernetes-master-ip";

/// Bad CLI input rather than a cloud/PKI/script failure — `main` downcasts
/// to this to pick exit code 1 over 2 (spec §6/§7 "Reported, process exits
/// with usage").
#[derive(Debug)]
pub struct UsageError(pub String);

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UsageError {}

/// A [`ResourcePutter`] for `--target dryrun` that never touches real
/// storage — `kubeup-target::DryRunTarget`'s own store is private, so the
/// composer needs a stand-in with the same "never upload, just hash"
/// contract (spec §4.5 DryRunTarget).
struct NoopResourcePutter;

impl ResourcePutter for NoopResourcePutter {
    fn identity(&self) -> usize {
        self as *const Self as usize
    }

    fn put(&self, key: &str, resource: &dyn Resource, hash_algorithm: HashAlgorithm) -> Result<(String, String), kubeup_resource::ResourceError> {
        let hash = kubeup_resource::hash_resource(resource, hash_algorithm)?;
        Ok((format!("dryrun://{key}"), hash))
    }
}

fn region_from_zone(zone: &str) -> String {
    // AWS/GCE availability zones are "<region><letter>" (spec §6 examples
    // use us-east-1b); strip the trailing letter to recover the region.
    zone.trim_end_matches(|c: char| c.is_ascii_alphabetic()).to_string()
}

fn build_cloud_adapter(cloud: Cloud, zone: &str, project: Option<&str>, rt: &tokio::runtime::Handle) -> Result<Arc<dyn CloudAdapter>> {
    let region = region_from_zone(zone);
    match cloud {
        Cloud::Aws => {
            let creds = AwsCredentials::from_env().context("AWS credentials not found in environment")?;
            Ok(Arc::new(AwsAdapter::new(creds, region)))
        }
        Cloud::Gce => {
            let project = project.context("--project is required for --cloud gce")?;
            let adapter = rt
                .block_on(GceAdapter::new(project.to_string(), region, zone.to_string()))
                .context("initializing GCE adapter")?;
            Ok(Arc::new(adapter))
        }
    }
}

fn build_artifact_store(cloud: Cloud, target: TargetArg, config: &ClusterConfig, rt: tokio::runtime::Handle) -> Result<Arc<dyn ResourcePutter>> {
    if matches!(target, TargetArg::Dryrun) {
        return Ok(Arc::new(NoopResourcePutter));
    }
    let prefix = format!("devel/{}/", config.cluster_id.as_str());
    match cloud {
        Cloud::Aws => {
            let creds = AwsCredentials::from_env().context("AWS credentials not found in environment")?;
            let bucket = config.s3_bucket.clone().context("--s3-bucket is required for --cloud aws")?;
            let region = config.s3_region.clone().unwrap_or_else(|| region_from_zone(&config.zone));
            Ok(Arc::new(kubeup_filestore::S3FileStore::new(creds, region, bucket, prefix, rt)))
        }
        Cloud::Gce => {
            let bucket = config.gce_project.clone().context("--project is required for --cloud gce")?;
            let store = rt
                .block_on(kubeup_filestore::GcsFileStore::new(bucket, prefix, rt.clone()))
                .context("initializing GCS artifact store")?;
            Ok(Arc::new(store))
        }
    }
}

// ── create cluster ───────────────────────────────────────────────────────────

pub fn create_cluster(args: CreateClusterArgs, rt: &tokio::runtime::Handle) -> Result<()> {
    std::fs::create_dir_all(&args.dir).with_context(|| format!("creating {}", args.dir.display()))?;

    let config_path = args.dir.join(KUBERNETES_YAML);
    let mut config = load_or_init_config(&config_path, &args)?;
    kubeup_compose::prepare_config(&mut config).context("validating cluster configuration")?;

    let pki = Arc::new(CertificateStore::open(args.dir.join("pki")).context("opening local PKI store")?);
    let artifact_store = build_artifact_store(config.cloud, args.target, &config, rt.clone())?;
    let cloud = build_cloud_adapter(config.cloud, &config.zone, config.gce_project.as_deref(), rt)?;

    let composed = kubeup_compose::compose(&config, pki, artifact_store).context("composing cluster Unit tree")?;
    let mut roots = composed.roots;
    validate(&roots).context("cluster Unit tree failed static validation")?;

    let ctx = RunCtx::new(cloud, rt.clone());

    let changed = match args.target {
        TargetArg::Direct => {
            let mut mode = RenderMode::Live;
            run_tree(&mut roots, &ctx, &mut mode).context("running cluster reconciliation")?
        }
        TargetArg::Bash => {
            let env_vars = vec![
                ("CLUSTER_ID".to_string(), config.cluster_id.as_str().to_string()),
                ("CLOUD_PROVIDER".to_string(), config.cloud.to_string()),
            ];
            let mut script = ScriptTarget::new(&args.dir, env_vars).context("initializing script target")?;
            let mut mode = RenderMode::Script(&mut script);
            let changed = run_tree(&mut roots, &ctx, &mut mode).context("rendering cluster script")?;
            let script_path = args.dir.join("apply.sh");
            script.write_to(&script_path).with_context(|| format!("writing {}", script_path.display()))?;
            println!("wrote {}", script_path.display());
            changed
        }
        TargetArg::Dryrun => {
            let mut dry_run = DryRunTarget::default();
            let mut mode = RenderMode::DryRun(&mut dry_run);
            let changed = run_tree(&mut roots, &ctx, &mut mode).context("computing dry-run report")?;
            println!("{}", dry_run.report());
            changed
        }
    };

    if !matches!(args.target, TargetArg::Dryrun) {
        println!("{changed} unit(s) changed");
    }

    let yaml = serde_yaml::to_string(&config).context("serializing cluster configuration")?;
    std::fs::write(&config_path, yaml).with_context(|| format!("writing {}", config_path.display()))?;

    Ok(())
}

fn load_or_init_config(config_path: &Path, args: &CreateClusterArgs) -> Result<ClusterConfig> {
    let mut config = if config_path.exists() {
        let text = std::fs::read_to_string(config_path).with_context(|| format!("reading {}", config_path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", config_path.display()))?
    } else {
        ClusterConfig {
            cluster_id: ClusterId::new(args.cluster_id.clone()),
            cloud: Cloud::Aws,
            zone: args.zone.clone(),
            server_binary_tar_path: args.release.join("server.tar.gz").display().to_string(),
            salt_tar_path: args.release.join("salt.tar.gz").display().to_string(),
            bootstrap_script_path: args.release.join("bootstrap.sh").display().to_string(),
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
    };

    // Flags always win over whatever was last persisted (spec §6 "merges
    // with flags").
    config.cluster_id = ClusterId::new(args.cluster_id.clone());
    config.cloud = match args.cloud {
        CloudArg::Aws => Cloud::Aws,
        CloudArg::Gce => Cloud::Gce,
    };
    config.zone = args.zone.clone();
    config.ssh_public_key_path = Some(args.ssh_public_key.display().to_string());
    if let Some(bucket) = &args.s3_bucket {
        config.s3_bucket = Some(bucket.clone());
    }
    if let Some(region) = &args.s3_region {
        config.s3_region = Some(region.clone());
    }
    if let Some(project) = &args.project {
        config.gce_project = Some(project.clone());
    }

    Ok(config)
}

// ── delete cluster ───────────────────────────────────────────────────────────

const DELETE_RETRY_PASSES: u32 = 10;
const DELETE_RETRY_INTERVAL: Duration = Duration::from_secs(10);

pub fn delete_cluster(args: DeleteClusterArgs, rt: &tokio::runtime::Handle) -> Result<()> {
    if !args.yes {
        return Err(UsageError(format!("refusing to delete cluster {:?} without --yes", args.cluster_id)).into());
    }

    let mut stub = ClusterConfig {
        cluster_id: ClusterId::new(args.cluster_id.clone()),
        cloud: match args.cloud {
            CloudArg::Aws => Cloud::Aws,
            CloudArg::Gce => Cloud::Gce,
        },
        zone: args.zone.clone(),
        server_binary_tar_path: String::new(),
        salt_tar_path: String::new(),
        bootstrap_script_path: String::new(),
        gce_project: args.project.clone(),
        ..empty_config()
    };
    kubeup_compose::prepare_config(&mut stub).context("deriving default cluster naming")?;

    let cloud = build_cloud_adapter(stub.cloud, &stub.zone, stub.gce_project.as_deref(), rt)?;
    let cluster_id = stub.cluster_id.as_str().to_string();
    let prefix = stub.instance_prefix.clone().unwrap_or_else(|| cluster_id.clone());

    rt.block_on(async move {
        for pass in 1..=DELETE_RETRY_PASSES {
            let found = discover_tagged_resources(cloud.as_ref(), &cluster_id, &prefix, &stub).await?;
            if found.is_empty() {
                println!("cluster {cluster_id:?} has no remaining tagged resources");
                return Ok(());
            }
            println!("pass {pass}/{DELETE_RETRY_PASSES}: deleting {} resource(s)", found.len());
            for (kind, id) in &found {
                if let Err(err) = cloud.delete_resource(kind, id).await {
                    tracing::warn!(kind, id, error = %err, "delete_resource failed, will retry next pass");
                }
            }
            if pass < DELETE_RETRY_PASSES {
                tokio::time::sleep(DELETE_RETRY_INTERVAL).await;
            }
        }

        bail!("cluster {cluster_id:?} still has tagged resources after {DELETE_RETRY_PASSES} passes")
    })
}

fn empty_config() -> ClusterConfig {
    ClusterConfig {
        cluster_id: ClusterId::new(""),
        cloud: Cloud::Aws,
        zone: String::new(),
        server_binary_tar_path: String::new(),
        salt_tar_path: String::new(),
        bootstrap_script_path: String::new(),
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

/// Everything `delete_resource` can remove for one cluster: resources found
/// by the cluster tag directly, plus the handful keyed by a deterministic
/// name instead (security groups, IAM roles/profiles, launch
/// configuration/autoscaling group) derived the same way `compose` derives
/// them. SSH keys are not included — the key's provider name is the MD5 of
/// its public key material, which delete has no way to recover without the
/// original key file.
async fn discover_tagged_resources(
    cloud: &dyn CloudAdapter,
    cluster_id: &str,
    prefix: &str,
    stub: &ClusterConfig,
) -> Result<Vec<(&'static str, String)>> {
    let mut found = Vec::new();
    let is_aws = matches!(stub.cloud, Cloud::Aws);

    if let Some(instance) = cloud.find_instance_by_tag(CLUSTER_TAG_KEY, cluster_id).await? {
        found.push(("Instance", instance.id));
    }
    if let Some(volume) = cloud.find_volume_by_tag(CLUSTER_TAG_KEY, cluster_id).await? {
        if is_aws {
            if let Some(eip) = kubeup_cloud::find_elastic_ip_via_sentinel(cloud, &volume.id, ELASTIC_IP_SENTINEL_TAG).await? {
                found.push(("ElasticIp", eip.allocation_id));
            }
        }
        found.push(("PersistentVolume", volume.id));
    }
    if let Some(node_asg) = cloud.find_autoscaling_group(&format!("{prefix}-node")).await? {
        found.push(("AutoscalingGroup", node_asg.name));
    }
    if let Some(node_lc) = cloud.find_launch_configuration(&format!("{prefix}-node")).await? {
        found.push(("LaunchConfiguration", node_lc.name));
    }
    if let Some(vpc) = cloud.find_vpc_by_tag(CLUSTER_TAG_KEY, cluster_id).await? {
        if let Some(sg) = cloud.find_security_group_by_name(&vpc.id, &format!("{prefix}-node")).await? {
            found.push(("SecurityGroup", sg.id));
        }
        if let Some(sg) = cloud.find_security_group_by_name(&vpc.id, &format!("{prefix}-master")).await? {
            found.push(("SecurityGroup", sg.id));
        }
        if let Some(subnet) = cloud.find_subnet_by_tag(CLUSTER_TAG_KEY, cluster_id).await? {
            found.push(("Subnet", subnet.id));
        }
        if is_aws {
            if let Some(route_table) = cloud.find_route_table_by_tag(CLUSTER_TAG_KEY, cluster_id).await? {
                found.push(("RouteTable", route_table.id));
            }
            if let Some(igw) = cloud.find_internet_gateway_by_tag(CLUSTER_TAG_KEY, cluster_id).await? {
                found.push(("InternetGateway", igw.id));
            }
            if let Some(dhcp) = cloud.find_dhcp_options_by_tag(CLUSTER_TAG_KEY, cluster_id).await? {
                found.push(("DhcpOptions", dhcp.id));
            }
        }
        found.push(("Vpc", vpc.id));
    }
    if let Some(role) = cloud.find_iam_role(&format!("{prefix}-node")).await? {
        found.push(("IamRole", role.name));
    }
    if let Some(role) = cloud.find_iam_role(&format!("{prefix}-master")).await? {
        found.push(("IamRole", role.name));
    }
    if let Some(profile) = cloud.find_instance_profile(&format!("{prefix}-node")).await? {
        found.push(("InstanceProfile", profile.name));
    }
    if let Some(profile) = cloud.find_instance_profile(&format!("{prefix}-master")).await? {
        found.push(("InstanceProfile", profile.name));
    }

    Ok(found)
}

// ── discover clusters ────────────────────────────────────────────────────────

pub fn discover_clusters(args: DiscoverClustersArgs, rt: &tokio::runtime::Handle) -> Result<()> {
    let cloud = build_cloud_adapter(
        match args.cloud {
            CloudArg::Aws => Cloud::Aws,
            CloudArg::Gce => Cloud::Gce,
        },
        &args.region,
        args.project.as_deref(),
        rt,
    )?;

    let ids: Vec<String> = match &args.cluster_id {
        Some(id) => vec![id.clone()],
        None => return Err(UsageError("discover clusters currently requires a cluster id positional argument".to_string()).into()),
    };
    let region = args.region.clone();

    rt.block_on(async move {
        for id in ids {
            let Some(instance) = cloud.find_instance_by_tag(CLUSTER_TAG_KEY, &id).await? else {
                continue;
            };
            let master_ip = instance.public_ip.or(instance.private_ip).unwrap_or_default();
            println!("{}", crate::output::render_cluster_row(&id, &master_ip, &region));
        }
        Ok(())
    })
}

// ── export cluster / create kubecfg ─────────────────────────────────────────

pub fn export_cluster(args: ExportClusterArgs, rt: &tokio::runtime::Handle) -> Result<()> {
    std::fs::create_dir_all(&args.dest).with_context(|| format!("creating {}", args.dest.display()))?;

    let kube_env = rt.block_on(ssh::read_remote_file(&args.master, &args.ssh_private_key, "/etc/kubernetes/kube_env.yaml"))?;
    let settings: serde_yaml::Value = serde_yaml::from_str(&kube_env).context("parsing /etc/kubernetes/kube_env.yaml")?;

    let cluster_id = settings
        .get("CLUSTER_ID")
        .and_then(|v| v.as_str())
        .context("kube_env.yaml missing CLUSTER_ID")?
        .to_string();
    let zone = settings.get("ZONE").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let cloud = match settings.get("CLOUD_PROVIDER").and_then(|v| v.as_str()) {
        Some("gce") => Cloud::Gce,
        _ => Cloud::Aws,
    };

    let config = ClusterConfig {
        cluster_id: ClusterId::new(cluster_id),
        cloud,
        zone,
        server_binary_tar_path: String::new(),
        salt_tar_path: String::new(),
        bootstrap_script_path: String::new(),
        dns_domain: settings.get("DNS_DOMAIN").and_then(|v| v.as_str()).map(str::to_string),
        ..empty_config()
    };

    let yaml = serde_yaml::to_string(&config).context("serializing extracted cluster configuration")?;
    let dest_path = args.dest.join(KUBERNETES_YAML);
    std::fs::write(&dest_path, yaml).with_context(|| format!("writing {}", dest_path.display()))?;

    let pki = args.dest.join("pki");
    std::fs::create_dir_all(pki.join("private")).context("creating pki/private")?;
    std::fs::create_dir_all(pki.join("issued")).context("creating pki/issued")?;
    for (remote_path, local_name, subdir) in [
        ("/srv/kubernetes/ca.crt", "ca.crt", ""),
        ("/srv/kubernetes/ca.key", "ca.key", "private"),
    ] {
        let contents = rt.block_on(ssh::read_remote_file(&args.master, &args.ssh_private_key, remote_path))?;
        let local_path = if subdir.is_empty() { pki.join(local_name) } else { pki.join(subdir).join(local_name) };
        std::fs::write(&local_path, contents).with_context(|| format!("writing {}", local_path.display()))?;
    }

    println!("wrote {}", dest_path.display());
    Ok(())
}

pub fn create_kubecfg(args: CreateKubecfgArgs, rt: &tokio::runtime::Handle) -> Result<()> {
    let (ca_cert, client_cert, client_key, kube_env) = rt.block_on(async {
        let ca_cert = ssh::read_remote_file(&args.master, &args.ssh_private_key, "/srv/kubernetes/ca.crt").await?;
        let client_cert = ssh::read_remote_file(&args.master, &args.ssh_private_key, "/srv/kubernetes/kubecfg.crt").await?;
        let client_key = ssh::read_remote_file(&args.master, &args.ssh_private_key, "/srv/kubernetes/kubecfg.key").await?;
        let kube_env = ssh::read_remote_file(&args.master, &args.ssh_private_key, "/etc/kubernetes/kube_env.yaml").await?;
        Ok::<_, anyhow::Error>((ca_cert, client_cert, client_key, kube_env))
    })?;

    let settings: serde_yaml::Value = serde_yaml::from_str(&kube_env).context("parsing /etc/kubernetes/kube_env.yaml")?;
    let instance_prefix = settings
        .get("INSTANCE_PREFIX")
        .and_then(|v| v.as_str())
        .unwrap_or("kubernetes");
    let context_name = format!("aws_{instance_prefix}");

    let kubeconfig = render_kubeconfig(&context_name, &args.master, &ca_cert, &client_cert, &client_key);

    let home = std::env::var("HOME").context("HOME is not set")?;
    let kube_dir = PathBuf::from(home).join(".kube");
    std::fs::create_dir_all(&kube_dir).with_context(|| format!("creating {}", kube_dir.display()))?;
    let path = kube_dir.join("config");
    std::fs::write(&path, kubeconfig).with_context(|| format!("writing {}", path.display()))?;

    println!("wrote {}", path.display());
    Ok(())
}

fn render_kubeconfig(context_name: &str, master: &str, ca_cert: &str, client_cert: &str, client_key: &str) -> String {
    use base64::Engine;
    let b64 = |s: &str| base64::engine::general_purpose::STANDARD.encode(s.as_bytes());
    format!(
        "apiVersion: v1\n\
kind: Config\n\
clusters:\n\
- name: {context_name}\n  \
cluster:\n    \
server: https://{master}\n    \
certificate-authority-data: {ca}\n\
users:\n\
- name: {context_name}\n  \
user:\n    \
client-certificate-data: {cert}\n    \
client-key-data: {key}\n\
contexts:\n\
- name: {context_name}\n  \
context:\n    \
cluster: {context_name}\n    \
user: {context_name}\n\
current-context: {context_name}\n",
        ca = b64(ca_cert),
        cert = b64(client_cert),
        key = b64(client_key),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CloudArg, TargetArg};

    fn args(cluster_id: &str, zone: &str, release: PathBuf) -> CreateClusterArgs {
        CreateClusterArgs {
            cloud: CloudArg::Aws,
            dir: PathBuf::from("unused"),
            release,
            cluster_id: cluster_id.to_string(),
            zone: zone.to_string(),
            ssh_public_key: PathBuf::from("id_rsa.pub"),
            s3_bucket: None,
            s3_region: None,
            project: None,
            target: TargetArg::Direct,
        }
    }

    #[test]
    fn region_from_zone_strips_trailing_letter() {
        assert_eq!(region_from_zone("us-east-1b"), "us-east-1");
        assert_eq!(region_from_zone("europe-west1-c"), "europe-west1-");
    }

    #[test]
    fn load_or_init_config_fills_release_paths_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(KUBERNETES_YAML);
        let release = dir.path().join("release");

        let config = load_or_init_config(&config_path, &args("kubernetes", "us-east-1b", release.clone())).unwrap();

        assert_eq!(config.cluster_id.as_str(), "kubernetes");
        assert_eq!(config.zone, "us-east-1b");
        assert_eq!(config.server_binary_tar_path, release.join("server.tar.gz").display().to_string());
    }

    #[test]
    fn load_or_init_config_merges_flags_over_a_persisted_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(KUBERNETES_YAML);
        let release = dir.path().join("release");

        let mut first = load_or_init_config(&config_path, &args("kubernetes", "us-east-1b", release.clone())).unwrap();
        first.node_count = Some(4);
        std::fs::write(&config_path, serde_yaml::to_string(&first).unwrap()).unwrap();

        let second = load_or_init_config(&config_path, &args("kubernetes", "us-east-1c", release)).unwrap();

        assert_eq!(second.zone, "us-east-1c", "flags must override the persisted zone");
        assert_eq!(second.node_count, Some(4), "fields the flags don't touch must survive the merge");
    }

    #[test]
    fn usage_error_exit_classification_round_trips_through_anyhow() {
        let err: anyhow::Error = UsageError("refusing to delete without --yes".to_string()).into();
        assert!(err.chain().any(|cause| cause.downcast_ref::<UsageError>().is_some()));
    }

    #[test]
    fn render_kubeconfig_base64_encodes_cert_material_exactly_once() {
        use base64::Engine;
        let kubeconfig = render_kubeconfig("aws_kubernetes", "203.0.113.9", "ca-bytes", "cert-bytes", "key-bytes");
        let expected = base64::engine::general_purpose::STANDARD.encode(b"ca-bytes");
        assert!(kubeconfig.contains(&expected));
        assert!(kubeconfig.contains("server: https://203.0.113.9"));
        assert!(kubeconfig.contains("current-context: aws_kubernetes"));
    }
}

mod ssh {
    use anyhow::{Context, Result};
    use std::path::Path;
    use tokio::process::Command;

    /// Reads one remote file over SSH (spec §6 export/kubecfg): spawn,
    /// capture combined output, surface a non-zero exit as an error rather
    /// than silently returning empty output.
    pub async fn read_remote_file(host: &str, identity: &Path, remote_path: &str) -> Result<String> {
        let output = Command::new("ssh")
            .arg("-i")
            .arg(identity)
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg(host)
            .arg(format!("sudo cat {remote_path}"))
            .output()
            .await
            .with_context(|| format!("spawning ssh to {host}"))?;

        if !output.status.success() {
            anyhow::bail!(
                "ssh {host} cat {remote_path} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

//! Bootstrap artifact assembly (spec §4.11): splices the AWS-specific
//! override block into the provider-neutral template, gzips oversized
//! user-data, and renders the bootstrap environment YAML consumed by
//! `/etc/kubernetes/kube_env.yaml` on the node.

use std::collections::HashMap;
use std::io::Write;

use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use kubeup_domain::{BootstrapEnv, ClusterConfig};
use kubeup_units::CertBundle;

use crate::error::ComposeError;

/// The only accepted splice marker (spec §9 resolves the two-spelling Open
/// Question in favor of the namespaced form).
pub const AWS_OVERRIDES_MARKER: &str = "#+AWS_OVERRIDES_HERE";

/// The rejected, unnamespaced spelling some source drafts used instead.
const WRONG_SPELLING_NEEDLE: &str = "AWS_OVERRIDE_HERE";

/// User-data over this size is gzipped before being handed to the
/// `CloudAdapter` (spec §4.11).
const GZIP_THRESHOLD_BYTES: usize = 16 * 1024;

/// Replaces the single `#+AWS_OVERRIDES_HERE` line in `template` with
/// `overrides` concatenated with `disk_format` (spec S6). Zero or multiple
/// marker lines is an error; a line containing the unnamespaced spelling
/// instead of the real marker is reported rather than silently accepted.
pub fn splice_aws_bootstrap(template: &str, overrides: &str, disk_format: &str) -> Result<String, ComposeError> {
    let lines: Vec<&str> = template.lines().collect();
    let marker_lines: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim() == AWS_OVERRIDES_MARKER)
        .map(|(i, _)| i)
        .collect();

    match marker_lines.len() {
        0 => {
            if let Some(line) = lines.iter().find(|l| l.contains(WRONG_SPELLING_NEEDLE)) {
                return Err(ComposeError::WrongMarkerSpelling {
                    found: line.trim().to_string(),
                    expected: AWS_OVERRIDES_MARKER,
                });
            }
            Err(ComposeError::MissingMarker { marker: AWS_OVERRIDES_MARKER })
        }
        1 => {
            let idx = marker_lines[0];
            let mut out = String::new();
            for line in &lines[..idx] {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(overrides);
            out.push_str(disk_format);
            for line in &lines[idx + 1..] {
                out.push_str(line);
                out.push('\n');
            }
            Ok(out)
        }
        n => Err(ComposeError::DuplicateMarker { marker: AWS_OVERRIDES_MARKER, count: n }),
    }
}

/// Gzips `data` when it exceeds [`GZIP_THRESHOLD_BYTES`]; the `CloudAdapter`
/// is responsible for base64-encoding whatever bytes it's handed, so this
/// only ever needs to compress, never encode.
pub fn prepare_user_data(data: Vec<u8>) -> Result<Vec<u8>, ComposeError> {
    if data.len() <= GZIP_THRESHOLD_BYTES {
        return Ok(data);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&data).map_err(|e| ComposeError::InvalidConfig(format!("gzip user-data: {e}")))?;
    encoder.finish().map_err(|e| ComposeError::InvalidConfig(format!("gzip user-data: {e}")))
}

fn b64(pem: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(pem.as_bytes())
}

fn put(env: &mut BootstrapEnv, key: &str, value: impl Into<String>) {
    env.insert(key.to_string(), value.into());
}

/// Flattens the `ClusterConfig`, the issued certificate bundle, and the
/// resolved release-artifact URLs/hashes into the upper-snake-case
/// string→string mapping the bootstrap script reads as YAML (spec §4.11).
/// `is_master` selects which master-only fields are populated; node-only
/// fields outside this pass (e.g. which master to register with) are left
/// to the per-node launch configuration user-data's own overlay, not
/// duplicated here.
#[allow(clippy::too_many_arguments)]
pub fn build_bootstrap_env(
    config: &ClusterConfig,
    bundle: &CertBundle,
    server_binary_url: &str,
    server_binary_hash: &str,
    salt_tar_url: &str,
    salt_tar_hash: &str,
    is_master: bool,
) -> BootstrapEnv {
    let mut env: BootstrapEnv = HashMap::new();

    put(&mut env, "CLUSTER_ID", config.cluster_id.as_str().to_string());
    put(&mut env, "ZONE", &config.zone);
    put(&mut env, "CLOUD_PROVIDER", config.cloud.to_string());
    put(&mut env, "DNS_DOMAIN", config.dns_domain.clone().unwrap_or_default());
    put(&mut env, "DNS_REPLICAS", config.dns_replicas.unwrap_or_default().to_string());
    put(&mut env, "CLUSTER_IP_RANGE", config.cluster_ip_range.clone().unwrap_or_default());
    put(&mut env, "SERVICE_CLUSTER_IP_RANGE", config.service_cluster_ip_range.clone().unwrap_or_default());
    put(&mut env, "ALLOCATE_NODE_CIDRS", config.allocate_node_cidrs.unwrap_or_default().to_string());
    put(&mut env, "ENABLE_CLUSTER_DNS", config.enable_cluster_dns.unwrap_or_default().to_string());
    put(&mut env, "ENABLE_CLUSTER_LOGGING", config.enable_cluster_logging.unwrap_or_default().to_string());
    put(&mut env, "ENABLE_CLUSTER_MONITORING", config.enable_cluster_monitoring.clone().unwrap_or_default());
    put(&mut env, "ENABLE_CLUSTER_UI", config.enable_cluster_ui.unwrap_or_default().to_string());
    put(&mut env, "ENABLE_CLUSTER_REGISTRY", config.enable_cluster_registry.unwrap_or_default().to_string());
    put(&mut env, "ADMISSION_CONTROL", config.admission_control.clone().unwrap_or_default());
    put(&mut env, "NETWORK_PROVIDER", config.network_provider.clone().unwrap_or_default());
    put(&mut env, "DOCKER_STORAGE", config.docker_storage.clone().unwrap_or_default());

    put(&mut env, "KUBE_USER", config.kube_user.clone().unwrap_or_default());
    put(&mut env, "KUBE_PASSWORD", config.kube_password.clone().unwrap_or_default());
    put(&mut env, "KUBELET_TOKEN", config.kubelet_token.clone().unwrap_or_default());
    put(&mut env, "KUBE_PROXY_TOKEN", config.kube_proxy_token.clone().unwrap_or_default());
    put(&mut env, "BEARER_TOKEN", config.bearer_token.clone().unwrap_or_default());

    put(&mut env, "CA_CERT", b64(&bundle.ca_cert_pem));
    put(&mut env, "KUBELET_CERT", b64(&bundle.kubelet_cert_pem));
    put(&mut env, "KUBELET_KEY", b64(&bundle.kubelet_key_pem));
    put(&mut env, "KUBE_PROXY_CERT", b64(&bundle.kube_proxy_cert_pem));
    put(&mut env, "KUBE_PROXY_KEY", b64(&bundle.kube_proxy_key_pem));

    if is_master {
        put(&mut env, "MASTER_CERT", b64(&bundle.master_cert_pem));
        put(&mut env, "MASTER_KEY", b64(&bundle.master_key_pem));
        put(&mut env, "KUBECFG_CERT", b64(&bundle.kubecfg_cert_pem));
        put(&mut env, "KUBECFG_KEY", b64(&bundle.kubecfg_key_pem));
        put(&mut env, "MASTER_INTERNAL_IP", config.master_internal_ip.clone().unwrap_or_default());
    }

    put(&mut env, "SERVER_BINARY_TAR_URL", server_binary_url.to_string());
    put(&mut env, "SERVER_BINARY_TAR_HASH", server_binary_hash.to_string());
    put(&mut env, "SALT_TAR_URL", salt_tar_url.to_string());
    put(&mut env, "SALT_TAR_HASH", salt_tar_hash.to_string());

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splices_overrides_and_disk_format_at_the_marker_line() {
        let template = "line one\n#+AWS_OVERRIDES_HERE\nline three\n";
        let out = splice_aws_bootstrap(template, "override-A\n", "disk-format-B\n").unwrap();
        assert_eq!(out, "line one\noverride-A\ndisk-format-B\nline three\n");
    }

    #[test]
    fn zero_markers_is_an_error() {
        let err = splice_aws_bootstrap("no marker here\n", "A", "B").unwrap_err();
        assert!(matches!(err, ComposeError::MissingMarker { .. }));
    }

    #[test]
    fn two_markers_is_an_error() {
        let template = "#+AWS_OVERRIDES_HERE\nmid\n#+AWS_OVERRIDES_HERE\n";
        let err = splice_aws_bootstrap(template, "A", "B").unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateMarker { count: 2, .. }));
    }

    #[test]
    fn the_unnamespaced_spelling_is_rejected_not_accepted() {
        let template = "before\nAWS_OVERRIDE_HERE\nafter\n";
        let err = splice_aws_bootstrap(template, "A", "B").unwrap_err();
        assert!(matches!(err, ComposeError::WrongMarkerSpelling { .. }));
    }

    #[test]
    fn small_user_data_is_left_uncompressed() {
        let data = vec![0u8; 100];
        assert_eq!(prepare_user_data(data.clone()).unwrap(), data);
    }

    #[test]
    fn oversized_user_data_is_gzipped() {
        let data = vec![7u8; GZIP_THRESHOLD_BYTES + 1];
        let gzipped = prepare_user_data(data).unwrap();
        assert_eq!(&gzipped[0..2], &[0x1f, 0x8b]);
    }
}

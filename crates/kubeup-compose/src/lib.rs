//! Turns a [`kubeup_domain::ClusterConfig`] into the full Unit tree
//! `kubeup-graph` walks (spec §4.9 ClusterComposer).
//!
//! This is the one crate that knows the concrete shape of a Kubernetes
//! cluster on AWS or GCE: which Units exist, in what order, and how they
//! reference each other by key. Everything it builds on top of —
//! defaulting, credential generation, the well-known service IP, bootstrap
//! artifact assembly — is exposed as its own module so the composer itself
//! stays a single, readable function.

mod bootstrap;
mod credentials;
mod defaults;
mod error;
mod service_ip;
mod tree;

pub use bootstrap::{build_bootstrap_env, prepare_user_data, splice_aws_bootstrap, AWS_OVERRIDES_MARKER};
pub use credentials::{admin_password, bearer_token, kube_proxy_token, kubelet_token, random_token, ssh_key_name};
pub use error::ComposeError;
pub use service_ip::{nth_address, well_known_service_ip, WELL_KNOWN_SERVICE_OFFSET};
pub use tree::{compose, ComposedCluster};

/// Fills in every unset `ClusterConfig` field with a provider-aware default
/// and runs [`kubeup_domain::ClusterConfig::validate`]. Call this before
/// [`compose`] — `compose` itself assumes a fully-populated config.
pub fn prepare_config(config: &mut kubeup_domain::ClusterConfig) -> Result<(), ComposeError> {
    defaults::apply(config);
    config.validate()?;
    Ok(())
}

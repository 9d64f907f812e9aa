pub mod error;
pub mod types;

pub use error::DomainError;
pub use types::{BootstrapEnv, Cloud, ClusterConfig, ClusterId, TargetKind};

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> ClusterConfig {
        serde_yaml::from_str(
            r#"
cluster_id: tstc
cloud: aws
zone: us-east-1b
server_binary_tar_path: /tmp/server.tar.gz
salt_tar_path: /tmp/salt.tar.gz
bootstrap_script_path: /tmp/bootstrap.sh
"#,
        )
        .unwrap()
    }

    #[test]
    fn parses_minimal_config() {
        let c = minimal_config();
        assert_eq!(c.cluster_id.as_str(), "tstc");
        assert_eq!(c.cloud, Cloud::Aws);
        c.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = serde_yaml::from_str::<ClusterConfig>(
            r#"
cluster_id: tstc
cloud: aws
zone: us-east-1b
server_binary_tar_path: /tmp/server.tar.gz
salt_tar_path: /tmp/salt.tar.gz
bootstrap_script_path: /tmp/bootstrap.sh
totally_unknown_key: 1
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_missing_cluster_id() {
        let mut c = minimal_config();
        c.cluster_id = ClusterId::new("");
        assert!(c.validate().is_err());
    }

    #[test]
    fn gce_requires_project() {
        let mut c = minimal_config();
        c.cloud = Cloud::Gce;
        assert!(c.validate().is_err());
        c.gce_project = Some("my-project".into());
        assert!(c.validate().is_ok());
    }
}

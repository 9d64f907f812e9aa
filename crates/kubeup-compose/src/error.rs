use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Domain(#[from] kubeup_domain::DomainError),

    #[error("resource error: {0}")]
    Resource(#[from] kubeup_resource::ResourceError),

    #[error("pki error: {0}")]
    Pki(#[from] kubeup_pki::PkiError),

    #[error("bootstrap script is missing the override marker {marker:?}")]
    MissingMarker { marker: &'static str },

    #[error("bootstrap script has {count} occurrences of marker {marker:?}, expected exactly one")]
    DuplicateMarker { marker: &'static str, count: usize },

    #[error("bootstrap script contains {found:?}, did you mean {expected:?}?")]
    WrongMarkerSpelling { found: String, expected: &'static str },

    #[error("service IP offset {offset} does not fit in cluster_ip_range {cidr}")]
    ServiceIpOutOfRange { cidr: String, offset: u128 },

    #[error("invalid CIDR {0:?}: {1}")]
    InvalidCidr(String, String),
}

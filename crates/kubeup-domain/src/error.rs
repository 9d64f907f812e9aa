use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown cloud provider: {0}")]
    UnknownCloud(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

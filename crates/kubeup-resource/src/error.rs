use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("error opening resource {path:?}: {source}")]
    Open {
        path: Option<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading resource: {0}")]
    Read(#[source] std::io::Error),

    #[error("error computing resource: {0}")]
    Compute(String),
}

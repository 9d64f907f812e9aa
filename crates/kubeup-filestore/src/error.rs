use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("resource error: {0}")]
    Resource(#[from] kubeup_resource::ResourceError),

    #[error("cloud error: {0}")]
    Cloud(#[from] kubeup_cloud::CloudError),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },
}

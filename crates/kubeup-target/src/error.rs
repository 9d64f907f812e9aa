use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("cloud error: {0}")]
    Cloud(#[from] kubeup_cloud::CloudError),

    #[error("resource error: {0}")]
    Resource(#[from] kubeup_resource::ResourceError),

    #[error("write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("instance {instance_id} did not reach state 'running' after {attempts} attempts")]
    InstanceNotRunning { instance_id: String, attempts: u32 },
}

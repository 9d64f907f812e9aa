use thiserror::Error;

/// Cloud I/O error (spec §7): wraps the failing operation and resource so
/// the caller can report context without re-deriving it from the HTTP
/// transport error.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("{operation} on {resource}: request failed: {source}")]
    Transport {
        operation: String,
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} on {resource}: cloud API error ({code}): {message}")]
    Api {
        operation: String,
        resource: String,
        code: String,
        message: String,
    },

    #[error("{operation} on {resource}: could not parse response: {message}")]
    Parse {
        operation: String,
        resource: String,
        message: String,
    },

    #[error("credential error: {0}")]
    Credentials(String),

    #[error("timed out waiting for {resource} to reach state {expected}; last observed {last_observed}")]
    Timeout {
        resource: String,
        expected: String,
        last_observed: String,
    },
}

impl CloudError {
    /// `Not-found (benign)` (spec §7): a missing resource is "no actual",
    /// not an error, so callers should translate the provider's not-found
    /// response into `Ok(None)` rather than this variant. This helper names
    /// the provider-specific not-found codes callers compare against.
    pub fn is_not_found(code: &str) -> bool {
        matches!(
            code,
            "InvalidVpcID.NotFound"
                | "InvalidSubnetID.NotFound"
                | "InvalidGroup.NotFound"
                | "InvalidInternetGatewayID.NotFound"
                | "InvalidRouteTableID.NotFound"
                | "InvalidAddress.NotFound"
                | "InvalidInstanceID.NotFound"
                | "InvalidVolume.NotFound"
                | "InvalidKeyPair.NotFound"
                | "NoSuchEntity"
                | "NoSuchBucket"
                | "NoSuchKey"
                | "notFound"
        )
    }
}

use thiserror::Error;

/// Errors surfaced out of a single Unit's find/check/render step (spec §7).
#[derive(Debug, Error)]
pub enum UnitsError {
    #[error("cloud error: {0}")]
    Cloud(#[from] kubeup_cloud::CloudError),

    #[error("resource error: {0}")]
    Resource(#[from] kubeup_resource::ResourceError),

    #[error("pki error: {0}")]
    Pki(#[from] kubeup_pki::PkiError),

    #[error("{unit} is missing required field {field}")]
    MissingRequiredField { unit: String, field: String },

    #[error("{unit} field {field} is immutable: actual {actual:?}, desired {desired:?}")]
    ImmutableFieldChanged {
        unit: String,
        field: String,
        actual: String,
        desired: String,
    },

    #[error("render dispatch ambiguous for unit {unit}: {message}")]
    AmbiguousRender { unit: String, message: String },
}

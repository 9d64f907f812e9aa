use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unit type '{unit_type}' key '{key}' is declared more than once in the tree")]
    DuplicateUnit { unit_type: String, key: String },

    #[error("unit '{unit}' depends on '{depends_on}' which does not appear anywhere in the tree")]
    DanglingDependency { unit: String, depends_on: String },

    #[error("unit '{unit}' depends on '{depends_on}', which does not precede it in pre-order")]
    DependencyNotYetRun { unit: String, depends_on: String },

    #[error("cycle detected among unit dependencies")]
    CycleDetected,

    #[error(transparent)]
    Unit(#[from] kubeup_units::UnitsError),

    #[error("multiple errors")]
    Multiple(Vec<GraphError>),
}

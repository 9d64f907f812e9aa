use thiserror::Error;

#[derive(Debug, Error)]
pub enum PkiError {
    #[error("error creating PKI directory {path}: {source}")]
    Mkdir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error generating RSA key: {0}")]
    KeyGen(String),

    #[error("error parsing certificate: {0}")]
    ParseCert(String),

    #[error("error parsing private key: {0}")]
    ParseKey(String),

    #[error("error signing certificate: {0}")]
    Sign(String),

    #[error("certificate not found for subject {0}")]
    CertNotFound(String),

    #[error("private key not found for subject {0}")]
    KeyNotFound(String),
}

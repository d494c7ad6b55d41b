use thiserror::Error;

/// Errors surfaced by capture backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend not ready. Call launch() first.")]
    NotReady,

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection to the page lost")]
    ConnectionLost,

    #[error("Not supported by this backend: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}

/// Errors from the recording-state store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

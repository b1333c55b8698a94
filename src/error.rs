use thiserror::Error;

/// Errors produced by the model and data modules.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid layer or model configuration, caught at build time.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed or unusable input data (CSV, vocabulary).
    #[error("invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("artifact serialization failed: {0}")]
    Artifact(#[from] bincode::Error),

    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Failures crossing a collaborator boundary.
#[derive(Debug, Error, Clone)]
pub enum BridgeError {
    #[error("bridge call failed: {0}")]
    Call(String),

    #[error("model call failed: {0}")]
    Model(String),

    #[error("platform service failed: {0}")]
    Platform(String),

    #[error("credentials for '{0}' not found")]
    MissingCredentials(String),

    #[error("storage failed: {0}")]
    Storage(String),

    #[error("definition '{0}' not found")]
    DefinitionNotFound(String),
}

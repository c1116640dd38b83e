use thiserror::Error;

/// Failures building or sending a declarative HTTP call.
#[derive(Debug, Error, Clone)]
pub enum HttpFlowError {
    #[error("client '{client}' has no capability '{name}'")]
    UnknownCapability { client: String, name: String },

    #[error("capability '{capability}' is missing required parameter '{name}'")]
    MissingParameter { capability: String, name: String },

    #[error("credential field '{0}' is not available")]
    MissingCredential(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),
}

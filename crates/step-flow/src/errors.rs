//! Interpreter error taxonomy.
//!
//! These are the "thrown" tier: broken definitions and collaborator
//! failures. They propagate up through step execution and are caught once
//! at the top of `execute_capability`, where they become a structured
//! failure for the caller.

use agentry_bridge::BridgeError;
use thiserror::Error;
use value_engine::ValueError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("capability '{0}' not found")]
    UnknownCapability(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("forEach source '{var}' is not an array")]
    ForEachSource { var: String },

    #[error("operation batch '{var}' is not an array")]
    BatchSource { var: String },

    #[error("malformed operation in unchecked batch: {0}")]
    MalformedOperation(String),

    #[error("raw script execution is disabled by policy")]
    RawScriptDisabled,

    #[error("waitFor '{selector}' timed out after {timeout_ms}ms")]
    WaitForTimeout { selector: String, timeout_ms: u64 },

    #[error("unknown process '{0}'")]
    UnknownProcess(String),

    #[error("process '{0}' already exists")]
    ProcessExists(String),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("bridge call failed: {0}")]
    Bridge(String),
}

impl From<BridgeError> for FlowError {
    fn from(err: BridgeError) -> Self {
        FlowError::Bridge(err.to_string())
    }
}

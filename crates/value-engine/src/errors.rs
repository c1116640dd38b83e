use thiserror::Error;

/// Failures from the value layer.
///
/// Only parse transforms can fail; resolution and conditions are total.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("parse failed: {0}")]
    Parse(String),
}

use agentry_core_types::DefinitionError;
use thiserror::Error;

/// Registration and persistence failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Invalid(#[from] DefinitionError),

    #[error("store error: {0}")]
    Store(String),
}

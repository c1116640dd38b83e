//! Model-proposed (or hand-authored) operations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Priority assigned when an operation omits one. Sorts last.
pub const DEFAULT_OPERATION_PRIORITY: u32 = 999;

/// A single whitelisted action eligible for execution.
///
/// Always passes through the operation gate before it runs, no matter
/// where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafeOperation {
    pub operation: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub priority: Option<u32>,
}

impl SafeOperation {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            parameters: Map::new(),
            reason: String::new(),
            priority: None,
        }
    }

    /// Effective priority for batch ordering.
    pub fn effective_priority(&self) -> u32 {
        self.priority.unwrap_or(DEFAULT_OPERATION_PRIORITY)
    }
}

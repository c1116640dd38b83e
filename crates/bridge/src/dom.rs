//! The DOM-execution bridge contract.

use crate::errors::BridgeError;
use async_trait::async_trait;
use serde_json::Value;

/// Result of a narrow capability call on the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl BridgeOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Executes page-level work on behalf of the core.
///
/// Two distinct surfaces: `run_script` executes raw script (policy-gated
/// upstream), while `call_capability` is the narrow whitelisted surface
/// that validated operations go through. Validated operations must never
/// be routed via `run_script`.
#[async_trait]
pub trait DomBridge: Send + Sync {
    /// Execute raw script in the page, optionally against a target session.
    async fn run_script(
        &self,
        script: &str,
        args: &[Value],
        timeout_ms: Option<u64>,
        session: Option<&str>,
    ) -> Result<Value, BridgeError>;

    /// Invoke one named bridge capability with structured parameters.
    async fn call_capability(&self, name: &str, params: Value) -> Result<BridgeOutcome, BridgeError>;

    /// Fetch a structured page/state snapshot.
    async fn snapshot(&self, session: Option<&str>) -> Result<Value, BridgeError>;

    /// Existence probe used by wait-for polling.
    async fn element_exists(&self, selector: &str, session: Option<&str>)
        -> Result<bool, BridgeError>;
}

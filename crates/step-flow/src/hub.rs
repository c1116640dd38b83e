//! Client-call seam.
//!
//! The interpreter dispatches `CallClient` steps through this trait so it
//! does not depend on the HTTP layer or the registry directly; the
//! registry wires its client directory in behind it.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Structured result of a routed client call.
#[derive(Debug, Clone, Default)]
pub struct ClientCallOutcome {
    pub success: bool,
    pub status: Option<u16>,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ClientCallOutcome {
    pub fn not_found(client_id: &str) -> Self {
        Self {
            success: false,
            status: None,
            data: None,
            error: Some(format!("client '{client_id}' is not registered")),
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::json!({
            "success": self.success,
            "status": self.status,
            "data": self.data,
            "error": self.error,
        })
    }
}

/// Routes a client-call step to a registered HTTP client capability.
#[async_trait]
pub trait ClientHub: Send + Sync {
    async fn call_client(
        &self,
        client_id: &str,
        capability: &str,
        params: HashMap<String, Value>,
    ) -> ClientCallOutcome;
}

/// Hub used when no clients are wired in; every call reports not-found.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClientHub;

#[async_trait]
impl ClientHub for NoClientHub {
    async fn call_client(
        &self,
        client_id: &str,
        _capability: &str,
        _params: HashMap<String, Value>,
    ) -> ClientCallOutcome {
        ClientCallOutcome::not_found(client_id)
    }
}

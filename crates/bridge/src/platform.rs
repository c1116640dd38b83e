//! Platform services and the credential vault boundary.

use crate::errors::BridgeError;
use agentry_core_types::{Credentials, TranslateStrategy};
use async_trait::async_trait;
use serde_json::Value;

/// Browser-platform collaborators: key/value storage, tabs, notifications,
/// translation engines.
///
/// Notification display is best-effort by contract; callers log and
/// swallow its failures.
#[async_trait]
pub trait PlatformServices: Send + Sync {
    async fn storage_get(&self, key: &str) -> Result<Option<Value>, BridgeError>;

    async fn storage_set(&self, key: &str, value: Value) -> Result<(), BridgeError>;

    /// Open a tab, returning an opaque tab identifier.
    async fn open_tab(&self, url: &str) -> Result<Value, BridgeError>;

    async fn notify(&self, title: &str, message: &str) -> Result<(), BridgeError>;

    /// Attempt one concrete translation strategy. The interpreter walks
    /// the fallback chain; this runs a single strategy.
    async fn translate(
        &self,
        strategy: TranslateStrategy,
        target_lang: &str,
    ) -> Result<(), BridgeError>;
}

/// Credential vault lookup, keyed by client definition id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn resolve(&self, client_id: &str) -> Result<Credentials, BridgeError>;
}

//! Local collaborator implementations and registry assembly.

use agentry_bridge::{
    BridgeError, BridgeOutcome, CredentialStore, DefinitionStore, DomBridge, ModelClient,
    ModelPrompt, ModelReply, PlatformServices, PolicySettings, SettingsPolicy,
};
use agentry_core_types::{Credentials, TranslateStrategy};
use agentry_registry::{CapabilityRegistry, FileDefinitionStore};
use async_trait::async_trait;
use http_flow::ReqwestTransport;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{info, warn};

/// DOM bridge placeholder for headless CLI runs.
///
/// The real bridge lives in the host that embeds this core; from the CLI
/// every DOM step fails with a clear diagnosis instead of pretending.
#[derive(Debug, Default)]
pub struct UnattachedDom;

const NO_BRIDGE: &str = "no DOM bridge attached; DOM steps require an embedding host";

#[async_trait]
impl DomBridge for UnattachedDom {
    async fn run_script(
        &self,
        _script: &str,
        _args: &[Value],
        _timeout_ms: Option<u64>,
        _session: Option<&str>,
    ) -> Result<Value, BridgeError> {
        Err(BridgeError::Call(NO_BRIDGE.into()))
    }

    async fn call_capability(
        &self,
        _name: &str,
        _params: Value,
    ) -> Result<BridgeOutcome, BridgeError> {
        Err(BridgeError::Call(NO_BRIDGE.into()))
    }

    async fn snapshot(&self, _session: Option<&str>) -> Result<Value, BridgeError> {
        Err(BridgeError::Call(NO_BRIDGE.into()))
    }

    async fn element_exists(
        &self,
        _selector: &str,
        _session: Option<&str>,
    ) -> Result<bool, BridgeError> {
        Err(BridgeError::Call(NO_BRIDGE.into()))
    }
}

/// Model client placeholder: reports that no vendor is configured.
#[derive(Debug, Default)]
pub struct UnconfiguredModel;

#[async_trait]
impl ModelClient for UnconfiguredModel {
    async fn generate(&self, _prompt: &ModelPrompt) -> Result<ModelReply, BridgeError> {
        Err(BridgeError::Model(
            "no model client configured; model-assist steps require an embedding host".into(),
        ))
    }
}

/// In-memory platform services for CLI runs: storage lives for the
/// process, notifications go to the log, tabs and translation are
/// unavailable.
#[derive(Debug, Default)]
pub struct LocalPlatform {
    storage: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl PlatformServices for LocalPlatform {
    async fn storage_get(&self, key: &str) -> Result<Option<Value>, BridgeError> {
        Ok(self
            .storage
            .lock()
            .map_err(|_| BridgeError::Platform("storage lock poisoned".into()))?
            .get(key)
            .cloned())
    }

    async fn storage_set(&self, key: &str, value: Value) -> Result<(), BridgeError> {
        self.storage
            .lock()
            .map_err(|_| BridgeError::Platform("storage lock poisoned".into()))?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn open_tab(&self, url: &str) -> Result<Value, BridgeError> {
        info!(url, "open_tab requested (no browser attached)");
        Ok(json!({ "tab": null, "url": url }))
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), BridgeError> {
        info!(title, message, "notification");
        Ok(())
    }

    async fn translate(
        &self,
        strategy: TranslateStrategy,
        _target_lang: &str,
    ) -> Result<(), BridgeError> {
        Err(BridgeError::Platform(format!(
            "{} translation requires an embedding host",
            strategy.as_str()
        )))
    }
}

/// Credential vault backed by environment variables:
/// `AGENTRY_CRED_<CLIENT>_<FIELD>` (client id upper-cased, dashes as
/// underscores).
#[derive(Debug, Default)]
pub struct EnvCredentialStore;

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn resolve(&self, client_id: &str) -> Result<Credentials, BridgeError> {
        let prefix = format!(
            "AGENTRY_CRED_{}_",
            client_id.to_uppercase().replace('-', "_")
        );
        let credentials: Credentials = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|field| (field.to_lowercase(), value))
            })
            .collect();
        if credentials.is_empty() {
            return Err(BridgeError::MissingCredentials(client_id.to_string()));
        }
        Ok(credentials)
    }
}

/// Assemble a registry with the local collaborator set.
pub fn build_registry(settings: PolicySettings) -> CapabilityRegistry {
    CapabilityRegistry::new(
        Arc::new(UnattachedDom),
        Arc::new(UnconfiguredModel),
        Arc::new(SettingsPolicy::new(settings)),
        Arc::new(LocalPlatform::default()),
        Arc::new(ReqwestTransport::default()),
        Arc::new(EnvCredentialStore),
    )
}

/// Load every definition under the directory into the registry.
///
/// Invalid definitions are skipped with a warning rather than aborting
/// the whole load.
pub async fn load_definitions(
    registry: &CapabilityRegistry,
    dir: &Path,
) -> Result<(usize, usize), BridgeError> {
    let store = FileDefinitionStore::new(dir);
    let mut agents = 0;
    let mut clients = 0;

    for id in store.list_agents().await? {
        match store.load_agent(&id).await {
            Ok(agent) => match registry.register_agent(agent) {
                Ok(()) => agents += 1,
                Err(err) => warn!(id, error = %err, "skipping invalid agent definition"),
            },
            Err(err) => warn!(id, error = %err, "failed to load agent definition"),
        }
    }

    for id in store.list_clients().await? {
        match store.load_client(&id).await {
            Ok(client) => match registry.register_client(client) {
                Ok(()) => clients += 1,
                Err(err) => warn!(id, error = %err, "skipping invalid client definition"),
            },
            Err(err) => warn!(id, error = %err, "failed to load client definition"),
        }
    }

    info!(agents, clients, path = %dir.display(), "definitions loaded");
    Ok((agents, clients))
}

//! Registry surface.

use crate::errors::RegistryError;
use agentry_bridge::{
    BridgeError, CredentialStore, DomBridge, ExecutionPolicy, ModelClient, PlatformServices,
};
use agentry_core_types::{AgentDefinition, ClientDefinition, Credentials};
use async_trait::async_trait;
use dashmap::DashMap;
use http_flow::{ClientRunner, HttpTransport};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use step_flow::{ClientCallOutcome, ClientHub, Interpreter, RunReport};
use tracing::{debug, info};

/// Registered HTTP client definitions plus the runner that executes them.
///
/// Doubles as the interpreter's client-call hub so `CallClient` steps
/// route through the same directory external callers use.
pub struct ClientDirectory {
    clients: DashMap<String, Arc<ClientDefinition>>,
    runner: ClientRunner,
    credentials: Arc<dyn CredentialStore>,
}

impl ClientDirectory {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            clients: DashMap::new(),
            runner: ClientRunner::new(transport),
            credentials,
        }
    }

    pub fn register(&self, client: ClientDefinition) -> Result<(), RegistryError> {
        client.validate()?;
        info!(client = %client.id, "client registered");
        self.clients.insert(client.id.clone(), Arc::new(client));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<ClientDefinition>> {
        self.clients.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn list(&self) -> Vec<String> {
        self.clients.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Invoke one client capability; lookup failures become structured
    /// not-found outcomes, never errors.
    pub async fn invoke(
        &self,
        client_id: &str,
        capability: &str,
        params: HashMap<String, Value>,
    ) -> ClientCallOutcome {
        let Some(client) = self.get(client_id) else {
            return ClientCallOutcome::not_found(client_id);
        };

        let credentials = match self.credentials.resolve(client_id).await {
            Ok(credentials) => credentials,
            // no vault entry is fine for unauthenticated clients; missing
            // fields surface later when the auth scheme asks for them
            Err(BridgeError::MissingCredentials(_)) => Credentials::new(),
            Err(err) => {
                return ClientCallOutcome {
                    success: false,
                    status: None,
                    data: None,
                    error: Some(err.to_string()),
                }
            }
        };

        let report = self
            .runner
            .execute_capability(&client, capability, &params, &credentials)
            .await;
        ClientCallOutcome {
            success: report.success,
            status: report.status,
            data: report.data,
            error: report.error,
        }
    }
}

#[async_trait]
impl ClientHub for ClientDirectory {
    async fn call_client(
        &self,
        client_id: &str,
        capability: &str,
        params: HashMap<String, Value>,
    ) -> ClientCallOutcome {
        self.invoke(client_id, capability, params).await
    }
}

/// Holds all known agent and client definitions by id and dispatches
/// invocations to the interpreter and the client runner.
pub struct CapabilityRegistry {
    agents: DashMap<String, Arc<AgentDefinition>>,
    clients: Arc<ClientDirectory>,
    interpreter: Interpreter,
}

impl CapabilityRegistry {
    pub fn new(
        dom: Arc<dyn DomBridge>,
        model: Arc<dyn ModelClient>,
        policy: Arc<dyn ExecutionPolicy>,
        platform: Arc<dyn PlatformServices>,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let clients = Arc::new(ClientDirectory::new(transport, credentials));
        let interpreter = Interpreter::new(
            dom,
            model,
            policy,
            platform,
            Arc::clone(&clients) as Arc<dyn ClientHub>,
        );
        Self {
            agents: DashMap::new(),
            clients,
            interpreter,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn clients(&self) -> &ClientDirectory {
        &self.clients
    }

    pub fn register_agent(&self, agent: AgentDefinition) -> Result<(), RegistryError> {
        agent.validate()?;
        info!(agent = %agent.id, capabilities = agent.capabilities.len(), "agent registered");
        self.agents.insert(agent.id.clone(), Arc::new(agent));
        Ok(())
    }

    pub fn register_client(&self, client: ClientDefinition) -> Result<(), RegistryError> {
        self.clients.register(client)
    }

    pub fn get_agent(&self, id: &str) -> Option<Arc<AgentDefinition>> {
        self.agents.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_client(&self, id: &str) -> Option<Arc<ClientDefinition>> {
        self.clients.get(id)
    }

    pub fn list_agents(&self) -> Vec<String> {
        self.agents.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn list_clients(&self) -> Vec<String> {
        self.clients.list()
    }

    /// Run one agent capability. An unregistered id yields a structured
    /// failure naming it; this entry point never errors.
    pub async fn invoke_agent(
        &self,
        agent_id: &str,
        capability: &str,
        params: HashMap<String, Value>,
        config: Arc<HashMap<String, Value>>,
        session: Option<String>,
    ) -> RunReport {
        let Some(agent) = self.get_agent(agent_id) else {
            debug!(agent = agent_id, "invocation of unregistered agent");
            return RunReport::new(agent_id, capability)
                .with_error(format!("agent '{agent_id}' is not registered"))
                .finish();
        };
        self.interpreter
            .execute_capability(&agent, capability, params, config, session)
            .await
    }

    /// Run one client capability; same never-error contract.
    pub async fn invoke_client(
        &self,
        client_id: &str,
        capability: &str,
        params: HashMap<String, Value>,
    ) -> ClientCallOutcome {
        self.clients.invoke(client_id, capability, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_bridge::{
        BridgeOutcome, PolicySettings, ScriptedModelClient, SettingsPolicy,
    };
    use agentry_core_types::{
        CapabilityDefinition, ExecutionMode, Step, TranslateStrategy,
    };
    use http_flow::{HttpFlowError, HttpResponse, PreparedRequest};
    use serde_json::json;

    struct StubDom;

    #[async_trait]
    impl DomBridge for StubDom {
        async fn run_script(
            &self,
            _script: &str,
            _args: &[Value],
            _timeout_ms: Option<u64>,
            _session: Option<&str>,
        ) -> Result<Value, BridgeError> {
            Ok(Value::Null)
        }

        async fn call_capability(
            &self,
            name: &str,
            _params: Value,
        ) -> Result<BridgeOutcome, BridgeError> {
            Ok(BridgeOutcome::ok(json!({ "op": name })))
        }

        async fn snapshot(&self, _session: Option<&str>) -> Result<Value, BridgeError> {
            Ok(Value::Null)
        }

        async fn element_exists(
            &self,
            _selector: &str,
            _session: Option<&str>,
        ) -> Result<bool, BridgeError> {
            Ok(true)
        }
    }

    struct StubPlatform;

    #[async_trait]
    impl PlatformServices for StubPlatform {
        async fn storage_get(&self, _key: &str) -> Result<Option<Value>, BridgeError> {
            Ok(None)
        }

        async fn storage_set(&self, _key: &str, _value: Value) -> Result<(), BridgeError> {
            Ok(())
        }

        async fn open_tab(&self, url: &str) -> Result<Value, BridgeError> {
            Ok(json!({ "tab": url }))
        }

        async fn notify(&self, _title: &str, _message: &str) -> Result<(), BridgeError> {
            Ok(())
        }

        async fn translate(
            &self,
            _strategy: TranslateStrategy,
            _target_lang: &str,
        ) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    struct StubTransport;

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn send(&self, _request: &PreparedRequest) -> Result<HttpResponse, HttpFlowError> {
            Ok(HttpResponse {
                status: 200,
                body: r#"{"ok": true}"#.to_string(),
            })
        }
    }

    struct EmptyVault;

    #[async_trait]
    impl CredentialStore for EmptyVault {
        async fn resolve(&self, client_id: &str) -> Result<Credentials, BridgeError> {
            Err(BridgeError::MissingCredentials(client_id.to_string()))
        }
    }

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::new(
            Arc::new(StubDom),
            Arc::new(ScriptedModelClient::default()),
            Arc::new(SettingsPolicy::new(PolicySettings::default())),
            Arc::new(StubPlatform),
            Arc::new(StubTransport),
            Arc::new(EmptyVault),
        )
    }

    fn sample_agent() -> AgentDefinition {
        AgentDefinition {
            id: "greeter".into(),
            name: "Greeter".into(),
            mode: ExecutionMode::Safe,
            assist: None,
            uses_raw_script: false,
            capabilities: vec![CapabilityDefinition {
                name: "hello".into(),
                parameters: vec![],
                steps: vec![Step::Return {
                    value: Some(json!("hi")),
                }],
            }],
        }
    }

    #[tokio::test]
    async fn unregistered_agent_id_is_a_structured_failure() {
        let registry = registry();
        let report = registry
            .invoke_agent(
                "no-such-agent",
                "hello",
                HashMap::new(),
                Arc::new(HashMap::new()),
                None,
            )
            .await;
        assert!(!report.success);
        assert!(report.error.unwrap().contains("no-such-agent"));
    }

    #[tokio::test]
    async fn registered_agent_runs_through_the_interpreter() {
        let registry = registry();
        registry.register_agent(sample_agent()).unwrap();
        assert_eq!(registry.list_agents(), vec!["greeter".to_string()]);

        let report = registry
            .invoke_agent(
                "greeter",
                "hello",
                HashMap::new(),
                Arc::new(HashMap::new()),
                None,
            )
            .await;
        assert!(report.success, "error: {:?}", report.error);
        assert_eq!(report.data.unwrap(), json!("hi"));
    }

    #[tokio::test]
    async fn invalid_agent_definitions_are_refused_at_registration() {
        let registry = registry();
        let mut agent = sample_agent();
        agent.capabilities.clear();
        assert!(registry.register_agent(agent).is_err());
    }

    #[tokio::test]
    async fn unregistered_client_id_is_a_structured_failure() {
        let registry = registry();
        let outcome = registry
            .invoke_client("no-such-client", "get", HashMap::new())
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("no-such-client"));
    }
}

//! Definition persistence contract.

use crate::errors::BridgeError;
use agentry_core_types::{AgentDefinition, ClientDefinition};
use async_trait::async_trait;

/// Load/save/list/delete for agent and client definitions.
///
/// Implementations must validate shape on save: a definition that fails
/// `AgentDefinition::validate` never reaches durable storage.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn load_agent(&self, id: &str) -> Result<AgentDefinition, BridgeError>;
    async fn save_agent(&self, agent: &AgentDefinition) -> Result<(), BridgeError>;
    async fn list_agents(&self) -> Result<Vec<String>, BridgeError>;
    async fn delete_agent(&self, id: &str) -> Result<(), BridgeError>;

    async fn load_client(&self, id: &str) -> Result<ClientDefinition, BridgeError>;
    async fn save_client(&self, client: &ClientDefinition) -> Result<(), BridgeError>;
    async fn list_clients(&self) -> Result<Vec<String>, BridgeError>;
    async fn delete_client(&self, id: &str) -> Result<(), BridgeError>;
}

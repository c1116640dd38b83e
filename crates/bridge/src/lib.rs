//! Collaborator contracts consumed by the execution core.
//!
//! Everything the core talks to (the DOM-execution bridge, the model
//! client, the policy/settings source, platform services, the credential
//! vault, and definition persistence) is a trait here, so each can be
//! replaced wholesale (and mocked in tests).

pub mod dom;
pub mod errors;
pub mod model;
pub mod platform;
pub mod policy;
pub mod store;

pub use dom::{BridgeOutcome, DomBridge};
pub use errors::BridgeError;
pub use model::{ModelClient, ModelPrompt, ModelReply, ScriptedModelClient};
pub use platform::{CredentialStore, PlatformServices};
pub use policy::{ExecutionPolicy, PolicyDecision, PolicySettings, SettingsPolicy};
pub use store::DefinitionStore;

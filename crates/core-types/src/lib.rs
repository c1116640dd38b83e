//! Shared primitives for the agentry execution core.
//!
//! Definitions (agents, capabilities, HTTP clients), the step/condition/
//! transform tagged unions, and the validated-operation model live here so
//! every layer speaks the same closed vocabulary.

pub mod agent;
pub mod client;
pub mod condition;
pub mod ids;
pub mod operation;
pub mod step;
pub mod transform;

pub use agent::{
    AgentDefinition, CapabilityDefinition, DefinitionError, ExecutionMode, ModelAssistPolicy,
    ParamSpec,
};
pub use client::{
    AuthSpec, ClientCapabilityDefinition, ClientDefinition, ClientParam, Credentials, HttpMethod,
    ParamLocation, ResponseSpec,
};
pub use condition::Condition;
pub use ids::{ProcessId, RunId};
pub use operation::SafeOperation;
pub use step::{Step, TranslateStrategy};
pub use transform::Transform;

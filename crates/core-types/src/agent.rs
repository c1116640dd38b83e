//! Agent and capability definitions.

use crate::step::{steps_contain_raw_script, Step};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// How much latitude an agent definition is granted at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// No raw script, ever. The only mode accepted under strict policy.
    #[default]
    Safe,
    /// Model-proposed operations allowed, behind the operation whitelist.
    ModelAssisted,
    /// Raw script permitted when the runtime policy also allows it.
    Unrestricted,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Safe => "safe",
            ExecutionMode::ModelAssisted => "model-assisted",
            ExecutionMode::Unrestricted => "unrestricted",
        }
    }
}

/// Tuning for the model-assist steps of an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelAssistPolicy {
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Subset of the static operation whitelist this agent may request.
    /// Names outside the static table are dropped, never added.
    #[serde(default)]
    pub allowed_operations: Option<Vec<String>>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    5
}

impl Default for ModelAssistPolicy {
    fn default() -> Self {
        Self {
            system_prompt: None,
            allowed_operations: None,
            temperature: None,
            max_iterations: default_max_iterations(),
        }
    }
}

/// One declared capability parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

/// The unit of invocation: a named, ordered step list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityDefinition {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    pub steps: Vec<Step>,
}

/// A declarative agent: named capabilities plus execution policy inputs.
///
/// Definitions are authored externally and read-only during execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub assist: Option<ModelAssistPolicy>,
    /// Author-declared marker; `validate` cross-checks it against the steps.
    #[serde(default)]
    pub uses_raw_script: bool,
    pub capabilities: Vec<CapabilityDefinition>,
}

/// Shape violations in a definition, caught on save and on registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("definition id cannot be empty")]
    EmptyId,

    #[error("definition '{id}' has no capabilities")]
    NoCapabilities { id: String },

    #[error("definition '{id}' declares capability '{name}' more than once")]
    DuplicateCapability { id: String, name: String },

    #[error("safe-mode agent '{id}' contains a raw-script step")]
    RawScriptInSafeMode { id: String },

    #[error("agent '{id}' contains raw script but is not flagged uses_raw_script")]
    UnflaggedRawScript { id: String },
}

impl AgentDefinition {
    /// Look up a capability by name.
    pub fn capability(&self, name: &str) -> Option<&CapabilityDefinition> {
        self.capabilities.iter().find(|cap| cap.name == name)
    }

    /// True if any step of any capability executes raw script.
    pub fn contains_raw_script(&self) -> bool {
        self.capabilities
            .iter()
            .any(|cap| steps_contain_raw_script(&cap.steps))
    }

    /// Shape validation run before a definition is persisted or registered.
    ///
    /// Invariant: a safe-mode agent must never contain a raw-script step,
    /// and the raw-script flag must match the steps it describes.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::EmptyId);
        }
        if self.capabilities.is_empty() {
            return Err(DefinitionError::NoCapabilities {
                id: self.id.clone(),
            });
        }
        let mut seen = HashSet::new();
        for cap in &self.capabilities {
            if !seen.insert(cap.name.as_str()) {
                return Err(DefinitionError::DuplicateCapability {
                    id: self.id.clone(),
                    name: cap.name.clone(),
                });
            }
        }
        let has_script = self.contains_raw_script();
        if has_script && self.mode == ExecutionMode::Safe {
            return Err(DefinitionError::RawScriptInSafeMode {
                id: self.id.clone(),
            });
        }
        if has_script && !self.uses_raw_script {
            return Err(DefinitionError::UnflaggedRawScript {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_agent(mode: ExecutionMode, steps: Vec<Step>) -> AgentDefinition {
        AgentDefinition {
            id: "a1".into(),
            name: "demo".into(),
            mode,
            assist: None,
            uses_raw_script: false,
            capabilities: vec![CapabilityDefinition {
                name: "main".into(),
                parameters: vec![],
                steps,
            }],
        }
    }

    #[test]
    fn safe_mode_rejects_raw_script_steps() {
        let agent = minimal_agent(
            ExecutionMode::Safe,
            vec![Step::RunScript {
                script: "document.title".into(),
                args: vec![],
                timeout_ms: None,
                store_as: None,
            }],
        );
        assert_eq!(
            agent.validate(),
            Err(DefinitionError::RawScriptInSafeMode { id: "a1".into() })
        );
    }

    #[test]
    fn unflagged_raw_script_is_rejected() {
        let mut agent = minimal_agent(
            ExecutionMode::Unrestricted,
            vec![Step::RunScript {
                script: "1".into(),
                args: vec![],
                timeout_ms: None,
                store_as: None,
            }],
        );
        assert!(matches!(
            agent.validate(),
            Err(DefinitionError::UnflaggedRawScript { .. })
        ));
        agent.uses_raw_script = true;
        assert!(agent.validate().is_ok());
    }

    #[test]
    fn duplicate_capability_names_are_rejected() {
        let mut agent = minimal_agent(ExecutionMode::Safe, vec![Step::Wait { ms: 1 }]);
        agent.capabilities.push(agent.capabilities[0].clone());
        assert!(matches!(
            agent.validate(),
            Err(DefinitionError::DuplicateCapability { .. })
        ));
    }
}

//! Runtime execution policy.

use agentry_core_types::{AgentDefinition, ExecutionMode};

/// Outcome of a pre-execution policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Settings the policy source answers from.
#[derive(Debug, Clone, Copy)]
pub struct PolicySettings {
    /// Reject every agent that is not `safe`-mode.
    pub strict_safe_mode: bool,
    /// Global gate for raw-script steps.
    pub allow_raw_script: bool,
    /// Global gate for the model-assisted mode.
    pub allow_model_assisted: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            strict_safe_mode: false,
            allow_raw_script: false,
            allow_model_assisted: true,
        }
    }
}

/// Policy/settings source consulted before and during execution.
pub trait ExecutionPolicy: Send + Sync {
    fn raw_script_allowed(&self) -> bool;

    /// Mode rules, applied before any step runs.
    fn can_execute(&self, agent: &AgentDefinition) -> PolicyDecision;
}

/// The standard settings-backed policy.
#[derive(Debug, Clone, Default)]
pub struct SettingsPolicy {
    settings: PolicySettings,
}

impl SettingsPolicy {
    pub fn new(settings: PolicySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }
}

impl ExecutionPolicy for SettingsPolicy {
    fn raw_script_allowed(&self) -> bool {
        self.settings.allow_raw_script
    }

    fn can_execute(&self, agent: &AgentDefinition) -> PolicyDecision {
        // A safe-mode definition carrying raw script is misconfigured no
        // matter what the runtime settings say.
        if agent.mode == ExecutionMode::Safe
            && (agent.uses_raw_script || agent.contains_raw_script())
        {
            return PolicyDecision::deny(format!(
                "agent '{}' is safe-mode but contains raw script",
                agent.id
            ));
        }

        if self.settings.strict_safe_mode && agent.mode != ExecutionMode::Safe {
            return PolicyDecision::deny(format!(
                "strict safe mode rejects '{}' agents",
                agent.mode.as_str()
            ));
        }

        if agent.mode == ExecutionMode::ModelAssisted && !self.settings.allow_model_assisted {
            return PolicyDecision::deny("model-assisted execution is disabled");
        }

        PolicyDecision::allow()
    }
}

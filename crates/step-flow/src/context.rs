//! Per-invocation execution state and run reports.

use agentry_core_types::{AgentDefinition, RunId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use value_engine::{resolve, Scope};

/// Mutable state for exactly one capability invocation.
///
/// Discarded when the invocation returns or fails; background processes
/// are tracked separately and deliberately survive it.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Name -> value store, seeded from call parameters.
    pub vars: HashMap<String, Value>,
    /// Immutable user-configuration map, reachable as `{{config.*}}`.
    pub config: Arc<HashMap<String, Value>>,
    /// The owning definition, read-only during execution.
    pub agent: Arc<AgentDefinition>,
    /// Optional target session forwarded to the DOM bridge.
    pub session: Option<String>,
    /// Per-step trace accumulated while the invocation runs.
    pub reports: Vec<StepReport>,
}

impl ExecutionContext {
    pub fn new(
        agent: Arc<AgentDefinition>,
        vars: HashMap<String, Value>,
        config: Arc<HashMap<String, Value>>,
        session: Option<String>,
    ) -> Self {
        Self {
            vars,
            config,
            agent,
            session,
            reports: Vec::new(),
        }
    }

    pub fn scope(&self) -> Scope<'_> {
        Scope::new(&self.vars, &self.config)
    }

    /// Resolve templates in a value against this context.
    pub fn resolve(&self, value: &Value) -> Value {
        resolve(value, &self.scope())
    }

    /// Resolve a template string down to text.
    pub fn resolve_text(&self, text: &str) -> String {
        match self.resolve(&Value::String(text.to_string())) {
            Value::String(resolved) => resolved,
            other => other.to_string(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

/// Trace of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub kind: &'static str,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl StepReport {
    pub fn start(kind: &'static str) -> Self {
        let now = Utc::now();
        Self {
            kind,
            success: false,
            started_at: now,
            finished_at: now,
            latency_ms: 0,
            error: None,
        }
    }

    pub fn finish(mut self, error: Option<String>) -> Self {
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at).num_milliseconds().max(0) as u64;
        self.success = error.is_none();
        self.error = error;
        self
    }
}

/// Structured result of one capability invocation. The interpreter never
/// surfaces an `Err` to its caller; everything folds into this.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub agent_id: String,
    pub capability: String,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn new(agent_id: impl Into<String>, capability: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: RunId::new(),
            agent_id: agent_id.into(),
            capability: capability.into(),
            success: false,
            data: None,
            error: None,
            started_at: now,
            finished_at: now,
            latency_ms: 0,
            steps: Vec::new(),
        }
    }

    pub fn with_success(mut self, data: Value) -> Self {
        self.success = true;
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at).num_milliseconds().max(0) as u64;
        self
    }
}

//! The step vocabulary, as one closed tagged union.
//!
//! Unknown variants are a serde error, which the interpreter surfaces as a
//! broken-definition failure. Adding a variant forces every consumer to
//! handle it (exhaustive matching, no catch-all arms in the interpreter).

use crate::condition::Condition;
use crate::ids::ProcessId;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One instruction in a capability's ordered action list.
///
/// Steps that produce a value may bind it to a variable via `store_as`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Step {
    // --- DOM query / mutate -------------------------------------------------
    /// Click the first element matching `selector`.
    Click {
        selector: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Fill an input element with a value.
    FillInput {
        selector: String,
        value: Value,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Read the text content of an element.
    GetText {
        selector: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Read one attribute of an element.
    GetAttribute {
        selector: String,
        attribute: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Remove an element from the page.
    RemoveElement {
        selector: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Set one inline style property on an element.
    ModifyStyle {
        selector: String,
        property: String,
        value: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Scroll the first matching element into view.
    ScrollTo {
        selector: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Restore the scroll position saved by the page session.
    RestoreScroll {
        #[serde(default)]
        store_as: Option<String>,
    },

    // --- Raw script ---------------------------------------------------------
    /// Execute page-level script through the DOM bridge.
    ///
    /// Gated by the runtime raw-script policy; a `safe`-mode agent must
    /// never contain this step.
    RunScript {
        script: String,
        #[serde(default)]
        args: Vec<Value>,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        store_as: Option<String>,
    },

    // --- Model assist -------------------------------------------------------
    /// Fetch a structured page/state snapshot from the bridge.
    InspectPage {
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Send a freeform prompt plus optional context to the model and store
    /// its text reply.
    AnalyzePage {
        prompt: String,
        #[serde(default)]
        context_var: Option<String>,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Ask the model to propose whitelisted operations for a goal.
    ///
    /// The raw reply is recovered into an operation batch and stored; it is
    /// NOT validated or executed here.
    RequestOperations {
        goal: String,
        #[serde(default)]
        context_var: Option<String>,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Validate a stored operation batch and execute the valid subset via
    /// the bridge's narrow capability surface.
    ExecuteOperations {
        source: String,
        #[serde(default = "default_true")]
        validate: bool,
        #[serde(default)]
        stop_on_error: bool,
        #[serde(default)]
        store_as: Option<String>,
    },

    // --- Declarative HTTP ---------------------------------------------------
    /// Invoke one capability of a registered HTTP client definition.
    CallClient {
        client: String,
        capability: String,
        #[serde(default)]
        params: HashMap<String, Value>,
        #[serde(default)]
        store_as: Option<String>,
    },

    // --- Control flow -------------------------------------------------------
    /// Evaluate a condition and execute exactly one branch.
    If {
        condition: Condition,
        then_steps: Vec<Step>,
        #[serde(default)]
        else_steps: Vec<Step>,
    },

    /// Execute the body once per element of an array variable, in order.
    ForEach {
        source: String,
        #[serde(default = "default_item_var")]
        item_var: String,
        body: Vec<Step>,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Re-evaluate the condition before each iteration, up to a cap.
    While {
        condition: Condition,
        body: Vec<Step>,
        #[serde(default)]
        max_iterations: Option<u32>,
    },

    /// Suspend for a fixed duration.
    Wait { ms: u64 },

    /// Poll for an element until it exists or the timeout elapses.
    WaitFor {
        selector: String,
        timeout_ms: u64,
        #[serde(default)]
        interval_ms: Option<u64>,
    },

    // --- Data ---------------------------------------------------------------
    /// Bind a (template-resolved) value to a variable.
    SetVariable { name: String, value: Value },

    /// Read a variable; useful with `store_as` to rebind.
    GetVariable {
        name: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Map a variable through one transform.
    ///
    /// Writes back to `source` unless `store_as` redirects the result.
    TransformVariable {
        source: String,
        transform: Transform,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Shallow object union over named variables, later sources winning.
    MergeVariables {
        sources: Vec<String>,
        store_as: String,
    },

    // --- Platform -----------------------------------------------------------
    /// Read one key from platform key/value storage.
    StorageGet {
        key: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Write one key to platform key/value storage.
    StorageSet { key: String, value: Value },

    /// Open a new tab at a URL.
    OpenTab {
        url: String,
        #[serde(default)]
        store_as: Option<String>,
    },

    /// Show a notification. Best-effort: failures never fail the capability.
    Notify { title: String, message: String },

    /// Translate the page, trying fallback strategies in order.
    Translate {
        target_lang: String,
        #[serde(default)]
        strategy: TranslateStrategy,
        #[serde(default)]
        store_as: Option<String>,
    },

    // --- Process lifecycle --------------------------------------------------
    /// Create a named background process.
    ///
    /// With `interval_ms` the body re-runs on a timer until stopped;
    /// without it the body runs once and the record exists only for its
    /// cleanup contract.
    StartProcess {
        process: ProcessId,
        body: Vec<Step>,
        #[serde(default)]
        interval_ms: Option<u64>,
    },

    /// Run a process's registered cleanup, then release it.
    StopProcess { process: ProcessId },

    /// Attach a cleanup step list to an existing process.
    RegisterCleanup {
        process: ProcessId,
        steps: Vec<Step>,
    },

    // --- Return -------------------------------------------------------------
    /// End the capability and surface a value to the caller.
    Return {
        #[serde(default)]
        value: Option<Value>,
    },
}

fn default_true() -> bool {
    true
}

fn default_item_var() -> String {
    "item".to_string()
}

/// Translation strategy selector.
///
/// `Auto` expands to the full fallback chain: native engine, then
/// model-based translation, then widget injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TranslateStrategy {
    #[default]
    Auto,
    Native,
    Model,
    Widget,
}

impl TranslateStrategy {
    /// Ordered list of concrete strategies to attempt.
    pub fn fallback_chain(self) -> Vec<TranslateStrategy> {
        match self {
            TranslateStrategy::Auto => vec![
                TranslateStrategy::Native,
                TranslateStrategy::Model,
                TranslateStrategy::Widget,
            ],
            other => vec![other],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TranslateStrategy::Auto => "auto",
            TranslateStrategy::Native => "native",
            TranslateStrategy::Model => "model",
            TranslateStrategy::Widget => "widget",
        }
    }
}

impl Step {
    /// True if this step or anything nested under it executes raw script.
    pub fn contains_raw_script(&self) -> bool {
        match self {
            Step::RunScript { .. } => true,
            Step::If {
                then_steps,
                else_steps,
                ..
            } => steps_contain_raw_script(then_steps) || steps_contain_raw_script(else_steps),
            Step::ForEach { body, .. } | Step::While { body, .. } => {
                steps_contain_raw_script(body)
            }
            Step::StartProcess { body, .. } => steps_contain_raw_script(body),
            Step::RegisterCleanup { steps, .. } => steps_contain_raw_script(steps),
            _ => false,
        }
    }
}

/// True if any step in the list (recursively) executes raw script.
pub fn steps_contain_raw_script(steps: &[Step]) -> bool {
    steps.iter().any(Step::contains_raw_script)
}

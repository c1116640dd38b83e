//! The step interpreter.

use crate::context::{ExecutionContext, RunReport, StepReport};
use crate::errors::FlowError;
use crate::hub::ClientHub;
use crate::model_assist::build_operations_prompt;
use crate::processes::{ProcessEntry, ProcessTable};
use agentry_bridge::{DomBridge, ExecutionPolicy, ModelClient, ModelPrompt, PlatformServices};
use agentry_core_types::{
    AgentDefinition, ProcessId, SafeOperation, Step, TranslateStrategy,
};
use async_recursion::async_recursion;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Hard limits applied uniformly to every invocation.
#[derive(Debug, Clone, Copy)]
pub struct InterpreterLimits {
    /// Iteration cap for `While` steps without their own cap.
    pub max_while_iterations: u32,
    /// Default polling interval for `WaitFor`.
    pub poll_interval_ms: u64,
}

impl Default for InterpreterLimits {
    fn default() -> Self {
        Self {
            max_while_iterations: 1000,
            poll_interval_ms: 500,
        }
    }
}

/// Result of executing one step list.
enum ListOutcome {
    /// The list ran to its end; carries the last produced value.
    Completed(Value),
    /// A `Return` step fired; unwinds to the capability boundary.
    Returned(Value),
}

/// Result of executing one step.
enum StepOutcome {
    Value(Option<Value>),
    Return(Value),
}

/// Executes agent capabilities. Cheap to clone; clones share the process
/// table and collaborators.
#[derive(Clone)]
pub struct Interpreter {
    dom: Arc<dyn DomBridge>,
    model: Arc<dyn ModelClient>,
    policy: Arc<dyn ExecutionPolicy>,
    platform: Arc<dyn PlatformServices>,
    clients: Arc<dyn ClientHub>,
    processes: Arc<ProcessTable>,
    limits: InterpreterLimits,
}

impl Interpreter {
    pub fn new(
        dom: Arc<dyn DomBridge>,
        model: Arc<dyn ModelClient>,
        policy: Arc<dyn ExecutionPolicy>,
        platform: Arc<dyn PlatformServices>,
        clients: Arc<dyn ClientHub>,
    ) -> Self {
        Self {
            dom,
            model,
            policy,
            platform,
            clients,
            processes: Arc::new(ProcessTable::new()),
            limits: InterpreterLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: InterpreterLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// Run one capability of an agent definition.
    ///
    /// Never returns an error: policy rejections are reported before any
    /// step runs, and interpreter errors are caught here and folded into
    /// the report.
    pub async fn execute_capability(
        &self,
        agent: &Arc<AgentDefinition>,
        capability_name: &str,
        params: HashMap<String, Value>,
        config: Arc<HashMap<String, Value>>,
        session: Option<String>,
    ) -> RunReport {
        let report = RunReport::new(agent.id.clone(), capability_name);
        info!(agent = %agent.id, capability = capability_name, "executing capability");

        let decision = self.policy.can_execute(agent);
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "execution not permitted".to_string());
            warn!(agent = %agent.id, %reason, "policy rejected execution");
            return report.with_error(reason).finish();
        }

        let Some(capability) = agent.capability(capability_name) else {
            return report
                .with_error(FlowError::UnknownCapability(capability_name.to_string()).to_string())
                .finish();
        };

        let mut vars = params;
        for spec in &capability.parameters {
            if vars.contains_key(&spec.name) {
                continue;
            }
            match &spec.default {
                Some(default) => {
                    vars.insert(spec.name.clone(), default.clone());
                }
                None if spec.required => {
                    return report
                        .with_error(
                            FlowError::MissingParameter(spec.name.clone()).to_string(),
                        )
                        .finish();
                }
                None => {}
            }
        }

        let mut ctx = ExecutionContext::new(Arc::clone(agent), vars, config, session);
        let steps = capability.steps.clone();

        let mut report = match self.execute_steps(&steps, &mut ctx).await {
            Ok(ListOutcome::Returned(value)) => report.with_success(value),
            Ok(ListOutcome::Completed(value)) => report.with_success(value),
            Err(err) => {
                warn!(agent = %agent.id, capability = capability_name, error = %err, "capability failed");
                report.with_error(err.to_string())
            }
        };
        report.steps = ctx.reports;
        report.finish()
    }

    /// Execute a step list in order. A `Return` anywhere inside, including
    /// nested branch and loop bodies, short-circuits and unwinds all the
    /// way to the capability boundary.
    #[async_recursion]
    async fn execute_steps(
        &self,
        steps: &[Step],
        ctx: &mut ExecutionContext,
    ) -> Result<ListOutcome, FlowError> {
        let mut last = Value::Null;
        for step in steps {
            let trace = StepReport::start(step_kind(step));
            let result = self.execute_step(step, ctx).await;
            ctx.reports
                .push(trace.finish(result.as_ref().err().map(|err| err.to_string())));
            match result? {
                StepOutcome::Return(value) => return Ok(ListOutcome::Returned(value)),
                StepOutcome::Value(Some(value)) => last = value,
                StepOutcome::Value(None) => {}
            }
        }
        Ok(ListOutcome::Completed(last))
    }

    #[async_recursion]
    async fn execute_step(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutcome, FlowError> {
        match step {
            // --- DOM -------------------------------------------------------
            Step::Click { selector, store_as } => {
                let value = self
                    .dom_call(ctx, "click_element", json!({ "selector": ctx.resolve_text(selector) }))
                    .await?;
                Ok(self.bind(ctx, store_as, value))
            }

            Step::FillInput {
                selector,
                value,
                store_as,
            } => {
                let params = json!({
                    "selector": ctx.resolve_text(selector),
                    "value": ctx.resolve(value),
                });
                let value = self.dom_call(ctx, "fill_input", params).await?;
                Ok(self.bind(ctx, store_as, value))
            }

            Step::GetText { selector, store_as } => {
                let value = self
                    .dom_call(ctx, "get_element_text", json!({ "selector": ctx.resolve_text(selector) }))
                    .await?;
                Ok(self.bind(ctx, store_as, value))
            }

            Step::GetAttribute {
                selector,
                attribute,
                store_as,
            } => {
                let params = json!({
                    "selector": ctx.resolve_text(selector),
                    "attribute": attribute,
                });
                let value = self.dom_call(ctx, "get_attribute", params).await?;
                Ok(self.bind(ctx, store_as, value))
            }

            Step::RemoveElement { selector, store_as } => {
                let value = self
                    .dom_call(ctx, "remove_element", json!({ "selector": ctx.resolve_text(selector) }))
                    .await?;
                Ok(self.bind(ctx, store_as, value))
            }

            Step::ModifyStyle {
                selector,
                property,
                value,
                store_as,
            } => {
                let params = json!({
                    "selector": ctx.resolve_text(selector),
                    "property": property,
                    "value": ctx.resolve_text(value),
                });
                let value = self.dom_call(ctx, "modify_style", params).await?;
                Ok(self.bind(ctx, store_as, value))
            }

            Step::ScrollTo { selector, store_as } => {
                let value = self
                    .dom_call(ctx, "scroll_to", json!({ "selector": ctx.resolve_text(selector) }))
                    .await?;
                Ok(self.bind(ctx, store_as, value))
            }

            Step::RestoreScroll { store_as } => {
                let value = self.dom_call(ctx, "restore_scroll", json!({})).await?;
                Ok(self.bind(ctx, store_as, value))
            }

            // --- Raw script ------------------------------------------------
            Step::RunScript {
                script,
                args,
                timeout_ms,
                store_as,
            } => {
                if !self.policy.raw_script_allowed() {
                    return Err(FlowError::RawScriptDisabled);
                }
                let args: Vec<Value> = args.iter().map(|arg| ctx.resolve(arg)).collect();
                let value = self
                    .dom
                    .run_script(
                        &ctx.resolve_text(script),
                        &args,
                        *timeout_ms,
                        ctx.session.as_deref(),
                    )
                    .await?;
                Ok(self.bind(ctx, store_as, value))
            }

            // --- Model assist ----------------------------------------------
            Step::InspectPage { store_as } => {
                let snapshot = self.dom.snapshot(ctx.session.as_deref()).await?;
                Ok(self.bind(ctx, store_as, snapshot))
            }

            Step::AnalyzePage {
                prompt,
                context_var,
                store_as,
            } => {
                let mut text = ctx.resolve_text(prompt);
                if let Some(var) = context_var {
                    if let Some(value) = ctx.get(var) {
                        text.push_str("\n\nContext:\n");
                        text.push_str(&value.to_string());
                    }
                }
                let reply = self.model.generate(&self.model_prompt(ctx, text)).await?;
                Ok(self.bind(ctx, store_as, Value::String(reply.content)))
            }

            Step::RequestOperations {
                goal,
                context_var,
                store_as,
            } => {
                let gate = self.effective_gate(ctx);
                let context_text = context_var
                    .as_ref()
                    .and_then(|var| ctx.get(var))
                    .map(|value| value.to_string());
                let prompt = build_operations_prompt(
                    &gate,
                    &ctx.resolve_text(goal),
                    context_text.as_deref(),
                );
                let reply = self.model.generate(&self.model_prompt(ctx, prompt)).await?;
                let candidates = op_gate::parse_operations_from_response(&reply.content);
                debug!(count = candidates.len(), "operations proposed");
                let value = Value::Array(candidates);
                let name = store_as.clone().unwrap_or_else(|| "proposed_operations".into());
                ctx.set(name, value.clone());
                Ok(StepOutcome::Value(Some(value)))
            }

            Step::ExecuteOperations {
                source,
                validate,
                stop_on_error,
                store_as,
            } => {
                let value = self
                    .execute_operations(ctx, source, *validate, *stop_on_error)
                    .await?;
                Ok(self.bind(ctx, store_as, value))
            }

            // --- Declarative HTTP ------------------------------------------
            Step::CallClient {
                client,
                capability,
                params,
                store_as,
            } => {
                let resolved: HashMap<String, Value> = params
                    .iter()
                    .map(|(name, value)| (name.clone(), ctx.resolve(value)))
                    .collect();
                let outcome = self
                    .clients
                    .call_client(client, capability, resolved)
                    .await;
                Ok(self.bind(ctx, store_as, outcome.into_value()))
            }

            // --- Control flow ----------------------------------------------
            Step::If {
                condition,
                then_steps,
                else_steps,
            } => {
                let branch = if value_engine::evaluate(condition, &ctx.scope()) {
                    then_steps
                } else {
                    else_steps
                };
                match self.execute_steps(branch, ctx).await? {
                    ListOutcome::Returned(value) => Ok(StepOutcome::Return(value)),
                    ListOutcome::Completed(_) => Ok(StepOutcome::Value(None)),
                }
            }

            Step::ForEach {
                source,
                item_var,
                body,
                store_as,
            } => {
                let items = match ctx.get(source) {
                    Some(Value::Array(items)) => items.clone(),
                    _ => {
                        return Err(FlowError::ForEachSource {
                            var: source.clone(),
                        })
                    }
                };
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    ctx.set(item_var.clone(), item);
                    match self.execute_steps(body, ctx).await? {
                        ListOutcome::Returned(value) => return Ok(StepOutcome::Return(value)),
                        ListOutcome::Completed(value) => results.push(value),
                    }
                }
                Ok(self.bind(ctx, store_as, Value::Array(results)))
            }

            Step::While {
                condition,
                body,
                max_iterations,
            } => {
                let cap = max_iterations.unwrap_or(self.limits.max_while_iterations);
                let mut iterations = 0u32;
                while value_engine::evaluate(condition, &ctx.scope()) {
                    if iterations >= cap {
                        // cap is a guard rail, not a failure
                        warn!(cap, "while loop hit its iteration cap");
                        break;
                    }
                    iterations += 1;
                    if let ListOutcome::Returned(value) = self.execute_steps(body, ctx).await? {
                        return Ok(StepOutcome::Return(value));
                    }
                }
                Ok(StepOutcome::Value(None))
            }

            Step::Wait { ms } => {
                sleep(Duration::from_millis(*ms)).await;
                Ok(StepOutcome::Value(None))
            }

            Step::WaitFor {
                selector,
                timeout_ms,
                interval_ms,
            } => {
                let selector = ctx.resolve_text(selector);
                let interval =
                    Duration::from_millis(interval_ms.unwrap_or(self.limits.poll_interval_ms));
                let deadline = Instant::now() + Duration::from_millis(*timeout_ms);
                loop {
                    if self
                        .dom
                        .element_exists(&selector, ctx.session.as_deref())
                        .await?
                    {
                        return Ok(StepOutcome::Value(None));
                    }
                    if Instant::now() + interval > deadline {
                        return Err(FlowError::WaitForTimeout {
                            selector,
                            timeout_ms: *timeout_ms,
                        });
                    }
                    sleep(interval).await;
                }
            }

            // --- Data ------------------------------------------------------
            Step::SetVariable { name, value } => {
                let resolved = ctx.resolve(value);
                ctx.set(name.clone(), resolved);
                Ok(StepOutcome::Value(None))
            }

            Step::GetVariable { name, store_as } => {
                let value = ctx.get(name).cloned().unwrap_or(Value::Null);
                Ok(self.bind(ctx, store_as, value))
            }

            Step::TransformVariable {
                source,
                transform,
                store_as,
            } => {
                let input = ctx.get(source).cloned().unwrap_or(Value::Null);
                let output = value_engine::apply(&input, transform)?;
                let target = store_as.clone().unwrap_or_else(|| source.clone());
                ctx.set(target, output.clone());
                Ok(StepOutcome::Value(Some(output)))
            }

            Step::MergeVariables { sources, store_as } => {
                let mut merged = Map::new();
                for source in sources {
                    match ctx.get(source) {
                        Some(Value::Object(map)) => {
                            // shallow union, later sources win
                            for (key, value) in map {
                                merged.insert(key.clone(), value.clone());
                            }
                        }
                        Some(_) | None => {
                            warn!(source, "merge source is not an object; skipped");
                        }
                    }
                }
                let value = Value::Object(merged);
                ctx.set(store_as.clone(), value.clone());
                Ok(StepOutcome::Value(Some(value)))
            }

            // --- Platform --------------------------------------------------
            Step::StorageGet { key, store_as } => {
                let value = self
                    .platform
                    .storage_get(&ctx.resolve_text(key))
                    .await?
                    .unwrap_or(Value::Null);
                Ok(self.bind(ctx, store_as, value))
            }

            Step::StorageSet { key, value } => {
                let resolved = ctx.resolve(value);
                self.platform
                    .storage_set(&ctx.resolve_text(key), resolved)
                    .await?;
                Ok(StepOutcome::Value(None))
            }

            Step::OpenTab { url, store_as } => {
                let tab = self.platform.open_tab(&ctx.resolve_text(url)).await?;
                Ok(self.bind(ctx, store_as, tab))
            }

            Step::Notify { title, message } => {
                let title = ctx.resolve_text(title);
                let message = ctx.resolve_text(message);
                // best-effort: a failed toast never fails the capability
                if let Err(err) = self.platform.notify(&title, &message).await {
                    warn!(error = %err, "notification failed");
                }
                Ok(StepOutcome::Value(None))
            }

            Step::Translate {
                target_lang,
                strategy,
                store_as,
            } => {
                let value = self.translate(ctx, *strategy, target_lang).await;
                Ok(self.bind(ctx, store_as, value))
            }

            // --- Process lifecycle -----------------------------------------
            Step::StartProcess {
                process,
                body,
                interval_ms,
            } => {
                self.start_process(ctx, process, body, *interval_ms).await?;
                Ok(StepOutcome::Value(None))
            }

            Step::StopProcess { process } => {
                self.stop_process(ctx, process).await?;
                Ok(StepOutcome::Value(None))
            }

            Step::RegisterCleanup { process, steps } => {
                if !self.processes.set_cleanup(process, steps.clone()) {
                    return Err(FlowError::UnknownProcess(process.0.clone()));
                }
                Ok(StepOutcome::Value(None))
            }

            // --- Return ----------------------------------------------------
            Step::Return { value } => {
                let value = value
                    .as_ref()
                    .map(|value| ctx.resolve(value))
                    .unwrap_or(Value::Null);
                Ok(StepOutcome::Return(value))
            }
        }
    }

    fn bind(
        &self,
        ctx: &mut ExecutionContext,
        store_as: &Option<String>,
        value: Value,
    ) -> StepOutcome {
        if let Some(name) = store_as {
            ctx.set(name.clone(), value.clone());
        }
        StepOutcome::Value(Some(value))
    }

    fn model_prompt(&self, ctx: &ExecutionContext, prompt: String) -> ModelPrompt {
        let assist = ctx.agent.assist.as_ref();
        ModelPrompt {
            prompt,
            system_prompt: assist.and_then(|assist| assist.system_prompt.clone()),
            temperature: assist.and_then(|assist| assist.temperature),
            max_tokens: None,
        }
    }

    /// The effective whitelist: the agent's configured subset intersected
    /// with the static table (the gate constructor enforces the subset
    /// rule).
    fn effective_gate(&self, ctx: &ExecutionContext) -> op_gate::OperationGate {
        let subset = ctx
            .agent
            .assist
            .as_ref()
            .and_then(|assist| assist.allowed_operations.as_deref());
        op_gate::OperationGate::new(subset)
    }

    /// Route one DOM call through the bridge's named-capability surface.
    async fn dom_call(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        mut params: Value,
    ) -> Result<Value, FlowError> {
        if let (Some(session), Some(map)) = (&ctx.session, params.as_object_mut()) {
            map.insert("session".to_string(), Value::String(session.clone()));
        }
        let outcome = self.dom.call_capability(name, params).await?;
        if outcome.success {
            Ok(outcome.data.unwrap_or(Value::Null))
        } else {
            Err(FlowError::Bridge(
                outcome
                    .error
                    .unwrap_or_else(|| format!("{name} reported failure")),
            ))
        }
    }

    /// Validate (unless skipped) and execute a stored operation batch via
    /// the bridge's narrow capability surface, never via raw script.
    async fn execute_operations(
        &self,
        ctx: &mut ExecutionContext,
        source: &str,
        validate: bool,
        stop_on_error: bool,
    ) -> Result<Value, FlowError> {
        let candidates = match ctx.get(source) {
            Some(Value::Array(items)) => items.clone(),
            _ => {
                return Err(FlowError::BatchSource {
                    var: source.to_string(),
                })
            }
        };

        let operations: Vec<SafeOperation> = if validate {
            let gate = self.effective_gate(ctx);
            let outcome = gate.validate_operations(&candidates);
            for invalid in &outcome.invalid {
                warn!(
                    index = invalid.index,
                    operation = invalid.operation.as_deref().unwrap_or("<unnamed>"),
                    issue = %invalid.issue,
                    "operation rejected by the gate"
                );
            }
            outcome.valid
        } else {
            candidates
                .into_iter()
                .map(|candidate| {
                    serde_json::from_value(candidate)
                        .map_err(|err| FlowError::MalformedOperation(err.to_string()))
                })
                .collect::<Result<_, _>>()?
        };

        let mut results = Vec::with_capacity(operations.len());
        for operation in operations {
            let outcome = self
                .dom
                .call_capability(
                    &operation.operation,
                    Value::Object(operation.parameters.clone()),
                )
                .await?;
            let succeeded = outcome.success;
            results.push(json!({
                "operation": operation.operation,
                "success": succeeded,
                "data": outcome.data,
                "error": outcome.error,
            }));
            if !succeeded && stop_on_error {
                warn!(operation = %operation.operation, "stopping batch on first error");
                break;
            }
        }
        Ok(Value::Array(results))
    }

    /// Walk the translation fallback chain until one strategy succeeds.
    async fn translate(
        &self,
        ctx: &ExecutionContext,
        strategy: TranslateStrategy,
        target_lang: &str,
    ) -> Value {
        let target = ctx.resolve_text(target_lang);
        let mut attempted = Vec::new();
        for candidate in strategy.fallback_chain() {
            attempted.push(candidate.as_str());
            match self.platform.translate(candidate, &target).await {
                Ok(()) => {
                    return json!({ "success": true, "method": candidate.as_str() });
                }
                Err(err) => {
                    debug!(method = candidate.as_str(), error = %err, "translate strategy failed");
                }
            }
        }
        json!({
            "success": false,
            "attempted": attempted,
            "error": "all translation strategies failed",
        })
    }

    async fn start_process(
        &self,
        ctx: &mut ExecutionContext,
        process: &ProcessId,
        body: &[Step],
        interval_ms: Option<u64>,
    ) -> Result<(), FlowError> {
        if self.processes.contains(process) {
            return Err(FlowError::ProcessExists(process.0.clone()));
        }

        let handle = match interval_ms {
            Some(interval) => {
                // re-run the body on a timer with a snapshot of this
                // invocation's state; the task belongs to the table, not
                // to the invocation that started it
                let interpreter = self.clone();
                let body = body.to_vec();
                let agent = Arc::clone(&ctx.agent);
                let config = Arc::clone(&ctx.config);
                let vars = ctx.vars.clone();
                let session = ctx.session.clone();
                let id = process.0.clone();
                Some(tokio::spawn(async move {
                    loop {
                        sleep(Duration::from_millis(interval)).await;
                        let mut bg_ctx = ExecutionContext::new(
                            Arc::clone(&agent),
                            vars.clone(),
                            Arc::clone(&config),
                            session.clone(),
                        );
                        if let Err(err) = interpreter.execute_steps(&body, &mut bg_ctx).await {
                            warn!(process = %id, error = %err, "background body failed");
                        }
                    }
                }))
            }
            None => {
                // one-shot: the body runs once, inline; the record stays
                // for its cleanup contract
                if let ListOutcome::Returned(_) = self.execute_steps(body, ctx).await? {
                    debug!(process = %process, "one-shot body returned early");
                }
                None
            }
        };

        self.processes.insert(ProcessEntry {
            id: process.clone(),
            cleanup: None,
            handle,
        });
        Ok(())
    }

    async fn stop_process(
        &self,
        ctx: &mut ExecutionContext,
        process: &ProcessId,
    ) -> Result<(), FlowError> {
        let entry = self
            .processes
            .remove(process)
            .ok_or_else(|| FlowError::UnknownProcess(process.0.clone()))?;

        // cleanup runs before the native handle is released
        if let Some(cleanup) = entry.cleanup {
            self.execute_steps(&cleanup, ctx).await?;
        }
        if let Some(handle) = entry.handle {
            handle.abort();
        }
        info!(process = %process, "process stopped");
        Ok(())
    }
}

/// Step discriminant used in reports and logs.
fn step_kind(step: &Step) -> &'static str {
    match step {
        Step::Click { .. } => "click",
        Step::FillInput { .. } => "fill_input",
        Step::GetText { .. } => "get_text",
        Step::GetAttribute { .. } => "get_attribute",
        Step::RemoveElement { .. } => "remove_element",
        Step::ModifyStyle { .. } => "modify_style",
        Step::ScrollTo { .. } => "scroll_to",
        Step::RestoreScroll { .. } => "restore_scroll",
        Step::RunScript { .. } => "run_script",
        Step::InspectPage { .. } => "inspect_page",
        Step::AnalyzePage { .. } => "analyze_page",
        Step::RequestOperations { .. } => "request_operations",
        Step::ExecuteOperations { .. } => "execute_operations",
        Step::CallClient { .. } => "call_client",
        Step::If { .. } => "if",
        Step::ForEach { .. } => "for_each",
        Step::While { .. } => "while",
        Step::Wait { .. } => "wait",
        Step::WaitFor { .. } => "wait_for",
        Step::SetVariable { .. } => "set_variable",
        Step::GetVariable { .. } => "get_variable",
        Step::TransformVariable { .. } => "transform_variable",
        Step::MergeVariables { .. } => "merge_variables",
        Step::StorageGet { .. } => "storage_get",
        Step::StorageSet { .. } => "storage_set",
        Step::OpenTab { .. } => "open_tab",
        Step::Notify { .. } => "notify",
        Step::Translate { .. } => "translate",
        Step::StartProcess { .. } => "start_process",
        Step::StopProcess { .. } => "stop_process",
        Step::RegisterCleanup { .. } => "register_cleanup",
        Step::Return { .. } => "return",
    }
}

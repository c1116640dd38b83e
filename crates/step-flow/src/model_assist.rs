//! Prompt construction for model-assist steps.

use op_gate::OperationGate;

/// Build the strict prompt for a request-operations step: the effective
/// allowed operations with their signatures, the required output shape,
/// the goal, and optional page context.
pub fn build_operations_prompt(gate: &OperationGate, goal: &str, context: Option<&str>) -> String {
    let mut prompt = String::from(
        "You control a web page through a fixed set of allowed operations. \
         You must not propose anything outside this list.\n\nAllowed operations:\n",
    );
    for schema in gate.allowed_schemas() {
        prompt.push_str("- ");
        prompt.push_str(&schema.signature());
        prompt.push('\n');
    }
    prompt.push_str(
        "\nRespond with ONLY a JSON array, no prose, in exactly this shape:\n\
         [{\"operation\": \"<name>\", \"parameters\": {<declared parameters only>}, \
         \"reason\": \"<one sentence>\", \"priority\": <number, 1 runs first>}]\n",
    );
    prompt.push_str("\nGoal: ");
    prompt.push_str(goal);
    if let Some(context) = context {
        prompt.push_str("\n\nPage context:\n");
        prompt.push_str(context);
    }
    prompt
}

//! Condition tree for `If`/`While` steps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed condition vocabulary. Unknown tags fail deserialization, which
/// the interpreter treats as a broken definition.
///
/// Operand values may contain `{{name}}` templates; the evaluator resolves
/// them before comparing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Condition {
    /// The named variable is bound.
    Exists { var: String },

    /// Resolved operands are equal.
    Equals { left: Value, right: Value },

    /// Both operands resolve to numbers and left > right.
    GreaterThan { left: Value, right: Value },

    /// Both operands resolve to numbers and left < right.
    LessThan { left: Value, right: Value },

    /// Array membership, substring, or object key membership.
    Contains { source: Value, value: Value },

    /// Null, unbound, empty string, empty array, or empty object.
    IsEmpty { value: Value },

    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

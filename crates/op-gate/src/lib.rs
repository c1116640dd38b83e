//! The operation gate: the trust boundary of the execution core.
//!
//! Model output never reaches the page directly. It is recovered into a
//! batch of candidate operations, each candidate is matched against a
//! static hand-curated whitelist with per-parameter validation and
//! sanitization, and only the surviving operations are eligible for the
//! bridge's narrow capability surface.

pub mod parse;
pub mod sanitize;
pub mod schema;
pub mod validator;

pub use parse::parse_operations_from_response;
pub use sanitize::sanitize_selector;
pub use schema::{static_operation_names, static_schema, OperationSchema, ParamSchema, ParamType};
pub use validator::{BatchOutcome, InvalidOperation, OperationGate, OperationIssue};

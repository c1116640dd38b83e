//! Value layer of the execution core.
//!
//! Resolves `{{name}}` templates against a variable scope, evaluates
//! condition trees, and applies the fixed transform vocabulary. Everything
//! here is pure over `serde_json::Value`, the closed value sum the whole
//! core pattern-matches on.

pub mod conditions;
pub mod errors;
pub mod resolve;
pub mod transforms;

pub use conditions::evaluate;
pub use errors::ValueError;
pub use resolve::{resolve, Scope};
pub use transforms::apply;

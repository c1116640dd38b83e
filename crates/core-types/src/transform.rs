//! Transform vocabulary for data steps.

use serde::{Deserialize, Serialize};

/// The ten fixed transform kinds.
///
/// All are pure; only `ParseNumber` and `ParseJson` can fail, and that
/// failure propagates as an interpreter error rather than being swallowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Transform {
    Uppercase,
    Lowercase,
    Trim,
    Split { separator: String },
    Join { separator: String },
    ParseNumber,
    ParseJson,
    ToJson,
    Length,
    GetProperty { path: String },
}

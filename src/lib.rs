//! CLI wiring for the agentry execution core.
//!
//! The heavy lifting lives in the workspace crates; this crate builds a
//! registry out of local collaborator implementations and loads
//! definitions from a directory.

pub mod runtime;

pub use runtime::{
    build_registry, load_definitions, EnvCredentialStore, LocalPlatform, UnattachedDom,
    UnconfiguredModel,
};

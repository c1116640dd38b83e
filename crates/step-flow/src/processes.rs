//! The process table.
//!
//! Processes are named, explicitly-lifecycled resources. They are created
//! by a start step, stopped only by a stop step, and never torn down by a
//! parent invocation ending. The table is shared across invocations and
//! must tolerate interleaved access.

use agentry_core_types::{ProcessId, Step};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

/// One live process record.
#[derive(Debug)]
pub struct ProcessEntry {
    pub id: ProcessId,
    pub cleanup: Option<Vec<Step>>,
    /// Timer task for interval processes; one-shot processes have none.
    pub handle: Option<JoinHandle<()>>,
}

/// Registry of live processes, keyed by their author-chosen id.
#[derive(Debug, Default)]
pub struct ProcessTable {
    entries: DashMap<String, ProcessEntry>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ProcessId) -> bool {
        self.entries.contains_key(&id.0)
    }

    pub fn insert(&self, entry: ProcessEntry) {
        debug!(process = %entry.id, "process registered");
        self.entries.insert(entry.id.0.clone(), entry);
    }

    /// Attach (replace) the cleanup step list of an existing process.
    pub fn set_cleanup(&self, id: &ProcessId, steps: Vec<Step>) -> bool {
        match self.entries.get_mut(&id.0) {
            Some(mut entry) => {
                entry.cleanup = Some(steps);
                true
            }
            None => false,
        }
    }

    /// Remove and return a process record; the caller runs cleanup and
    /// releases the handle.
    pub fn remove(&self, id: &ProcessId) -> Option<ProcessEntry> {
        self.entries.remove(&id.0).map(|(_, entry)| entry)
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! # Active-probe table.
//!
//! Authoritative set of running probe instances, keyed by name. Owned by the
//! manager and only touched while its lock is held.
//!
//! ## Rules
//! - At most one entry per name
//! - An entry is inserted **before** its run task is launched; the join handle is
//!   attached right after
//! - Removal hands the entry to the stop path, which cancels and closes it

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::runner::RunOutcome;
use crate::probes::ProbeRef;

/// Handle to one running probe.
pub(crate) struct ActiveProbe {
    /// Live instance.
    pub probe: ProbeRef,
    /// Child of the manager's root token; cancelling it stops `run`.
    pub cancel: CancellationToken,
    /// Run task, once launched.
    pub join: Option<JoinHandle<RunOutcome>>,
}

impl ActiveProbe {
    pub fn new(probe: ProbeRef, cancel: CancellationToken) -> Self {
        Self {
            probe,
            cancel,
            join: None,
        }
    }
}

#[derive(Default)]
pub(crate) struct ActiveTable {
    entries: HashMap<String, ActiveProbe>,
}

impl ActiveTable {
    /// Inserts an entry; returns `false` (and leaves the table alone) if the name is taken.
    pub fn insert(&mut self, name: &str, entry: ActiveProbe) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_string(), entry);
        true
    }

    /// Attaches the run task to an existing entry.
    pub fn attach(&mut self, name: &str, join: JoinHandle<RunOutcome>) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.join = Some(join);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ActiveProbe> {
        self.entries.remove(name)
    }

    /// Removes every entry, sorted by name.
    pub fn drain(&mut self) -> Vec<(String, ActiveProbe)> {
        let mut all: Vec<(String, ActiveProbe)> = self.entries.drain().collect();
        all.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Sorted names of active probes.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

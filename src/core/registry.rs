//! # Probe registry - name → factory lookup table.
//!
//! [`ProbeRegistry`] has no lifecycle logic. Registering under an existing name
//! replaces the earlier factory (last write wins); the return value tells the caller
//! whether that happened.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use probevisor::{HeartbeatProbe, ProbeRegistry};
//!
//! let mut registry = ProbeRegistry::new();
//! registry.register(HeartbeatProbe::NAME, HeartbeatProbe::factory(Duration::from_secs(10)));
//!
//! assert!(registry.contains("heartbeat"));
//! assert_eq!(registry.names(), vec!["heartbeat".to_string()]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::probes::{ProbeFactory, ProbeRef};

/// Name-keyed probe factories.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    factories: HashMap<String, ProbeFactory>,
}

impl ProbeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`.
    ///
    /// Returns `true` if an earlier factory was replaced.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn() -> ProbeRef + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(factory))
    }

    /// Registers an already shared factory. Returns `true` if one was replaced.
    pub fn insert(&mut self, name: impl Into<String>, factory: ProbeFactory) -> bool {
        self.factories.insert(name.into(), factory).is_some()
    }

    /// Looks up the factory for `name`.
    pub fn get(&self, name: &str) -> Option<&ProbeFactory> {
        self.factories.get(name)
    }

    /// True if `name` has a factory.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns sorted registered names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Iterates `(name, factory)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProbeFactory)> {
        self.factories.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("names", &self.names())
            .finish()
    }
}

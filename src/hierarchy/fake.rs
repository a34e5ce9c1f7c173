//! In-memory hierarchy source for tests.

use crate::error::BoxError;
use crate::hierarchy::{Hierarchy, HierarchySource};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Serves preloaded hierarchies and counts fetches per id.
///
/// Unknown ids fail like a 404 from the real service; ids registered with
/// [`with_failing`](Self::with_failing) fail like an unreachable service.
#[derive(Clone, Default)]
pub struct FakeHierarchySource {
    hierarchies: HashMap<String, Hierarchy>,
    failing: HashSet<String>,
    fetches: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeHierarchySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `hierarchy` under its own id.
    #[must_use]
    pub fn with_hierarchy(mut self, hierarchy: Hierarchy) -> Self {
        self.hierarchies.insert(hierarchy.id.clone(), hierarchy);
        self
    }

    /// Make every fetch of `hierarchy_id` fail.
    #[must_use]
    pub fn with_failing(mut self, hierarchy_id: impl Into<String>) -> Self {
        self.failing.insert(hierarchy_id.into());
        self
    }

    /// How many times `hierarchy_id` was requested.
    ///
    /// # Panics
    ///
    /// Panics if the counter mutex is poisoned.
    #[must_use]
    pub fn fetch_count(&self, hierarchy_id: &str) -> usize {
        self.fetches
            .lock()
            .expect("fetch counter mutex poisoned")
            .get(hierarchy_id)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of requests across all ids.
    ///
    /// # Panics
    ///
    /// Panics if the counter mutex is poisoned.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.fetches
            .lock()
            .expect("fetch counter mutex poisoned")
            .values()
            .sum()
    }
}

impl HierarchySource for FakeHierarchySource {
    fn fetch_hierarchy(&self, hierarchy_id: &str) -> Result<Hierarchy, BoxError> {
        *self
            .fetches
            .lock()
            .expect("fetch counter mutex poisoned")
            .entry(hierarchy_id.to_string())
            .or_insert(0) += 1;

        if self.failing.contains(hierarchy_id) {
            return Err(format!("connection refused while fetching {hierarchy_id}").into());
        }
        self.hierarchies
            .get(hierarchy_id)
            .cloned()
            .ok_or_else(|| format!("hierarchy {hierarchy_id} not found (404)").into())
    }
}

//! Per-job hierarchy cache.

use crate::error::{TransformError, TransformResult};
use crate::hierarchy::{Hierarchy, HierarchyIndex, HierarchySource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

struct CachedHierarchy {
    hierarchy: Hierarchy,
    index: HierarchyIndex,
}

/// Fetches hierarchies on first use and keeps them for the resolver's lifetime.
///
/// Build one resolver per job and drop it afterwards; nothing is shared across jobs.
/// Hierarchy ids and codes are trimmed before lookup.
pub struct HierarchyResolver {
    source: Arc<dyn HierarchySource>,
    cache: HashMap<String, CachedHierarchy>,
    fetches: usize,
}

impl HierarchyResolver {
    #[must_use]
    pub fn new(source: Arc<dyn HierarchySource>) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            fetches: 0,
        }
    }

    /// Return the hierarchy, fetching and indexing it on first use.
    ///
    /// A failed fetch leaves the cache untouched, so a later call tries again.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::HierarchyFetch`] if the source fails.
    pub fn fetch(&mut self, hierarchy_id: &str) -> TransformResult<&Hierarchy> {
        let id = hierarchy_id.trim();
        if !self.cache.contains_key(id) {
            let started = Instant::now();
            self.fetches += 1;
            let hierarchy = self
                .source
                .fetch_hierarchy(id)
                .map_err(|e| TransformError::hierarchy_fetch(id, e))?;
            let index = hierarchy.index();
            for code in index.duplicates() {
                warn!(
                    hierarchy_id = id,
                    code = %code,
                    "duplicate code in hierarchy, keeping the last occurrence"
                );
            }
            debug!(
                hierarchy_id = id,
                hierarchy_type = %hierarchy.kind,
                entries = index.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "hierarchy fetched"
            );
            self.cache
                .insert(id.to_string(), CachedHierarchy { hierarchy, index });
        }
        Ok(&self.cache[id].hierarchy)
    }

    /// Display name of `code` within the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::HierarchyFetch`] if the hierarchy cannot be fetched and
    /// [`TransformError::HierarchyCodeNotFound`] if it has no entry for `code`.
    pub fn resolve_value(&mut self, hierarchy_id: &str, code: &str) -> TransformResult<&str> {
        let id = hierarchy_id.trim();
        self.fetch(id)?;
        let code = code.trim();
        self.cache[id]
            .index
            .get(code)
            .map(|entry| entry.name.as_str())
            .ok_or_else(|| TransformError::HierarchyCodeNotFound {
                hierarchy_id: id.to_string(),
                code: code.to_string(),
            })
    }

    /// Number of lookups issued against the source so far.
    #[must_use]
    pub const fn fetch_count(&self) -> usize {
        self.fetches
    }
}

//! Hierarchies: typed code trees used to turn a short code into a display value.
//!
//! A [`Hierarchy`] is fetched from a [`HierarchySource`] as JSON:
//!
//! ```json
//! { "id": "CL_0000641", "name": "Geography", "type": "geography",
//!   "options": [ { "code": "K02000001", "name": "United Kingdom",
//!                  "levelType": { "code": "CTRY", "name": "Country", "level": 0 },
//!                  "options": [ { "code": "E92000001", "name": "England" } ] } ] }
//! ```
//!
//! [`Hierarchy::index`] flattens the entry forest into a code lookup table. The
//! [`HierarchyResolver`] caches one indexed hierarchy per id for the lifetime of a job.

pub mod fake;
#[cfg_attr(docsrs, doc(cfg(feature = "http-hierarchy")))]
#[cfg(feature = "http-hierarchy")]
pub mod http;
pub mod resolver;

pub use fake::FakeHierarchySource;
#[cfg(feature = "http-hierarchy")]
pub use http::HttpHierarchySource;
pub use resolver::HierarchyResolver;

use crate::error::BoxError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Hierarchy type whose dimensions never emit a resolved value column.
pub const TIME_HIERARCHY_TYPE: &str = "time";

/// A named, typed tree of codable entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Type tag, e.g. `"time"` or `"geography"`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<HierarchyEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyEntry {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_type: Option<LevelType>,
    /// Set only for sparsely populated hierarchies.
    #[serde(default)]
    pub has_data: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<HierarchyEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelType {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub level: i32,
}

/// Flat view of one entry, without its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    pub name: String,
    pub has_data: bool,
    pub level_type: Option<LevelType>,
}

/// Code lookup table built from a [`Hierarchy`].
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    entries: HashMap<String, IndexedEntry>,
    duplicates: Vec<String>,
}

impl HierarchyIndex {
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&IndexedEntry> {
        self.entries.get(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Codes that occur more than once in the tree, in first-repeat order.
    #[must_use]
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    fn visit(&mut self, entries: &[HierarchyEntry]) {
        for entry in entries {
            let indexed = IndexedEntry {
                name: entry.name.clone(),
                has_data: entry.has_data,
                level_type: entry.level_type.clone(),
            };
            match self.entries.entry(entry.code.clone()) {
                Entry::Occupied(mut slot) => {
                    if !self.duplicates.contains(&entry.code) {
                        self.duplicates.push(entry.code.clone());
                    }
                    slot.insert(indexed);
                }
                Entry::Vacant(slot) => {
                    slot.insert(indexed);
                }
            }
            self.visit(&entry.options);
        }
    }
}

impl Hierarchy {
    /// Whether dimensions of this hierarchy suppress their resolved value.
    #[must_use]
    pub fn is_time(&self) -> bool {
        self.kind == TIME_HIERARCHY_TYPE
    }

    /// Flatten the entry forest depth-first (pre-order).
    ///
    /// When a code occurs more than once, the last visited occurrence wins and the code is
    /// reported in [`HierarchyIndex::duplicates`].
    #[must_use]
    pub fn index(&self) -> HierarchyIndex {
        let mut index = HierarchyIndex::default();
        index.visit(&self.options);
        index
    }
}

/// Where hierarchies come from.
pub trait HierarchySource: Send + Sync {
    /// Fetch the hierarchy with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or the payload cannot be parsed.
    fn fetch_hierarchy(&self, hierarchy_id: &str) -> Result<Hierarchy, BoxError>;
}

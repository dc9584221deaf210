// Tag routing policy
//
// Both structures are built once from configuration and only read afterwards.

use std::collections::{HashMap, HashSet};

/// Matches every base path in [`IgnoredMetrics`].
pub const IGNORE_ALL: &str = "*";

/// Tags promoted to their own output columns.
///
/// Column order is the registration order and fixes the row layout for the
/// lifetime of the parser. Tag names are expected to be unique; a repeated
/// tag routes to its last registered column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedicatedTags {
    slots: HashMap<String, usize>,
    columns: Vec<String>,
}

impl DedicatedTags {
    pub fn new<I, T, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: Into<String>,
        C: Into<String>,
    {
        let mut dedicated = Self::default();
        for (tag, column) in pairs {
            dedicated.slots.insert(tag.into(), dedicated.columns.len());
            dedicated.columns.push(column.into());
        }
        dedicated
    }

    /// Output slot for `tag`, or `None` when the tag is generic.
    pub fn classify(&self, tag: &str) -> Option<usize> {
        self.slots.get(tag).copied()
    }

    pub fn column_for(&self, tag: &str) -> Option<&str> {
        self.classify(tag).map(|slot| self.columns[slot].as_str())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Base paths for which only the `__name__` index row is emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredMetrics {
    all: bool,
    paths: HashSet<String>,
}

impl IgnoredMetrics {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ignored = Self::default();
        for path in paths {
            let path = path.into();
            if path == IGNORE_ALL {
                ignored.all = true;
            } else {
                ignored.paths.insert(path);
            }
        }
        ignored
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Whether tags other than `__name__` skip index-row generation for `path`.
    pub fn index_name_only(&self, path: &str) -> bool {
        self.all || self.paths.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.paths.is_empty()
    }
}

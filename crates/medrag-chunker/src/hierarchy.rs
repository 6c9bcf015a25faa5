//! Section ancestry: parent resolution while parsing and context headers afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};

use medrag_core::SectionRecord;

/// Tracks the most recently opened section at each depth during one parse pass.
///
/// Ancestry follows document order, not numeric labels: a section's parent is
/// the latest section opened at a shallower depth that has not been closed out
/// by a sibling or a shallower section since.
#[derive(Debug, Default)]
pub struct HierarchyTracker {
    last_seen_at_level: BTreeMap<usize, String>,
}

impl HierarchyTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened section and return its parent's unique id.
    ///
    /// Entries at `level` and deeper are purged before the parent is resolved,
    /// so a stale deep branch can never become the parent of a later section.
    pub fn open(&mut self, level: usize, unique_id: &str) -> Option<String> {
        drop(self.last_seen_at_level.split_off(&level));

        let parent = self
            .last_seen_at_level
            .values()
            .next_back()
            .cloned();

        self.last_seen_at_level
            .insert(level, unique_id.to_string());
        parent
    }

    /// Forget all recorded sections.
    pub fn reset(&mut self) {
        self.last_seen_at_level.clear();
    }
}

/// Read-only view of parsed sections keyed by unique id.
pub struct SectionTree<'a> {
    by_id: HashMap<&'a str, &'a SectionRecord>,
}

impl<'a> SectionTree<'a> {
    pub fn new(records: &'a [SectionRecord]) -> Self {
        let by_id = records
            .iter()
            .map(|record| (record.unique_id.as_str(), record))
            .collect();
        Self { by_id }
    }

    pub fn get(&self, unique_id: &str) -> Option<&'a SectionRecord> {
        self.by_id.get(unique_id).copied()
    }

    /// Parent record of `record`, if it is present in the tree.
    pub fn parent_of(&self, record: &SectionRecord) -> Option<&'a SectionRecord> {
        record
            .parent_unique_id
            .as_deref()
            .and_then(|id| self.get(id))
    }

    /// `record` followed by its ancestors, leaf first.
    ///
    /// Stops at a root, a dangling parent pointer, or a revisited node.
    pub fn ancestry<'r>(&self, record: &'r SectionRecord) -> Vec<&'r SectionRecord>
    where
        'a: 'r,
    {
        let mut path = vec![record];
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(record.unique_id.as_str());

        let mut current = record;
        while let Some(parent) = self.parent_of(current) {
            if !visited.insert(parent.unique_id.as_str()) {
                tracing::warn!(
                    section = %record.unique_id,
                    revisited = %parent.unique_id,
                    "cycle in section ancestry"
                );
                break;
            }
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Breadcrumb of ancestor titles, e.g. `[Root > Mid > Leaf]`.
    pub fn context_header(&self, record: &SectionRecord, max_title_chars: usize) -> String {
        let titles: Vec<String> = self
            .ancestry(record)
            .into_iter()
            .rev()
            .map(|section| short_title(&section.title, max_title_chars))
            .collect();
        format!("[{}]", titles.join(" > "))
    }
}

/// Title up to its first colon, trimmed and truncated to `max_chars` characters.
fn short_title(title: &str, max_chars: usize) -> String {
    let head = title.split(':').next().unwrap_or_default().trim();
    head.chars().take(max_chars).collect()
}

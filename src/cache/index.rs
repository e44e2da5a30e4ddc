//! Index Module
//!
//! Tracks every live key, its record, and its group membership.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::Serialize;

use crate::cache::IndexRecord;

// == Index Snapshot ==
/// Serializable view of the index: all keys plus each group's keys.
///
/// Keys are ordered most recently stored first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSnapshot {
    pub all: Vec<String>,
    pub groups: BTreeMap<String, Vec<String>>,
}

// == Global Index ==
/// Keys are stored in VecDeques where the front is the most recently stored.
#[derive(Debug, Default)]
pub struct GlobalIndex {
    /// Live keys by recency of store
    all: VecDeque<String>,
    /// Group name to member keys
    groups: HashMap<String, VecDeque<String>>,
    /// One record per live key
    records: HashMap<String, IndexRecord>,
}

impl GlobalIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Registers a freshly stored key.
    ///
    /// Re-registering a key replaces its record, moves it to the front, and
    /// drops it from whatever group it belonged to before.
    pub fn register(&mut self, record: IndexRecord) {
        let key = record.key.clone();
        self.unlink(&key);

        self.all.push_front(key.clone());
        if let Some(group) = &record.group {
            self.groups
                .entry(group.clone())
                .or_default()
                .push_front(key.clone());
        }
        self.records.insert(key, record);
    }

    // == Forget ==
    /// Removes a key from `all` and from every group.
    ///
    /// Groups left empty are dropped. Returns the removed record, if any.
    pub fn forget(&mut self, key: &str) -> Option<IndexRecord> {
        self.unlink(key);
        self.records.remove(key)
    }

    fn unlink(&mut self, key: &str) {
        self.all.retain(|k| k != key);
        self.groups.retain(|_, members| {
            members.retain(|k| k != key);
            !members.is_empty()
        });
    }

    // == Keys Of ==
    /// Returns a group's keys, or None if the group does not exist.
    pub fn keys_of(&self, group: &str) -> Option<Vec<String>> {
        self.groups
            .get(group)
            .map(|members| members.iter().cloned().collect())
    }

    // == Drop Group ==
    /// Removes a group and forgets every key in it.
    ///
    /// Returns the forgotten keys, or None if the group does not exist.
    pub fn drop_group(&mut self, group: &str) -> Option<Vec<String>> {
        let members: Vec<String> = self.groups.remove(group)?.into_iter().collect();
        for key in &members {
            self.forget(key);
        }
        Some(members)
    }

    // == Reset ==
    /// Clears all keys, groups, and records.
    pub fn reset(&mut self) {
        self.all.clear();
        self.groups.clear();
        self.records.clear();
    }

    // == Lookups ==
    pub fn record(&self, key: &str) -> Option<&IndexRecord> {
        self.records.get(key)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// All live keys, most recent first.
    pub fn keys(&self) -> Vec<String> {
        self.all.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            all: self.keys(),
            groups: self
                .groups
                .iter()
                .map(|(name, members)| (name.clone(), members.iter().cloned().collect()))
                .collect(),
        }
    }
}

mod changes;

use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
};

use bytes::Bytes;

pub use changes::Changes;

/// Represents the state of an entry in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState<T> {
    /// The entry has been added/modified in our snapshot
    Stored(T),
    /// The entry has been deleted in our snapshot
    Deleted,
    /// The entry is not present in our snapshot, must fallback on disk
    Absent,
}

/// Snapshot is a transactional batch of changes that can be committed or rolled back.
/// It holds a set of pending changes per column.
#[derive(Debug, Clone)]
pub struct Snapshot<C: Hash + Eq> {
    pub trees: HashMap<C, Changes>,
}

impl<C: Hash + Eq> Default for Snapshot<C> {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }
}

impl<C: Hash + Eq + Copy> Snapshot<C> {
    pub fn insert<K: Into<Bytes>, V: Into<Bytes>>(
        &mut self,
        column: C,
        key: K,
        value: V,
    ) -> EntryState<Bytes> {
        self.trees.entry(column).or_default().insert(key, value)
    }

    pub fn delete<K: Into<Bytes>>(&mut self, column: C, key: K) -> EntryState<Bytes> {
        self.trees.entry(column).or_default().remove(key)
    }

    pub fn get<K: AsRef<[u8]>>(&self, column: C, key: K) -> EntryState<&Bytes> {
        match self.trees.get(&column) {
            Some(changes) => changes.get(key),
            None => EntryState::Absent,
        }
    }

    /// Merge the entries read from disk with our pending changes.
    /// Deleted keys are dropped, stored keys override or extend the disk entries.
    pub fn overlay_prefix(
        &self,
        column: C,
        prefix: &[u8],
        disk: Vec<(Bytes, Bytes)>,
    ) -> Vec<(Bytes, Bytes)> {
        let Some(changes) = self.trees.get(&column) else {
            return disk;
        };

        let mut merged: BTreeMap<Bytes, Bytes> = disk.into_iter().collect();
        for (key, value) in changes.with_prefix(prefix) {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }

    pub fn into_parts(self) -> HashMap<C, Changes> {
        self.trees
    }
}

use std::collections::{
    btree_map::{Entry, IntoIter},
    BTreeMap,
};

use bytes::Bytes;

use super::EntryState;

/// Pending write operations for a single column, applied to disk
/// only when the snapshot is committed.
#[derive(Clone, Debug, Default)]
pub struct Changes {
    pub writes: BTreeMap<Bytes, Option<Bytes>>,
}

impl Changes {
    /// Set a key to a new value.
    /// Returns the previous value state if any.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> EntryState<Bytes>
    where
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        match self.writes.insert(key.into(), Some(value.into())) {
            Some(Some(prev)) => EntryState::Stored(prev),
            Some(None) => EntryState::Deleted,
            None => EntryState::Absent,
        }
    }

    /// Remove a key.
    /// Returns the previous value state if any.
    pub fn remove<K>(&mut self, key: K) -> EntryState<Bytes>
    where
        K: Into<Bytes>,
    {
        match self.writes.entry(key.into()) {
            Entry::Occupied(mut entry) => match entry.get_mut().take() {
                Some(v) => EntryState::Stored(v),
                None => EntryState::Deleted,
            },
            Entry::Vacant(v) => {
                v.insert(None);
                EntryState::Absent
            }
        }
    }

    /// State of a key in this batch
    pub fn get<K>(&self, key: K) -> EntryState<&Bytes>
    where
        K: AsRef<[u8]>,
    {
        match self.writes.get(key.as_ref()) {
            Some(Some(value)) => EntryState::Stored(value),
            Some(None) => EntryState::Deleted,
            None => EntryState::Absent,
        }
    }

    /// Pending writes whose key starts with `prefix`, in key order
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a Bytes, &'a Option<Bytes>)> + 'a {
        self.writes
            .range::<[u8], _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
    }
}

impl IntoIterator for Changes {
    type Item = (Bytes, Option<Bytes>);
    type IntoIter = IntoIter<Bytes, Option<Bytes>>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

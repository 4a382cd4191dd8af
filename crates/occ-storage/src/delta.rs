use std::collections::{
    btree_map,
    BTreeMap,
};

use crate::{
    merge::{
        MergeIter,
        Overlay,
    },
    Error,
    KeyRange,
    Order,
    StateIter,
    StateRead,
    StateWrite,
};

/// A set of puts (`Some`) and deletes (`None`), ordered by key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changeset {
    changes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Changeset {
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.changes.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.changes.insert(key, None);
    }

    /// `None` if `key` is untouched, `Some(None)` if it was deleted.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.changes.get(key).map(Option::as_deref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Option<Vec<u8>>> {
        self.changes.iter()
    }

    /// Overlays `other` on top of `self`.
    pub fn extend(&mut self, other: Changeset) {
        self.changes.extend(other.changes);
    }

    /// Writes every change into `state`.
    pub fn apply_to<S: StateWrite + ?Sized>(self, state: &mut S) {
        for (key, value) in self.changes {
            match value {
                Some(value) => state.put_raw(key, value),
                None => state.delete(key),
            }
        }
    }

    pub(crate) fn overlay(&self, range: &KeyRange) -> Vec<(Vec<u8>, Overlay, ())> {
        if range.is_degenerate() {
            return Vec::new();
        }
        self.changes
            .range::<[u8], _>(range.as_bounds())
            .map(|(key, value)| {
                let entry = match value {
                    Some(value) => Overlay::Value(value.clone()),
                    None => Overlay::Deleted,
                };
                (key.clone(), entry, ())
            })
            .collect()
    }
}

impl IntoIterator for Changeset {
    type IntoIter = btree_map::IntoIter<Vec<u8>, Option<Vec<u8>>>;
    type Item = (Vec<u8>, Option<Vec<u8>>);

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl FromIterator<(Vec<u8>, Option<Vec<u8>>)> for Changeset {
    fn from_iter<I: IntoIterator<Item = (Vec<u8>, Option<Vec<u8>>)>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// A write cache on top of `S`.
///
/// Reads see the cached writes first. Nothing reaches `S` until the caller takes the
/// [`Changeset`] out with [`StateDelta::into_changeset`] and applies it.
pub struct StateDelta<S> {
    parent: S,
    changes: Changeset,
}

impl<S: StateRead> StateDelta<S> {
    pub fn new(parent: S) -> Self {
        Self {
            parent,
            changes: Changeset::default(),
        }
    }

    pub fn parent(&self) -> &S {
        &self.parent
    }

    pub fn changes(&self) -> &Changeset {
        &self.changes
    }

    #[must_use]
    pub fn into_changeset(self) -> Changeset {
        self.changes
    }

    #[must_use]
    pub fn into_parts(self) -> (S, Changeset) {
        (self.parent, self.changes)
    }
}

impl<S: StateRead> StateRead for StateDelta<S> {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match self.changes.get(key) {
            Some(value) => Ok(value.map(<[u8]>::to_vec)),
            None => self.parent.get_raw(key),
        }
    }

    fn iter_raw(&self, range: KeyRange, order: Order) -> Result<StateIter<'_>, Error> {
        let overlay = self.changes.overlay(&range);
        let parent = self.parent.iter_raw(range, order)?;
        Ok(Box::new(
            MergeIter::new(parent, overlay, order)
                .map(|entry| entry.map(|(key, value, _)| (key, value))),
        ))
    }
}

impl<S: StateRead> StateWrite for StateDelta<S> {
    fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.changes.put(key, value);
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.changes.delete(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Storage;

    fn storage_with(entries: &[(&str, &str)]) -> Storage {
        let storage = Storage::new();
        storage.commit(
            entries
                .iter()
                .map(|(k, v)| (k.as_bytes().to_vec(), Some(v.as_bytes().to_vec())))
                .collect(),
        );
        storage
    }

    #[test]
    fn reads_see_cached_writes_and_deletes() {
        let storage = storage_with(&[("a", "1"), ("b", "2")]);
        let mut delta = StateDelta::new(storage.latest_snapshot());
        delta.put_raw(b"a".to_vec(), b"10".to_vec());
        delta.delete(b"b".to_vec());

        assert_eq!(Some(b"10".to_vec()), delta.get_raw(b"a").unwrap());
        assert_eq!(None, delta.get_raw(b"b").unwrap());
        assert_eq!(
            Some(b"1".to_vec()),
            storage.latest_snapshot().get_raw(b"a").unwrap()
        );
    }

    #[test]
    fn nested_delta_is_discarded_unless_applied() {
        let storage = storage_with(&[("a", "1")]);
        let mut outer = StateDelta::new(storage.latest_snapshot());

        let mut dropped = StateDelta::new(&outer);
        dropped.put_raw(b"a".to_vec(), b"2".to_vec());
        drop(dropped);
        assert_eq!(Some(b"1".to_vec()), outer.get_raw(b"a").unwrap());

        let mut applied = StateDelta::new(&outer);
        applied.put_raw(b"a".to_vec(), b"3".to_vec());
        let changes = applied.into_changeset();
        changes.apply_to(&mut outer);
        assert_eq!(Some(b"3".to_vec()), outer.get_raw(b"a").unwrap());
    }

    #[test]
    fn iteration_merges_cache_with_parent() {
        let storage = storage_with(&[("k/1", "a"), ("k/2", "b"), ("k/3", "c")]);
        let mut delta = StateDelta::new(storage.latest_snapshot());
        delta.delete(b"k/2".to_vec());
        delta.put_raw(b"k/4".to_vec(), b"d".to_vec());

        let keys: Vec<_> = delta
            .prefix_raw(b"k/")
            .unwrap()
            .map(|entry| String::from_utf8(entry.unwrap().0).unwrap())
            .collect();
        assert_eq!(vec!["k/1", "k/3", "k/4"], keys);
    }
}

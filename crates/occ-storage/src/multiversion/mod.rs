//! The multi-version store used to execute the transactions of a block in parallel.
//!
//! Every transaction writes into its own version of each key. A transaction with
//! index `i` sees the versions of transactions `< i` on top of the parent state and
//! never sees versions of later transactions. When a transaction is invalidated its
//! versions turn into estimates; any reader that runs into an estimate aborts
//! (see [`crate::Error::EstimateAbort`]) and waits for the writer to re-execute.
use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
};

use parking_lot::RwLock;
use tracing::trace;

use crate::{
    merge::Overlay,
    Changeset,
    Error,
    Incarnation,
    KeyRange,
    Order,
    StateRead,
    TxIndex,
};

mod iterator;
mod validation;
mod value;
mod view;

pub use value::{
    MultiVersionItem,
    MultiVersionValue,
};
pub use view::{
    ExecutionOutput,
    VersionIndexedStore,
};

/// Where the value returned by a read came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadSource {
    /// The parent state; no lower transaction wrote the key.
    Parent,
    /// The version written by the given incarnation of a lower transaction.
    Version {
        index: TxIndex,
        incarnation: Incarnation,
    },
    /// The reading transaction's own write.
    OwnWrite,
}

impl ReadSource {
    #[must_use]
    pub fn writer(&self) -> Option<TxIndex> {
        match self {
            Self::Version {
                index, ..
            } => Some(*index),
            Self::Parent | Self::OwnWrite => None,
        }
    }
}

/// The first read of every key a transaction read, with the source of its value.
pub type ReadSet = BTreeMap<Vec<u8>, ReadSource>;

/// A range scan performed by a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IterationRecord {
    pub range: KeyRange,
    pub order: Order,
    /// The transaction's own writes inside `range` when the scan started.
    pub own_writes: Changeset,
    /// Every key the scan yielded, in order.
    pub observed: Vec<(Vec<u8>, ReadSource)>,
    /// Whether the scan ran to the end of `range` rather than being stopped early.
    pub exhausted: bool,
}

pub type IterateSet = Vec<IterationRecord>;

/// The outcome of validating one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// The transaction read state that has changed since. `conflicts` holds the
    /// transactions responsible, which must be validated before it runs again.
    Invalid { conflicts: BTreeSet<TxIndex> },
}

impl Validation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub fn conflicts(&self) -> Option<&BTreeSet<TxIndex>> {
        match self {
            Self::Valid => None,
            Self::Invalid {
                conflicts,
            } => Some(conflicts),
        }
    }
}

#[derive(Default)]
struct Versions {
    values: BTreeMap<Vec<u8>, MultiVersionValue>,
    written: HashMap<TxIndex, (Incarnation, Vec<Vec<u8>>)>,
}

#[derive(Default)]
struct Recorded {
    readset: ReadSet,
    iterateset: IterateSet,
}

/// Versions of every key written during the block, on top of a parent state.
pub struct MultiVersionStore<S> {
    parent: S,
    versions: RwLock<Versions>,
    recorded: RwLock<HashMap<TxIndex, Recorded>>,
}

impl<S: StateRead> MultiVersionStore<S> {
    pub fn new(parent: S) -> Self {
        Self {
            parent,
            versions: RwLock::default(),
            recorded: RwLock::default(),
        }
    }

    pub fn parent(&self) -> &S {
        &self.parent
    }

    #[must_use]
    pub fn into_parent(self) -> S {
        self.parent
    }

    /// The highest version of `key` written by a transaction below `index`.
    #[must_use]
    pub fn get_latest_before_index(&self, index: TxIndex, key: &[u8]) -> Option<MultiVersionItem> {
        self.versions
            .read()
            .values
            .get(key)
            .and_then(|value| value.latest_before(index))
            .cloned()
    }

    /// Records `writes` as the writes of `index`, replacing its previous writeset.
    ///
    /// Keys the previous incarnation wrote but `writes` does not are removed.
    pub fn set_writeset(&self, index: TxIndex, incarnation: Incarnation, writes: Changeset) {
        let mut versions = self.versions.write();
        let Versions {
            values,
            written,
        } = &mut *versions;

        if let Some((_, stale_keys)) = written.remove(&index) {
            for key in stale_keys {
                if writes.get(&key).is_some() {
                    continue;
                }
                if let Some(value) = values.get_mut(&key) {
                    value.remove(index);
                    if value.is_empty() {
                        values.remove(&key);
                    }
                }
            }
        }

        let mut keys = Vec::with_capacity(writes.len());
        for (key, value) in writes {
            values
                .entry(key.clone())
                .or_default()
                .set(index, incarnation, value);
            keys.push(key);
        }
        trace!(index, incarnation, key_count = keys.len(), "set writeset");
        written.insert(index, (incarnation, keys));
    }

    /// Turns every key written by `index` into an estimate.
    pub fn invalidate_writeset(&self, index: TxIndex, incarnation: Incarnation) {
        let mut versions = self.versions.write();
        let Versions {
            values,
            written,
        } = &mut *versions;
        let Some((_, keys)) = written.get(&index) else {
            return;
        };
        for key in keys {
            values
                .entry(key.clone())
                .or_default()
                .set_estimate(index, incarnation);
        }
        trace!(index, incarnation, key_count = keys.len(), "invalidated writeset");
    }

    pub fn set_readset(&self, index: TxIndex, readset: ReadSet) {
        self.recorded.write().entry(index).or_default().readset = readset;
    }

    pub fn set_iterateset(&self, index: TxIndex, iterateset: IterateSet) {
        self.recorded.write().entry(index).or_default().iterateset = iterateset;
    }

    /// The latest version of every key written during the block.
    ///
    /// # Errors
    /// Returns [`Error::EstimateAtFlush`] if the latest version of a key is an estimate,
    /// meaning some transaction never re-executed.
    pub fn write_latest_to_store(&self) -> Result<Changeset, Error> {
        let versions = self.versions.read();
        let mut changeset = Changeset::default();
        for (key, value) in &versions.values {
            let Some(item) = value.latest() else {
                continue;
            };
            if item.is_estimate() {
                return Err(Error::estimate_at_flush(key, item.index));
            }
            match &item.value {
                Some(value) => changeset.put(key.clone(), value.clone()),
                None => changeset.delete(key.clone()),
            }
        }
        Ok(changeset)
    }

    pub(crate) fn iteration_overlay(
        &self,
        index: TxIndex,
        range: &KeyRange,
        own_writes: &Changeset,
    ) -> Vec<(Vec<u8>, Overlay, ReadSource)> {
        let versions = self.versions.read();
        iteration_overlay(&versions.values, index, range, own_writes)
    }
}

/// The versions visible to `index` inside `range`, with its own writes on top.
fn iteration_overlay(
    values: &BTreeMap<Vec<u8>, MultiVersionValue>,
    index: TxIndex,
    range: &KeyRange,
    own_writes: &Changeset,
) -> Vec<(Vec<u8>, Overlay, ReadSource)> {
    if range.is_degenerate() {
        return Vec::new();
    }
    let mut overlay: BTreeMap<Vec<u8>, (Overlay, ReadSource)> = values
        .range::<[u8], _>(range.as_bounds())
        .filter_map(|(key, value)| {
            value
                .latest_before(index)
                .map(|item| (key.clone(), (item.to_overlay(), item.source())))
        })
        .collect();
    for (key, value) in own_writes.iter() {
        if !range.contains(key) {
            continue;
        }
        let entry = match value {
            Some(value) => Overlay::Value(value.clone()),
            None => Overlay::Deleted,
        };
        overlay.insert(key.clone(), (entry, ReadSource::OwnWrite));
    }
    overlay
        .into_iter()
        .map(|(key, (entry, source))| (key, entry, source))
        .collect()
}

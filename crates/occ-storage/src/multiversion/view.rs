use std::{
    cell::RefCell,
    collections::BTreeMap,
};

use super::{
    iterator::RecordingIter,
    IterateSet,
    IterationRecord,
    MultiVersionStore,
    ReadSet,
    ReadSource,
};
use crate::{
    merge::MergeIter,
    Changeset,
    Error,
    Incarnation,
    KeyRange,
    Order,
    StateIter,
    StateRead,
    StateWrite,
    TxIndex,
};

/// Everything one incarnation of a transaction did to the multi-version store.
#[derive(Debug, Default)]
pub struct ExecutionOutput {
    pub writeset: Changeset,
    pub readset: ReadSet,
    pub iterateset: IterateSet,
    /// Set if the incarnation read an estimate; holds the writer of that estimate.
    pub abort: Option<TxIndex>,
}

#[derive(Default)]
pub(super) struct Reads {
    readset: ReadSet,
    cache: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    pub(super) iterateset: IterateSet,
    abort: Option<TxIndex>,
}

/// The state as seen by one incarnation of the transaction at `index`.
///
/// Reads resolve against the transaction's own writes, then the latest version below
/// `index`, then the parent state. Writes stay local until the scheduler publishes
/// them from the [`ExecutionOutput`] returned by [`VersionIndexedStore::finish`].
pub struct VersionIndexedStore<'a, S> {
    store: &'a MultiVersionStore<S>,
    index: TxIndex,
    incarnation: Incarnation,
    writes: Changeset,
    pub(super) reads: RefCell<Reads>,
}

impl<'a, S: StateRead> VersionIndexedStore<'a, S> {
    pub fn new(store: &'a MultiVersionStore<S>, index: TxIndex, incarnation: Incarnation) -> Self {
        Self {
            store,
            index,
            incarnation,
            writes: Changeset::default(),
            reads: RefCell::default(),
        }
    }

    #[must_use]
    pub fn index(&self) -> TxIndex {
        self.index
    }

    #[must_use]
    pub fn incarnation(&self) -> Incarnation {
        self.incarnation
    }

    /// The writer of the first estimate this incarnation ran into, if any.
    ///
    /// Once set, the incarnation is aborted even if the caller swallowed the error.
    #[must_use]
    pub fn aborted(&self) -> Option<TxIndex> {
        self.reads.borrow().abort
    }

    #[must_use]
    pub fn finish(self) -> ExecutionOutput {
        let Reads {
            readset,
            iterateset,
            abort,
            ..
        } = self.reads.into_inner();
        ExecutionOutput {
            writeset: self.writes,
            readset,
            iterateset,
            abort,
        }
    }

    pub(super) fn record_abort(&self, writer: TxIndex) {
        self.reads.borrow_mut().abort.get_or_insert(writer);
    }

    fn estimate_abort(&self, writer: TxIndex) -> Error {
        self.record_abort(writer);
        Error::EstimateAbort {
            writer,
        }
    }
}

impl<S: StateRead> StateRead for VersionIndexedStore<'_, S> {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        if let Some(value) = self.writes.get(key) {
            return Ok(value.map(<[u8]>::to_vec));
        }
        if let Some(value) = self.reads.borrow().cache.get(key) {
            return Ok(value.clone());
        }
        let (value, source) = match self.store.get_latest_before_index(self.index, key) {
            Some(item) if item.is_estimate() => return Err(self.estimate_abort(item.index)),
            Some(item) => {
                let source = item.source();
                (item.value, source)
            }
            None => (self.store.parent().get_raw(key)?, ReadSource::Parent),
        };
        let mut reads = self.reads.borrow_mut();
        reads.readset.insert(key.to_vec(), source);
        reads.cache.insert(key.to_vec(), value.clone());
        Ok(value)
    }

    fn iter_raw(&self, range: KeyRange, order: Order) -> Result<StateIter<'_>, Error> {
        let overlay = self.store.iteration_overlay(self.index, &range, &self.writes);
        let own_writes = self
            .writes
            .iter()
            .filter(|(key, _)| range.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let parent = self.store.parent().iter_raw(range.clone(), order)?;
        Ok(Box::new(RecordingIter::new(
            self,
            MergeIter::new(parent, overlay, order),
            IterationRecord {
                range,
                order,
                own_writes,
                observed: Vec::new(),
                exhausted: false,
            },
        )))
    }
}

impl<S: StateRead> StateWrite for VersionIndexedStore<'_, S> {
    fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.put(key, value);
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.writes.delete(key);
    }
}

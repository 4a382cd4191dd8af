use std::collections::{
    BTreeMap,
    BTreeSet,
};

use tracing::warn;

use super::{
    iteration_overlay,
    IterationRecord,
    MultiVersionStore,
    MultiVersionValue,
    ReadSet,
    ReadSource,
    Validation,
};
use crate::{
    merge::{
        MergeIter,
        Origin,
    },
    Error,
    StateRead,
    TxIndex,
};

impl<S: StateRead> MultiVersionStore<S> {
    /// Checks that everything `index` read is still what it would read now.
    ///
    /// Validation is a pure function of the recorded read-set and iterate-set and the
    /// current versions: calling it twice without changing the store gives the same
    /// result. Every mismatch contributes the transactions responsible for it to the
    /// returned conflicts; running into an estimate always reports its writer.
    #[must_use]
    pub fn validate_transaction_state(&self, index: TxIndex) -> Validation {
        let recorded = self.recorded.read();
        let versions = self.versions.read();
        let mut checker = Checker {
            values: &versions.values,
            index,
            valid: true,
            conflicts: BTreeSet::new(),
        };
        if let Some(recorded) = recorded.get(&index) {
            checker.check_readset(&recorded.readset);
            for iteration in &recorded.iterateset {
                checker.check_iteration(&self.parent, iteration);
            }
        }
        if checker.valid {
            Validation::Valid
        } else {
            Validation::Invalid {
                conflicts: checker.conflicts,
            }
        }
    }
}

struct Checker<'a> {
    values: &'a BTreeMap<Vec<u8>, MultiVersionValue>,
    index: TxIndex,
    valid: bool,
    conflicts: BTreeSet<TxIndex>,
}

impl Checker<'_> {
    /// Marks the transaction invalid and blames the recorded and the current writer of
    /// `key`.
    fn blame(&mut self, key: &[u8], recorded: Option<ReadSource>) {
        self.valid = false;
        if let Some(writer) = recorded.and_then(|source| source.writer()) {
            self.conflicts.insert(writer);
        }
        if let Some(writer) = self.current_writer(key) {
            self.conflicts.insert(writer);
        }
    }

    fn current_writer(&self, key: &[u8]) -> Option<TxIndex> {
        self.values
            .get(key)
            .and_then(|value| value.latest_before(self.index))
            .map(|item| item.index)
    }

    fn check_readset(&mut self, readset: &ReadSet) {
        for (key, recorded) in readset {
            let current = self
                .values
                .get(key)
                .and_then(|value| value.latest_before(self.index));
            let unchanged = match current {
                None => *recorded == ReadSource::Parent,
                Some(item) => !item.is_estimate() && *recorded == item.source(),
            };
            if !unchanged {
                self.blame(key, Some(*recorded));
            }
        }
    }

    /// Replays a range scan against the current versions and compares the keys and
    /// their sources with what the scan originally observed, up to where it stopped.
    fn check_iteration<P: StateRead>(&mut self, parent: &P, record: &IterationRecord) {
        let overlay = iteration_overlay(self.values, self.index, &record.range, &record.own_writes);
        let parent_iter = match parent.iter_raw(record.range.clone(), record.order) {
            Ok(iter) => iter,
            Err(error) => {
                warn!(%error, index = self.index, "failed to replay iteration over parent state");
                self.valid = false;
                return;
            }
        };
        let mut replay = MergeIter::new(parent_iter, overlay, record.order);

        for (observed_key, observed_source) in &record.observed {
            match replay.next() {
                Some(Ok((key, _, origin))) => {
                    let source = match origin {
                        Origin::Parent => ReadSource::Parent,
                        Origin::Overlay(source) => source,
                    };
                    if key != *observed_key || source != *observed_source {
                        self.blame(observed_key, Some(*observed_source));
                        self.blame(&key, Some(source));
                        return;
                    }
                }
                Some(Err(err)) => {
                    self.replay_failed(&err);
                    return;
                }
                None => {
                    self.blame(observed_key, Some(*observed_source));
                    return;
                }
            }
        }

        if record.exhausted {
            match replay.next() {
                None => {}
                Some(Ok((key, _, origin))) => {
                    let source = match origin {
                        Origin::Parent => None,
                        Origin::Overlay(source) => Some(source),
                    };
                    self.blame(&key, source);
                }
                Some(Err(err)) => self.replay_failed(&err),
            }
        }
    }

    fn replay_failed(&mut self, err: &Error) {
        self.valid = false;
        match err.estimate_writer() {
            Some(writer) => {
                self.conflicts.insert(writer);
            }
            None => {
                warn!(error = %err, index = self.index, "failed to replay iteration");
            }
        }
    }
}

use super::{
    view::VersionIndexedStore,
    IterationRecord,
    ReadSource,
};
use crate::{
    merge::{
        MergeIter,
        Origin,
    },
    Error,
    StateRead,
};

/// An iterator over a [`VersionIndexedStore`] that records what it yielded into the
/// store's iterate-set when dropped.
pub(super) struct RecordingIter<'v, 's, S> {
    view: &'v VersionIndexedStore<'s, S>,
    inner: MergeIter<'v, ReadSource>,
    record: IterationRecord,
}

impl<'v, 's, S: StateRead> RecordingIter<'v, 's, S> {
    pub(super) fn new(
        view: &'v VersionIndexedStore<'s, S>,
        inner: MergeIter<'v, ReadSource>,
        record: IterationRecord,
    ) -> Self {
        Self {
            view,
            inner,
            record,
        }
    }
}

impl<S: StateRead> Iterator for RecordingIter<'_, '_, S> {
    type Item = Result<(Vec<u8>, Vec<u8>), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            None => {
                self.record.exhausted = true;
                None
            }
            Some(Ok((key, value, origin))) => {
                let source = match origin {
                    Origin::Parent => ReadSource::Parent,
                    Origin::Overlay(source) => source,
                };
                self.record.observed.push((key.clone(), source));
                Some(Ok((key, value)))
            }
            Some(Err(err)) => {
                if let Some(writer) = err.estimate_writer() {
                    self.view.record_abort(writer);
                }
                Some(Err(err))
            }
        }
    }
}

impl<S> Drop for RecordingIter<'_, '_, S> {
    fn drop(&mut self) {
        let record = std::mem::take(&mut self.record);
        self.view.reads.borrow_mut().iterateset.push(record);
    }
}

use std::sync::Arc;

use crate::{
    Error,
    KeyRange,
    Order,
};

/// A stream of key-value pairs in key order.
pub type StateIter<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>), Error>> + 'a>;

/// Read access to a byte-keyed state.
///
/// Reads are fallible so that a versioned view can abort the reading transaction from
/// any read path.
pub trait StateRead {
    /// Gets the value stored under `key`.
    ///
    /// # Errors
    /// Implementations backed by versioned state return [`Error::EstimateAbort`] if the
    /// visible version of `key` is an estimate.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Iterates over all keys in `range` in the given `order`.
    ///
    /// # Errors
    /// See [`StateRead::get_raw`]. Errors may also be yielded by the returned iterator.
    fn iter_raw(&self, range: KeyRange, order: Order) -> Result<StateIter<'_>, Error>;

    /// Iterates over all keys starting with `prefix`, in ascending order.
    ///
    /// # Errors
    /// See [`StateRead::iter_raw`].
    fn prefix_raw(&self, prefix: &[u8]) -> Result<StateIter<'_>, Error> {
        self.iter_raw(KeyRange::prefix(prefix), Order::Ascending)
    }
}

/// Write access to a byte-keyed state.
pub trait StateWrite: StateRead {
    fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>);

    fn delete(&mut self, key: Vec<u8>);
}

impl<S: StateRead + ?Sized> StateRead for &S {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        (**self).get_raw(key)
    }

    fn iter_raw(&self, range: KeyRange, order: Order) -> Result<StateIter<'_>, Error> {
        (**self).iter_raw(range, order)
    }
}

impl<S: StateRead + ?Sized> StateRead for &mut S {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        (**self).get_raw(key)
    }

    fn iter_raw(&self, range: KeyRange, order: Order) -> Result<StateIter<'_>, Error> {
        (**self).iter_raw(range, order)
    }
}

impl<S: StateWrite + ?Sized> StateWrite for &mut S {
    fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        (**self).put_raw(key, value);
    }

    fn delete(&mut self, key: Vec<u8>) {
        (**self).delete(key);
    }
}

impl<S: StateRead + ?Sized> StateRead for Arc<S> {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        (**self).get_raw(key)
    }

    fn iter_raw(&self, range: KeyRange, order: Order) -> Result<StateIter<'_>, Error> {
        (**self).iter_raw(range, order)
    }
}

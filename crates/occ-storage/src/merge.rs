//! Merging a committed key stream with a sorted overlay of in-flight changes.
use std::cmp::Ordering;

use crate::{
    Error,
    Order,
    StateIter,
    TxIndex,
};

/// The state of a key in an overlay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Overlay {
    Value(Vec<u8>),
    Deleted,
    /// The key was written by an invalidated transaction that has not re-executed yet.
    Estimate(TxIndex),
}

/// Where a merged entry was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin<T> {
    Parent,
    Overlay(T),
}

/// A merge of a parent stream with an overlay.
///
/// On equal keys the overlay wins. Deleted overlay entries hide the parent's entry and
/// are skipped. Reaching an [`Overlay::Estimate`] yields [`Error::EstimateAbort`] and
/// ends the iteration, as does any error of the parent stream.
pub struct MergeIter<'a, T> {
    parent: StateIter<'a>,
    parent_head: Option<(Vec<u8>, Vec<u8>)>,
    parent_done: bool,
    overlay: std::iter::Peekable<std::vec::IntoIter<(Vec<u8>, Overlay, T)>>,
    order: Order,
    failed: bool,
}

enum Take {
    Parent,
    Overlay,
    Both,
}

impl<'a, T> MergeIter<'a, T> {
    /// `parent` must already yield keys in `order`; `overlay` must be sorted ascending.
    pub fn new(parent: StateIter<'a>, mut overlay: Vec<(Vec<u8>, Overlay, T)>, order: Order) -> Self {
        if order == Order::Descending {
            overlay.reverse();
        }
        Self {
            parent,
            parent_head: None,
            parent_done: false,
            overlay: overlay.into_iter().peekable(),
            order,
            failed: false,
        }
    }

    fn fill_parent(&mut self) -> Result<(), Error> {
        if self.parent_head.is_none() && !self.parent_done {
            match self.parent.next() {
                Some(Ok(entry)) => self.parent_head = Some(entry),
                Some(Err(err)) => return Err(err),
                None => self.parent_done = true,
            }
        }
        Ok(())
    }

    fn next_step(&mut self) -> Option<Take> {
        let take = match (&self.parent_head, self.overlay.peek()) {
            (None, None) => return None,
            (Some(_), None) => Take::Parent,
            (None, Some(_)) => Take::Overlay,
            (Some((parent_key, _)), Some((overlay_key, ..))) => {
                match (parent_key.cmp(overlay_key), self.order) {
                    (Ordering::Equal, _) => Take::Both,
                    (Ordering::Less, Order::Ascending) | (Ordering::Greater, Order::Descending) => {
                        Take::Parent
                    }
                    _ => Take::Overlay,
                }
            }
        };
        Some(take)
    }
}

impl<T> Iterator for MergeIter<'_, T> {
    type Item = Result<(Vec<u8>, Vec<u8>, Origin<T>), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Err(err) = self.fill_parent() {
                self.failed = true;
                return Some(Err(err));
            }
            match self.next_step()? {
                Take::Parent => {
                    let (key, value) = self.parent_head.take()?;
                    return Some(Ok((key, value, Origin::Parent)));
                }
                Take::Both => {
                    self.parent_head = None;
                }
                Take::Overlay => {}
            }
            let (key, entry, tag) = self.overlay.next()?;
            match entry {
                Overlay::Value(value) => return Some(Ok((key, value, Origin::Overlay(tag)))),
                Overlay::Deleted => continue,
                Overlay::Estimate(writer) => {
                    self.failed = true;
                    return Some(Err(Error::EstimateAbort {
                        writer,
                    }));
                }
            }
        }
    }
}

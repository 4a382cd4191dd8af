//! Byte-keyed state for executing the transactions of a block in parallel.
//!
//! [`Storage`] holds the committed state. [`StateDelta`] caches writes on top of any
//! [`StateRead`]. [`MultiVersionStore`] keeps one version of every key per
//! transaction, hands each transaction incarnation a [`VersionIndexedStore`] to execute
//! against, and validates what the incarnation read once it finished.

mod delta;
mod error;
pub mod merge;
pub mod multiversion;
mod range;
mod read;
mod storage;

pub use delta::{
    Changeset,
    StateDelta,
};
pub use error::Error;
pub use multiversion::{
    ExecutionOutput,
    IterateSet,
    IterationRecord,
    MultiVersionItem,
    MultiVersionStore,
    ReadSet,
    ReadSource,
    Validation,
    VersionIndexedStore,
};
pub use range::{
    KeyRange,
    Order,
};
pub use read::{
    StateIter,
    StateRead,
    StateWrite,
};
pub use storage::{
    RootHash,
    Snapshot,
    Storage,
};

/// The position of a transaction in its block.
pub type TxIndex = usize;

/// The number of times a transaction was re-executed within its block.
pub type Incarnation = usize;

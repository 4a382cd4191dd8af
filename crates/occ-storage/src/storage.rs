use std::{
    collections::BTreeMap,
    fmt,
    sync::Arc,
};

use parking_lot::RwLock;
use sha2::{
    Digest as _,
    Sha256,
};
use tracing::debug;

use crate::{
    Changeset,
    Error,
    KeyRange,
    Order,
    StateIter,
    StateRead,
};

type State = BTreeMap<Vec<u8>, Vec<u8>>;

/// The commitment to a committed state.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RootHash(pub [u8; 32]);

impl RootHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Display for RootHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for RootHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootHash({self})")
    }
}

/// Hashes every entry in key order. Keys and values are prefixed with their length so
/// that distinct states can never produce the same preimage.
fn root_hash(state: &State) -> RootHash {
    let mut hasher = Sha256::new();
    for (key, value) in state {
        hasher.update((key.len() as u64).to_be_bytes());
        hasher.update(key);
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value);
    }
    RootHash(hasher.finalize().into())
}

struct Committed {
    version: u64,
    state: Arc<State>,
    root_hash: RootHash,
}

/// The committed state. Only [`Storage::commit`] mutates it; readers work on
/// [`Snapshot`]s.
pub struct Storage {
    committed: RwLock<Committed>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    #[must_use]
    pub fn new() -> Self {
        let state = State::new();
        let root_hash = root_hash(&state);
        Self {
            committed: RwLock::new(Committed {
                version: 0,
                state: Arc::new(state),
                root_hash,
            }),
        }
    }

    /// An immutable view of the most recently committed state.
    #[must_use]
    pub fn latest_snapshot(&self) -> Snapshot {
        let committed = self.committed.read();
        Snapshot {
            version: committed.version,
            state: committed.state.clone(),
        }
    }

    #[must_use]
    pub fn latest_version(&self) -> u64 {
        self.committed.read().version
    }

    #[must_use]
    pub fn root_hash(&self) -> RootHash {
        self.committed.read().root_hash
    }

    /// Applies `changeset`, bumps the version and returns the new root hash.
    ///
    /// Snapshots taken before the commit keep seeing the old state.
    pub fn commit(&self, changeset: Changeset) -> RootHash {
        let mut committed = self.committed.write();
        let change_count = changeset.len();
        let state = Arc::make_mut(&mut committed.state);
        for (key, value) in changeset {
            match value {
                Some(value) => {
                    state.insert(key, value);
                }
                None => {
                    state.remove(&key);
                }
            }
        }
        let root_hash = root_hash(state);
        committed.root_hash = root_hash;
        committed.version = committed.version.saturating_add(1);
        debug!(
            version = committed.version,
            change_count,
            %root_hash,
            "committed changeset"
        );
        root_hash
    }
}

/// A point-in-time view of the committed state.
#[derive(Clone)]
pub struct Snapshot {
    version: u64,
    state: Arc<State>,
}

impl Snapshot {
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl StateRead for Snapshot {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.state.get(key).cloned())
    }

    fn iter_raw(&self, range: KeyRange, order: Order) -> Result<StateIter<'_>, Error> {
        if range.is_degenerate() {
            return Ok(Box::new(std::iter::empty()));
        }
        let entries = self
            .state
            .range::<[u8], _>(range.as_bounds())
            .map(|(key, value)| Ok((key.clone(), value.clone())));
        Ok(match order {
            Order::Ascending => Box::new(entries),
            Order::Descending => Box::new(entries.rev()),
        })
    }
}

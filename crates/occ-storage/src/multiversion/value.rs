use std::collections::BTreeMap;

use crate::{
    merge::Overlay,
    Incarnation,
    ReadSource,
    TxIndex,
};

/// One transaction's version of a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiVersionItem {
    pub index: TxIndex,
    pub incarnation: Incarnation,
    /// `None` for deletes and estimates.
    pub value: Option<Vec<u8>>,
    pub estimate: bool,
}

impl MultiVersionItem {
    #[must_use]
    pub fn is_estimate(&self) -> bool {
        self.estimate
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        !self.estimate && self.value.is_none()
    }

    #[must_use]
    pub fn source(&self) -> ReadSource {
        ReadSource::Version {
            index: self.index,
            incarnation: self.incarnation,
        }
    }

    pub(crate) fn to_overlay(&self) -> Overlay {
        if self.estimate {
            return Overlay::Estimate(self.index);
        }
        match &self.value {
            Some(value) => Overlay::Value(value.clone()),
            None => Overlay::Deleted,
        }
    }
}

/// All versions of a single key, at most one per transaction index.
#[derive(Debug, Default)]
pub struct MultiVersionValue {
    versions: BTreeMap<TxIndex, MultiVersionItem>,
}

impl MultiVersionValue {
    pub fn set(&mut self, index: TxIndex, incarnation: Incarnation, value: Option<Vec<u8>>) {
        self.versions.insert(
            index,
            MultiVersionItem {
                index,
                incarnation,
                value,
                estimate: false,
            },
        );
    }

    pub fn set_estimate(&mut self, index: TxIndex, incarnation: Incarnation) {
        self.versions.insert(
            index,
            MultiVersionItem {
                index,
                incarnation,
                value: None,
                estimate: true,
            },
        );
    }

    pub fn remove(&mut self, index: TxIndex) {
        self.versions.remove(&index);
    }

    /// The version written by the highest index strictly below `index`.
    #[must_use]
    pub fn latest_before(&self, index: TxIndex) -> Option<&MultiVersionItem> {
        self.versions.range(..index).next_back().map(|(_, item)| item)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&MultiVersionItem> {
        self.versions.values().next_back()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

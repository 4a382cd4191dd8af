use std::ops::Bound;

/// A half-open range of keys `[start, end)`. A missing `end` leaves the range unbounded
/// above.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    #[must_use]
    pub fn new(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Self {
        Self {
            start: start.into(),
            end: Some(end.into()),
        }
    }

    /// Every key in the store.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// All keys starting with `prefix`.
    #[must_use]
    pub fn prefix(prefix: impl AsRef<[u8]>) -> Self {
        let start = prefix.as_ref().to_vec();
        let end = prefix_successor(&start);
        Self {
            start,
            end,
        }
    }

    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().map_or(true, |end| key < end)
    }

    /// The range as bounds suitable for [`std::collections::BTreeMap::range`].
    #[must_use]
    pub fn as_bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let end = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        (Bound::Included(self.start.as_slice()), end)
    }

    /// Whether the range cannot contain any key.
    ///
    /// [`std::collections::BTreeMap::range`] panics on inverted bounds, so every range
    /// query goes through this check first.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.end
            .as_deref()
            .is_some_and(|end| end <= self.start.as_slice())
    }
}

/// Iteration direction of a range scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// The smallest key greater than every key starting with `prefix`, or `None` if no such
/// key exists (the prefix is empty or all `0xff`).
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last.saturating_add(1));
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_range_contains_only_prefixed_keys() {
        let range = KeyRange::prefix(b"ab");
        assert!(range.contains(b"ab"));
        assert!(range.contains(b"ab\xff\xff"));
        assert!(!range.contains(b"ac"));
        assert!(!range.contains(b"aa\xff"));
        assert_eq!(Some(b"ac".to_vec()), range.end);
    }

    #[test]
    fn prefix_of_max_bytes_is_unbounded_above() {
        let range = KeyRange::prefix([0x01, 0xff, 0xff]);
        assert_eq!(Some(vec![0x02]), range.end);
        assert_eq!(None, KeyRange::prefix([0xff, 0xff]).end);
        assert_eq!(None, KeyRange::prefix([]).end);
    }

    #[test]
    fn inverted_range_is_degenerate() {
        assert!(KeyRange::new(b"b".to_vec(), b"a".to_vec()).is_degenerate());
        assert!(KeyRange::new(b"a".to_vec(), b"a".to_vec()).is_degenerate());
        assert!(!KeyRange::all().is_degenerate());
    }
}

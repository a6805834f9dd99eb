//! Sorted identifier lists.

use crate::error::Result;

/// A sorted, duplicate-free list of entity identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidList {
    uids: Vec<u64>,
}

impl UidList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from identifiers in any order, dropping duplicates.
    pub fn from_unsorted(mut uids: Vec<u64>) -> Self {
        uids.sort_unstable();
        uids.dedup();
        Self { uids }
    }

    /// Inserts an identifier, keeping the list sorted.
    ///
    /// Appending in ascending order is the common case and stays O(1).
    pub fn insert(&mut self, uid: u64) {
        match self.uids.last() {
            None => self.uids.push(uid),
            Some(&last) if last < uid => self.uids.push(uid),
            Some(_) => {
                if let Err(pos) = self.uids.binary_search(&uid) {
                    self.uids.insert(pos, uid);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    pub fn contains(&self, uid: u64) -> bool {
        self.uids.binary_search(&uid).is_ok()
    }

    /// Returns the position of `uid` in the list.
    pub fn index_of(&self, uid: u64) -> Option<usize> {
        self.uids.binary_search(&uid).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.uids.iter().copied()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.uids
    }

    /// Returns the identifiers present in both lists.
    pub fn intersect(&self, other: &UidList) -> UidList {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };

        let mut out = Vec::with_capacity(small.len());
        let (mut i, mut j) = (0, 0);
        while i < small.uids.len() && j < large.uids.len() {
            let (a, b) = (small.uids[i], large.uids[j]);
            if a == b {
                out.push(a);
                i += 1;
                j += 1;
            } else if a < b {
                i += 1;
            } else {
                j += 1;
            }
        }

        // Postcondition: the intersection never grows
        debug_assert!(out.len() <= small.len());

        UidList { uids: out }
    }

    /// Calls `f` for every identifier in ascending order.
    ///
    /// Stops at and returns the first error.
    pub fn try_for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(u64) -> Result<()>,
    {
        for &uid in &self.uids {
            f(uid)?;
        }
        Ok(())
    }
}

impl From<Vec<u64>> for UidList {
    fn from(uids: Vec<u64>) -> Self {
        Self::from_unsorted(uids)
    }
}

impl FromIterator<u64> for UidList {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

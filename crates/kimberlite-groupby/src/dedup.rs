//! Per-attribute deduplication of grouping values.

use std::collections::BTreeMap;

use tracing::trace;

use crate::uid::UidList;
use crate::value::Value;

/// Identifiers sharing one canonical value under a grouping attribute.
#[derive(Debug, Clone)]
pub(crate) struct GroupElements {
    /// First value seen with this canonical key.
    pub key: Value,
    pub uids: UidList,
}

/// All distinct values of one grouping attribute.
#[derive(Debug, Clone)]
pub(crate) struct Bucket {
    pub attr: String,
    /// Canonical key to its equivalence class.
    pub elements: BTreeMap<String, GroupElements>,
}

impl Bucket {
    fn new(attr: &str) -> Self {
        Self {
            attr: attr.to_string(),
            elements: BTreeMap::new(),
        }
    }
}

/// Buckets for every grouping attribute, in first-seen order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Dedup {
    pub buckets: Vec<Bucket>,
}

impl Dedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bucket for `attr`, appending an empty one if needed.
    pub fn bucket_mut(&mut self, attr: &str) -> &mut Bucket {
        // Recently added buckets are the likeliest match.
        let idx = match self.buckets.iter().rposition(|b| b.attr == attr) {
            Some(idx) => idx,
            None => {
                self.buckets.push(Bucket::new(attr));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[idx]
    }

    /// Records that `uid` has `value` under `attr`.
    ///
    /// Values without a canonical string form are dropped.
    pub fn add_value(&mut self, attr: &str, value: Value, uid: u64) {
        let bucket = self.bucket_mut(attr);

        let key = match &value {
            Value::Uid(u) => u.to_string(),
            other => match other.marshal() {
                Ok(key) => key,
                Err(e) => {
                    trace!(attr, uid, error = %e, "dropping unmarshalable groupby value");
                    return;
                }
            },
        };

        bucket
            .elements
            .entry(key)
            .or_insert_with(|| GroupElements {
                key: value,
                uids: UidList::new(),
            })
            .uids
            .insert(uid);
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

//! Group construction and per-group aggregation.

use tracing::trace;

use crate::aggregator::Aggregator;
use crate::dedup::Dedup;
use crate::error::{GroupByError, Result};
use crate::node::{ResultNode, UID_ATTR};
use crate::uid::UidList;
use crate::value::Value;

/// A named value: either one component of a group key or one aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPair {
    pub attr: String,
    pub value: Value,
}

impl GroupPair {
    pub fn new(attr: impl Into<String>, value: Value) -> Self {
        Self {
            attr: attr.into(),
            value,
        }
    }
}

/// One group: its key, its aggregates, and the identifiers it holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupResult {
    pub keys: Vec<GroupPair>,
    pub aggregates: Vec<GroupPair>,
    pub uids: UidList,
}

impl GroupResult {
    /// Computes `child` over this group and appends the result.
    ///
    /// Fields that are neither `count` nor a known aggregate function are
    /// ignored. An aggregate with no qualifying input appends nothing.
    pub fn aggregate_child(&mut self, child: &ResultNode) -> Result<()> {
        if child.params.do_count {
            if child.attr != UID_ATTR {
                return Err(GroupByError::CountOnNonUid {
                    attr: child.attr.clone(),
                });
            }
            let name = child.params.alias.as_deref().unwrap_or("count");
            let count = i64::try_from(self.uids.len())
                .map_err(|_| GroupByError::ArithmeticOverflow("count".to_string()))?;
            self.aggregates.push(GroupPair::new(name, Value::Int(count)));
            return Ok(());
        }

        let Some(func) = child.aggregate_function() else {
            return Ok(());
        };

        let mut agg = Aggregator::new(func);
        for uid in self.uids.iter() {
            if !child.src_uids.contains(uid) {
                continue;
            }
            let Some(value) = child.values_of(uid).and_then(<[Value]>::first) else {
                continue;
            };
            let converted = match child.attr_type {
                Some(data_type) => value.convert_to(data_type),
                None => Ok(value.clone()),
            };
            match converted {
                Ok(v) => agg.apply(v)?,
                Err(e) => {
                    trace!(attr = %child.attr, uid, error = %e, "skipping unconvertible aggregate input");
                }
            }
        }

        if let Some(value) = agg.value() {
            let name = match &child.params.alias {
                Some(alias) => alias.clone(),
                None => format!("{}({})", func.name(), child.attr),
            };
            self.aggregates.push(GroupPair::new(name, value));
        }
        Ok(())
    }
}

/// The groups formed for one row of a group-by node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupResults {
    pub groups: Vec<GroupResult>,
}

impl GroupResults {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Builds one group per non-empty combination of bucket entries.
    ///
    /// `cur` holds the identifiers matching every key in `keys`. Each level
    /// narrows it by one bucket, so a combination whose intersection is
    /// already empty is never expanded.
    pub(crate) fn form_groups(
        &mut self,
        dedup: &Dedup,
        cur: &UidList,
        keys: &[GroupPair],
        max_groups: usize,
    ) -> Result<()> {
        let depth = keys.len();
        if dedup.is_empty() || (depth != 0 && cur.is_empty()) {
            return Ok(());
        }

        if depth == dedup.len() {
            if self.groups.len() >= max_groups {
                return Err(GroupByError::TooManyGroups { limit: max_groups });
            }
            self.groups.push(GroupResult {
                keys: keys.to_vec(),
                aggregates: Vec::new(),
                uids: cur.clone(),
            });
            return Ok(());
        }

        let bucket = &dedup.buckets[depth];
        for elem in bucket.elements.values() {
            let next = if depth == 0 {
                elem.uids.clone()
            } else {
                cur.intersect(&elem.uids)
            };

            // Invariant: intersections only shrink the candidate set
            debug_assert!(depth == 0 || next.len() <= cur.len());

            let mut next_keys = Vec::with_capacity(depth + 1);
            next_keys.extend_from_slice(keys);
            next_keys.push(GroupPair::new(bucket.attr.clone(), elem.key.clone()));

            self.form_groups(dedup, &next, &next_keys, max_groups)?;
        }
        Ok(())
    }

    /// Renders the groups as `{"@groupby": [...]}`.
    ///
    /// Each group becomes one object holding its keys then its aggregates.
    pub fn to_json(&self) -> serde_json::Value {
        let groups = self
            .groups
            .iter()
            .map(|grp| {
                let obj: serde_json::Map<String, serde_json::Value> = grp
                    .keys
                    .iter()
                    .chain(&grp.aggregates)
                    .map(|pair| (pair.attr.clone(), pair.value.to_json()))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();

        serde_json::json!({ "@groupby": serde_json::Value::Array(groups) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_attribute_dedup() -> Dedup {
        let mut dedup = Dedup::new();
        dedup.add_value("a", Value::from("x"), 1);
        dedup.add_value("a", Value::from("x"), 2);
        dedup.add_value("a", Value::from("y"), 3);
        dedup.add_value("b", Value::from("p"), 1);
        dedup.add_value("b", Value::from("p"), 3);
        dedup.add_value("b", Value::from("q"), 2);
        dedup
    }

    fn key_strings(grp: &GroupResult) -> Vec<String> {
        grp.keys.iter().map(|k| k.value.marshal().unwrap()).collect()
    }

    #[test]
    fn test_form_groups_skips_empty_intersections() {
        let dedup = two_attribute_dedup();
        let mut res = GroupResults::default();
        res.form_groups(&dedup, &UidList::new(), &[], usize::MAX)
            .unwrap();

        let mut found: Vec<(Vec<String>, Vec<u64>)> = res
            .groups
            .iter()
            .map(|g| (key_strings(g), g.uids.as_slice().to_vec()))
            .collect();
        found.sort();

        assert_eq!(
            found,
            vec![
                (vec!["x".to_string(), "p".to_string()], vec![1]),
                (vec!["x".to_string(), "q".to_string()], vec![2]),
                (vec!["y".to_string(), "p".to_string()], vec![3]),
            ]
        );
    }

    #[test]
    fn test_form_groups_no_buckets() {
        let mut res = GroupResults::default();
        res.form_groups(&Dedup::new(), &UidList::new(), &[], usize::MAX)
            .unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn test_form_groups_key_attrs_follow_bucket_order() {
        let dedup = two_attribute_dedup();
        let mut res = GroupResults::default();
        res.form_groups(&dedup, &UidList::new(), &[], usize::MAX)
            .unwrap();
        for grp in &res.groups {
            let attrs: Vec<_> = grp.keys.iter().map(|k| k.attr.as_str()).collect();
            assert_eq!(attrs, vec!["a", "b"]);
        }
    }

    #[test]
    fn test_form_groups_limit() {
        let dedup = two_attribute_dedup();
        let mut res = GroupResults::default();
        let err = res
            .form_groups(&dedup, &UidList::new(), &[], 2)
            .unwrap_err();
        assert_eq!(err, GroupByError::TooManyGroups { limit: 2 });
    }

    #[test]
    fn test_count_child() {
        let mut grp = GroupResult {
            uids: UidList::from(vec![4, 5, 6]),
            ..GroupResult::default()
        };
        grp.aggregate_child(&ResultNode::count()).unwrap();
        grp.aggregate_child(&ResultNode::count().with_alias("n")).unwrap();
        assert_eq!(
            grp.aggregates,
            vec![
                GroupPair::new("count", Value::Int(3)),
                GroupPair::new("n", Value::Int(3)),
            ]
        );
    }

    #[test]
    fn test_count_on_non_uid_is_usage_error() {
        let mut grp = GroupResult::default();
        let err = grp
            .aggregate_child(&ResultNode::new("friend").with_count())
            .unwrap_err();
        assert_eq!(
            err,
            GroupByError::CountOnNonUid {
                attr: "friend".to_string()
            }
        );
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_aggregate_skips_missing_and_unconvertible() {
        let child = ResultNode::aggregate("sum", "age")
            .with_type(crate::value::DataType::Int)
            .with_values(vec![
                (1, vec![Value::Int(10)]),
                (2, vec![Value::from("32")]),
                (3, vec![Value::from("old")]),
                (4, vec![]),
            ]);
        let mut grp = GroupResult {
            uids: UidList::from(vec![1, 2, 3, 4, 5]),
            ..GroupResult::default()
        };
        grp.aggregate_child(&child).unwrap();
        assert_eq!(
            grp.aggregates,
            vec![GroupPair::new("sum(age)", Value::Int(42))]
        );
    }

    #[test]
    fn test_aggregate_without_input_appends_nothing() {
        let child = ResultNode::aggregate("max", "age").with_values(vec![(9, vec![Value::Int(1)])]);
        let mut grp = GroupResult {
            uids: UidList::from(vec![1, 2]),
            ..GroupResult::default()
        };
        grp.aggregate_child(&child).unwrap();
        assert!(grp.aggregates.is_empty());
    }

    #[test]
    fn test_unknown_function_ignored() {
        let child = ResultNode::aggregate("len", "name").with_values(vec![(1, vec![Value::from("a")])]);
        let mut grp = GroupResult {
            uids: UidList::from(vec![1]),
            ..GroupResult::default()
        };
        grp.aggregate_child(&child).unwrap();
        assert!(grp.aggregates.is_empty());
    }

    #[test]
    fn test_to_json() {
        let res = GroupResults {
            groups: vec![GroupResult {
                keys: vec![GroupPair::new("age", Value::Int(20))],
                aggregates: vec![GroupPair::new("count", Value::Int(2))],
                uids: UidList::from(vec![1, 2]),
            }],
        };
        assert_eq!(
            res.to_json(),
            serde_json::json!({ "@groupby": [ { "age": 20, "count": 2 } ] })
        );
    }
}

//! Deterministic ordering of group results.
//!
//! The order only exists so that repeated identical queries produce
//! identical output; it carries no meaning for the groups themselves.

use std::cmp::Ordering;

use crate::group::{GroupPair, GroupResult};

/// Compares two groups.
///
/// Precedence: identifier count, key count, aggregate count, then keys and
/// aggregates pairwise. A pair of values that cannot be compared counts as
/// tied at that position.
pub fn compare_groups(a: &GroupResult, b: &GroupResult) -> Ordering {
    a.uids
        .len()
        .cmp(&b.uids.len())
        .then_with(|| a.keys.len().cmp(&b.keys.len()))
        .then_with(|| a.aggregates.len().cmp(&b.aggregates.len()))
        .then_with(|| compare_pairs(&a.keys, &b.keys))
        .then_with(|| compare_pairs(&a.aggregates, &b.aggregates))
}

fn compare_pairs(a: &[GroupPair], b: &[GroupPair]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x
            .value
            .compare(&y.value)
            .or_else(|| y.value.compare(&x.value).map(Ordering::reverse));
        match ord {
            Some(Ordering::Equal) | None => {}
            Some(ord) => return ord,
        }
    }
    Ordering::Equal
}

/// Sorts groups with [`compare_groups`], keeping tied groups in place.
///
/// Incomparable values make the comparison non-transitive, which
/// `slice::sort_by` is allowed to panic on, so this is a plain stable
/// merge sort.
///
/// With keys of mixed types the result depends on the input order, even
/// between groups that do compare: `[1, "x", 0]` stays as is because each
/// neighbour pair is tied, while `[0, "x", 1]` also stays as is. What
/// always holds is that no group is placed directly after one it compares
/// less than.
pub fn sort_groups(groups: &mut Vec<GroupResult>) {
    if groups.len() < 2 {
        return;
    }
    let items = std::mem::take(groups);
    *groups = merge_sort(items);
}

fn merge_sort(mut items: Vec<GroupResult>) -> Vec<GroupResult> {
    if items.len() < 2 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items);
    let right = merge_sort(right);

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare_groups(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uid::UidList;
    use crate::value::Value;

    fn group(uids: Vec<u64>, key: Value) -> GroupResult {
        GroupResult {
            keys: vec![GroupPair::new("k", key)],
            aggregates: vec![],
            uids: UidList::from(uids),
        }
    }

    #[test]
    fn test_fewer_uids_first() {
        let a = group(vec![1, 2], Value::from("a"));
        let b = group(vec![3], Value::from("b"));
        assert_eq!(compare_groups(&b, &a), Ordering::Less);
        assert_eq!(compare_groups(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_keys_break_ties() {
        let a = group(vec![1], Value::Int(5));
        let b = group(vec![2], Value::Int(3));
        assert_eq!(compare_groups(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_fewer_keys_first() {
        let a = group(vec![1], Value::Int(5));
        let mut b = group(vec![2], Value::Int(3));
        b.keys.push(GroupPair::new("j", Value::Int(0)));
        assert_eq!(compare_groups(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_incomparable_key_falls_through_to_next_position() {
        let mut a = group(vec![1], Value::Int(1));
        let mut b = group(vec![2], Value::from("x"));
        a.keys.push(GroupPair::new("j", Value::Int(9)));
        b.keys.push(GroupPair::new("j", Value::Int(2)));
        assert_eq!(compare_groups(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_aggregates_break_key_ties() {
        let mut a = group(vec![1], Value::from("same"));
        let mut b = group(vec![2], Value::from("same"));
        a.aggregates.push(GroupPair::new("count", Value::Int(7)));
        b.aggregates.push(GroupPair::new("count", Value::Int(4)));
        assert_eq!(compare_groups(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_all_incomparable_is_equal() {
        let a = group(vec![1], Value::Int(1));
        let b = group(vec![2], Value::from("1"));
        assert_eq!(compare_groups(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut groups = vec![
            group(vec![1], Value::Int(1)),
            group(vec![2], Value::from("a")),
            group(vec![3, 4], Value::Int(0)),
            group(vec![5], Value::from("b")),
        ];
        sort_groups(&mut groups);
        let uids: Vec<_> = groups.iter().map(|g| g.uids.as_slice().to_vec()).collect();
        // Int(1) and the texts are mutually incomparable, so they stay in
        // input order ahead of the larger group.
        assert_eq!(uids, vec![vec![1], vec![2], vec![5], vec![3, 4]]);
    }

    #[test]
    fn test_mixed_type_keys_keep_input_order_around_ties() {
        let keys = |groups: &[GroupResult]| -> Vec<Value> {
            groups.iter().map(|g| g.keys[0].value.clone()).collect()
        };

        let mut groups = vec![
            group(vec![1], Value::Int(1)),
            group(vec![2], Value::from("x")),
            group(vec![3], Value::Int(0)),
        ];
        sort_groups(&mut groups);
        assert_eq!(
            keys(&groups),
            vec![Value::Int(1), Value::from("x"), Value::Int(0)]
        );

        groups.reverse();
        sort_groups(&mut groups);
        assert_eq!(
            keys(&groups),
            vec![Value::Int(0), Value::from("x"), Value::Int(1)]
        );
    }
}

//! Crate-level tests for group-by evaluation.

#![allow(clippy::unwrap_used)] // Tests use unwrap for simplicity
#![allow(clippy::too_many_lines)] // Test functions can be long
#![allow(clippy::float_cmp)] // Test assertions use exact float comparisons


use crate::node::ResultNode;
use crate::uid::UidList;
use crate::value::Value;

// ============================================================================
// Fixtures
// ============================================================================

/// A value child keyed by source uid.
fn values(attr: &str, rows: &[(u64, Value)]) -> ResultNode {
    ResultNode::new(attr).with_values(rows.iter().map(|(uid, v)| (*uid, vec![v.clone()])).collect())
}

/// A uid child keyed by source uid.
fn edges(attr: &str, rows: Vec<(u64, Vec<u64>)>) -> ResultNode {
    ResultNode::new(attr).with_edges(rows)
}

/// A group-by node over a single row.
fn grouped(row: &[u64]) -> ResultNode {
    ResultNode::new("q").with_rows(vec![UidList::from(row.to_vec())])
}

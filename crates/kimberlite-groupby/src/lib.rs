//! # kimberlite-groupby: group-by evaluation for graph query results
//!
//! Given a result node whose children have already been resolved, this
//! crate partitions the node's entities into groups keyed by one or more
//! attributes, computes aggregates per group, and orders the groups
//! deterministically. Aggregates can also be bound to query variables.
//!
//! ## Evaluation
//!
//! ```text
//!  children marked as group keys          aggregate children
//!            │                                    │
//!            ▼                                    │
//!  ┌───────────────────┐                          │
//!  │ Dedup             │ one bucket per attribute │
//!  │ value → uids      │                          │
//!  └─────────┬─────────┘                          │
//!            ▼                                    │
//!  ┌───────────────────┐                          │
//!  │ Cross product     │ non-empty combinations   │
//!  └─────────┬─────────┘                          │
//!            ▼                                    ▼
//!  ┌──────────────────────────────────────────────────┐
//!  │ Aggregate: count(uid), min, max, sum, avg        │
//!  └─────────┬────────────────────────────────────────┘
//!            ▼
//!  ┌───────────────────┐
//!  │ Deterministic sort│
//!  └───────────────────┘
//! ```
//!
//! The direct pass runs once per row of the node's `uid_matrix`. When any
//! aggregate field declares a variable, a second pass groups the full,
//! unfiltered child sources and binds the results.
//!
//! ## Usage
//!
//! ```
//! use kimberlite_groupby::{GroupByEvaluator, ResultNode, UidList, Value, VarTable};
//!
//! let mut node = ResultNode::new("people")
//!     .with_rows(vec![UidList::from(vec![1, 2, 3])])
//!     .with_child(
//!         ResultNode::new("name")
//!             .group_key()
//!             .with_values(vec![
//!                 (1, vec![Value::from("a")]),
//!                 (2, vec![Value::from("a")]),
//!                 (3, vec![Value::from("b")]),
//!             ]),
//!     )
//!     .with_child(ResultNode::count());
//!
//! let mut vars = VarTable::new();
//! GroupByEvaluator::default()
//!     .process_group_by(&mut node, &mut vars, &[])
//!     .unwrap();
//!
//! assert_eq!(
//!     node.group_by_json()[0],
//!     serde_json::json!({ "@groupby": [
//!         { "name": "b", "count": 1 },
//!         { "name": "a", "count": 2 },
//!     ]})
//! );
//! ```

mod aggregator;
mod dedup;
mod error;
mod evaluator;
mod group;
mod node;
mod order;
pub mod settings;
mod uid;
mod value;

#[cfg(test)]
mod tests;

pub use aggregator::{AggregateFunction, Aggregator, is_aggregate_function};
pub use error::{GroupByError, Result};
pub use evaluator::GroupByEvaluator;
pub use group::{GroupPair, GroupResult, GroupResults};
pub use node::{NodeParams, ResultNode, UID_ATTR, VarTable, VarValue};
pub use order::{compare_groups, sort_groups};
pub use settings::{ConfigLoader, GroupByConfig};
pub use uid::UidList;
pub use value::{DataType, Value};

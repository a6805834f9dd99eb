//! Result-tree nodes consumed and produced by group-by evaluation.

use std::collections::{BTreeMap, HashMap};

use crate::aggregator::AggregateFunction;
use crate::group::GroupResults;
use crate::uid::UidList;
use crate::value::{DataType, Value};

/// The reserved identity relation. `count` inside a group-by may only
/// target this attribute.
pub const UID_ATTR: &str = "uid";

/// Per-field parameters declared in the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeParams {
    /// Output name overriding the attribute name.
    pub alias: Option<String>,
    /// The field is `count(...)`.
    pub do_count: bool,
    /// The field contributes to the grouping key instead of the output.
    pub is_group_key: bool,
    /// Variable the field's aggregate is bound to.
    pub var: Option<String>,
}

/// A node of the evaluated query tree.
///
/// `uid_matrix` and `value_matrix` are aligned with `src_uids`: row `i`
/// holds the adjacent identifiers (or scalar values) of `src_uids[i]`.
/// A node with empty `dest_uids` is a value node.
#[derive(Debug, Clone, Default)]
pub struct ResultNode {
    pub attr: String,
    pub params: NodeParams,
    /// Name of the function the field applies, e.g. `sum`.
    pub src_func: Option<String>,
    /// Declared schema type of `attr`, target of best-effort conversion.
    pub attr_type: Option<DataType>,
    pub src_uids: UidList,
    pub dest_uids: UidList,
    pub uid_matrix: Vec<UidList>,
    pub value_matrix: Vec<Vec<Value>>,
    pub children: Vec<ResultNode>,
    /// One entry per `uid_matrix` row once group-by has run.
    pub group_by_results: Vec<GroupResults>,
}

impl ResultNode {
    pub fn new(attr: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            ..Self::default()
        }
    }

    /// A `count(uid)` field.
    pub fn count() -> Self {
        Self::new(UID_ATTR).with_count()
    }

    /// An aggregate field such as `sum(age)`.
    pub fn aggregate(func: impl Into<String>, attr: impl Into<String>) -> Self {
        let mut node = Self::new(attr);
        node.src_func = Some(func.into());
        node
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.params.alias = Some(alias.into());
        self
    }

    pub fn with_count(mut self) -> Self {
        self.params.do_count = true;
        self
    }

    pub fn with_var(mut self, var: impl Into<String>) -> Self {
        self.params.var = Some(var.into());
        self
    }

    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.attr_type = Some(data_type);
        self
    }

    /// Marks this node as a grouping key.
    pub fn group_key(mut self) -> Self {
        self.params.is_group_key = true;
        self
    }

    pub fn with_child(mut self, child: ResultNode) -> Self {
        self.children.push(child);
        self
    }

    /// Sets the rows grouped by the direct pass.
    pub fn with_rows(mut self, rows: Vec<UidList>) -> Self {
        self.uid_matrix = rows;
        self
    }

    /// Sets uid edges: each source identifier with its adjacent identifiers.
    pub fn with_edges(mut self, edges: Vec<(u64, Vec<u64>)>) -> Self {
        let edges: BTreeMap<u64, UidList> = edges
            .into_iter()
            .map(|(src, dest)| (src, UidList::from(dest)))
            .collect();
        let dest: UidList = edges.values().flat_map(UidList::iter).collect();

        self.src_uids = edges.keys().copied().collect();
        self.uid_matrix = edges.into_values().collect();
        self.dest_uids = dest;
        self
    }

    /// Sets scalar values: each source identifier with its values.
    pub fn with_values(mut self, values: Vec<(u64, Vec<Value>)>) -> Self {
        let values: BTreeMap<u64, Vec<Value>> = values.into_iter().collect();

        self.src_uids = values.keys().copied().collect();
        self.value_matrix = values.into_values().collect();
        self.dest_uids = UidList::new();
        self
    }

    /// Name this field is reported under.
    pub fn field_name(&self) -> &str {
        self.params.alias.as_deref().unwrap_or(&self.attr)
    }

    pub fn is_value_node(&self) -> bool {
        self.dest_uids.is_empty()
    }

    /// Resolves `src_func` against the aggregate function registry.
    pub fn aggregate_function(&self) -> Option<AggregateFunction> {
        self.src_func.as_deref().and_then(AggregateFunction::from_name)
    }

    /// Adjacent identifiers of `src`, if `src` is a source of this node.
    pub fn uids_of(&self, src: u64) -> Option<&UidList> {
        self.src_uids
            .index_of(src)
            .and_then(|idx| self.uid_matrix.get(idx))
    }

    /// Scalar values of `src`, if `src` is a source of this node.
    pub fn values_of(&self, src: u64) -> Option<&[Value]> {
        self.src_uids
            .index_of(src)
            .and_then(|idx| self.value_matrix.get(idx))
            .map(Vec::as_slice)
    }

    /// Renders every grouped row as JSON, in row order.
    pub fn group_by_json(&self) -> Vec<serde_json::Value> {
        self.group_by_results
            .iter()
            .map(GroupResults::to_json)
            .collect()
    }
}

/// A variable bound by a group-by block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarValue {
    /// Bound value per grouping identifier.
    pub vals: BTreeMap<u64, Value>,
    /// Attributes traversed to reach the grouping identifiers.
    pub path: Vec<String>,
}

/// Query-wide variables by name.
pub type VarTable = HashMap<String, VarValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_edges_aligns_matrix() {
        let node = ResultNode::new("friend").with_edges(vec![(3, vec![30]), (1, vec![10, 11])]);
        assert_eq!(node.src_uids.as_slice(), &[1, 3]);
        assert_eq!(node.uids_of(1).unwrap().as_slice(), &[10, 11]);
        assert_eq!(node.uids_of(3).unwrap().as_slice(), &[30]);
        assert!(node.uids_of(2).is_none());
        assert_eq!(node.dest_uids.as_slice(), &[10, 11, 30]);
        assert!(!node.is_value_node());
    }

    #[test]
    fn test_with_values_is_value_node() {
        let node = ResultNode::new("age").with_values(vec![(2, vec![Value::Int(20)])]);
        assert!(node.is_value_node());
        assert_eq!(node.values_of(2), Some(&[Value::Int(20)][..]));
        assert_eq!(node.values_of(1), None);
    }

    #[test]
    fn test_field_name_prefers_alias() {
        assert_eq!(ResultNode::new("age").field_name(), "age");
        assert_eq!(ResultNode::new("age").with_alias("years").field_name(), "years");
    }

    #[test]
    fn test_aggregate_function_lookup() {
        assert_eq!(
            ResultNode::aggregate("sum", "age").aggregate_function(),
            Some(AggregateFunction::Sum)
        );
        assert_eq!(ResultNode::aggregate("len", "age").aggregate_function(), None);
        assert_eq!(ResultNode::count().attr, UID_ATTR);
    }
}

//! Group-by evaluation over a result node.
//!
//! Two passes share one grouping procedure:
//!
//! - the direct pass groups each row of the node's `uid_matrix` separately
//!   and produces the node's visible output;
//! - the variable pass groups the children's full, unfiltered source sets
//!   and binds per-uid aggregates into query variables.

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::debug;

use crate::dedup::Dedup;
use crate::error::{GroupByError, Result};
use crate::group::{GroupResult, GroupResults};
use crate::node::{ResultNode, VarTable, VarValue};
use crate::order::sort_groups;
use crate::settings::{ConfigError, GroupByConfig};
use crate::uid::UidList;
use crate::value::Value;

/// Groups formed over one scope, before aggregation.
struct Grouping {
    results: GroupResults,
    /// Attribute of the uid grouping child, if any.
    path_attr: Option<String>,
}

/// Evaluates group-by blocks.
///
/// Holds only configuration; every evaluation builds and drops its own
/// intermediate state.
#[derive(Debug, Clone, Default)]
pub struct GroupByEvaluator {
    config: GroupByConfig,
}

impl GroupByEvaluator {
    /// Creates an evaluator after validating `config`.
    pub fn new(config: GroupByConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GroupByConfig {
        &self.config
    }

    /// Evaluates the group-by block rooted at `node`.
    ///
    /// Appends one [`GroupResults`] per row of `node.uid_matrix`, binds any
    /// declared variables into `vars`, and then drops `node.children`,
    /// which the grouped output replaces.
    ///
    /// On error neither `node` nor `vars` is modified.
    pub fn process_group_by(
        &self,
        node: &mut ResultNode,
        vars: &mut VarTable,
        path: &[String],
    ) -> Result<()> {
        self.check_aggregate_limit(node)?;

        let mut rows = Vec::with_capacity(node.uid_matrix.len());
        for row in &node.uid_matrix {
            rows.push(self.form_result(node, row)?);
        }
        debug!(
            attr = %node.attr,
            rows = rows.len(),
            groups = rows.iter().map(GroupResults::len).sum::<usize>(),
            "formed groupby results"
        );

        let bound = self.fill_grouped_vars(node, path)?;

        node.group_by_results.extend(rows);
        vars.extend(bound);
        node.children.clear();
        Ok(())
    }

    fn check_aggregate_limit(&self, node: &ResultNode) -> Result<()> {
        let requested = aggregate_children(node)
            .filter(|c| c.params.do_count || c.aggregate_function().is_some())
            .count();
        if requested > self.config.max_aggregates {
            return Err(GroupByError::TooManyAggregates {
                requested,
                limit: self.config.max_aggregates,
            });
        }
        Ok(())
    }

    /// Groups and aggregates one row.
    fn form_result(&self, node: &ResultNode, row: &UidList) -> Result<GroupResults> {
        let Grouping { mut results, .. } = self.group(node, Some(row))?;

        for child in aggregate_children(node) {
            aggregate_all(&mut results.groups, child)?;
        }
        sort_groups(&mut results.groups);

        Ok(results)
    }

    /// Groups over every source of the grouping children and returns the
    /// variables declared on aggregate fields.
    ///
    /// Each variable is bound right after its own field is aggregated, to
    /// the last aggregate the group holds at that point.
    fn fill_grouped_vars(&self, node: &ResultNode, path: &[String]) -> Result<VarTable> {
        let mut vars = VarTable::new();
        if !node.children.iter().any(|c| c.params.var.is_some()) {
            return Ok(vars);
        }

        let Grouping {
            mut results,
            path_attr,
        } = self.group(node, None)?;

        for child in aggregate_children(node) {
            aggregate_all(&mut results.groups, child)?;

            let Some(var) = &child.params.var else {
                continue;
            };
            let vals = bind_var(var, &results.groups)?;
            debug!(var = %var, bound = vals.len(), "bound groupby variable");

            let mut var_path = path.to_vec();
            var_path.extend(path_attr.clone());
            vars.insert(
                var.clone(),
                VarValue {
                    vals,
                    path: var_path,
                },
            );
        }
        Ok(vars)
    }

    /// Builds the groups of `node` over `scope`.
    ///
    /// With a scope, each grouping child only contributes sources inside
    /// it; without one, all of its sources.
    fn group(&self, node: &ResultNode, scope: Option<&UidList>) -> Result<Grouping> {
        let mut dedup = Dedup::new();
        let mut path_attr = None;

        for child in node.children.iter().filter(|c| c.params.is_group_key) {
            let attr = child.field_name();
            let sources = match scope {
                Some(scope) => Cow::Owned(child.src_uids.intersect(scope)),
                None => Cow::Borrowed(&child.src_uids),
            };

            if child.is_value_node() {
                sources.try_for_each(|src| {
                    if let Some(value) = child.values_of(src).and_then(<[Value]>::first) {
                        dedup.add_value(attr, value.clone(), src);
                    }
                    Ok(())
                })?;
            } else {
                sources.try_for_each(|src| {
                    let Some(adjacent) = child.uids_of(src) else {
                        return Ok(());
                    };
                    adjacent.try_for_each(|dest| {
                        dedup.add_value(attr, Value::Uid(dest), src);
                        Ok(())
                    })
                })?;
                path_attr = Some(child.attr.clone());
            }
        }

        let mut results = GroupResults::default();
        results.form_groups(&dedup, &UidList::new(), &[], self.config.max_groups)?;
        Ok(Grouping { results, path_attr })
    }
}

/// Children that produce output rather than grouping keys.
fn aggregate_children(node: &ResultNode) -> impl Iterator<Item = &ResultNode> {
    node.children.iter().filter(|c| !c.params.is_group_key)
}

fn aggregate_all(groups: &mut [GroupResult], child: &ResultNode) -> Result<()> {
    for grp in groups {
        grp.aggregate_child(child)?;
    }
    Ok(())
}

/// Maps each group's single uid key to its last aggregate.
///
/// Groups without any aggregate are left out.
fn bind_var(var: &str, groups: &[GroupResult]) -> Result<BTreeMap<u64, Value>> {
    let mut vals = BTreeMap::new();
    for grp in groups {
        let [key] = grp.keys.as_slice() else {
            return Err(GroupByError::VarRequiresSingleKey {
                var: var.to_string(),
                found: grp.keys.len(),
            });
        };
        let Some(uid) = key.value.as_uid() else {
            return Err(GroupByError::VarRequiresUidKey {
                var: var.to_string(),
                attr: key.attr.clone(),
            });
        };
        if let Some(last) = grp.aggregates.last() {
            vals.insert(uid, last.value.clone());
        }
    }
    Ok(vals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupPair;

    #[test]
    fn test_new_rejects_zero_limits() {
        let zero_groups = GroupByConfig {
            max_groups: 0,
            ..GroupByConfig::default()
        };
        assert!(matches!(
            GroupByEvaluator::new(zero_groups),
            Err(ConfigError::ValidationError(_))
        ));

        let config = GroupByConfig {
            max_aggregates: 3,
            ..GroupByConfig::default()
        };
        let evaluator = GroupByEvaluator::new(config.clone()).unwrap();
        assert_eq!(evaluator.config(), &config);
    }

    #[test]
    fn test_bind_var_takes_last_aggregate() {
        let groups = vec![
            GroupResult {
                keys: vec![GroupPair::new("friend", Value::Uid(10))],
                aggregates: vec![
                    GroupPair::new("count", Value::Int(2)),
                    GroupPair::new("min(age)", Value::Int(18)),
                ],
                uids: UidList::from(vec![1, 2]),
            },
            GroupResult {
                keys: vec![GroupPair::new("friend", Value::Uid(11))],
                aggregates: vec![],
                uids: UidList::from(vec![3]),
            },
        ];
        let vals = bind_var("a", &groups).unwrap();
        assert_eq!(vals.len(), 1);
        assert_eq!(vals[&10], Value::Int(18));
    }

    #[test]
    fn test_bind_var_rejects_two_keys() {
        let groups = vec![GroupResult {
            keys: vec![
                GroupPair::new("friend", Value::Uid(10)),
                GroupPair::new("city", Value::from("Oslo")),
            ],
            aggregates: vec![],
            uids: UidList::from(vec![1]),
        }];
        assert_eq!(
            bind_var("a", &groups).unwrap_err(),
            GroupByError::VarRequiresSingleKey {
                var: "a".to_string(),
                found: 2
            }
        );
    }

    #[test]
    fn test_bind_var_rejects_non_uid_key() {
        let groups = vec![GroupResult {
            keys: vec![GroupPair::new("city", Value::from("Oslo"))],
            aggregates: vec![GroupPair::new("count", Value::Int(1))],
            uids: UidList::from(vec![1]),
        }];
        assert_eq!(
            bind_var("a", &groups).unwrap_err(),
            GroupByError::VarRequiresUidKey {
                var: "a".to_string(),
                attr: "city".to_string()
            }
        );
    }
}

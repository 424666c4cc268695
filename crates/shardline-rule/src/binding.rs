//! Binding-table groups: logic tables routed together by shard position.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use shardline_core::canonical_name;

use crate::algorithm::ShardingAlgorithm;
use crate::error::{BindingMismatch, ShardingError};
use crate::table::{ShardingScope, ShardingTable};

/// What validation needs beyond the member tables.
#[derive(Debug, Clone, Copy)]
pub struct BindingCheckContext<'a> {
    pub default_sharding_column: Option<&'a str>,
    /// Algorithms keyed by canonical name.
    pub sharding_algorithms: &'a HashMap<String, Arc<dyn ShardingAlgorithm>>,
}

/// Logic tables that always resolve to shard-aligned actual tables.
#[derive(Debug)]
pub struct BindingTableRule {
    name: String,
    sharding_tables: IndexMap<String, Arc<ShardingTable>>,
}

impl BindingTableRule {
    /// Builds the group, failing if any two members disagree on topology or
    /// on an explicitly configured strategy.
    pub fn new(
        name: impl Into<String>,
        tables: Vec<Arc<ShardingTable>>,
        context: &BindingCheckContext<'_>,
    ) -> Result<Self, ShardingError> {
        let name = name.into();
        check_topology(&tables).map_err(|mismatch| ShardingError::binding(&name, mismatch))?;
        check_strategies(&tables, context).map_err(|mismatch| ShardingError::binding(&name, mismatch))?;

        let sharding_tables = tables
            .into_iter()
            .map(|table| (canonical_name(table.logic_table()), table))
            .collect();
        Ok(Self {
            name,
            sharding_tables,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_logic_table(&self, logic_table: &str) -> bool {
        self.sharding_tables.contains_key(&canonical_name(logic_table))
    }

    pub fn sharding_tables(&self) -> impl Iterator<Item = &ShardingTable> {
        self.sharding_tables.values().map(Arc::as_ref)
    }

    /// Member logic table names in declaration order.
    pub fn get_all_logic_tables(&self) -> Vec<&str> {
        self.sharding_tables
            .values()
            .map(|table| table.logic_table())
            .collect()
    }

    fn member(&self, logic_table: &str) -> Result<&ShardingTable, ShardingError> {
        self.sharding_tables
            .get(&canonical_name(logic_table))
            .map(Arc::as_ref)
            .ok_or_else(|| ShardingError::BindingTableNotFound {
                logic_table: logic_table.to_string(),
            })
    }

    /// The actual table of `to_logic_table` at the same node position as
    /// `from_actual_table` within `from_logic_table`.
    pub fn get_binding_actual_table(
        &self,
        data_source_name: &str,
        from_logic_table: &str,
        to_logic_table: &str,
        from_actual_table: &str,
    ) -> Result<String, ShardingError> {
        let from = self.member(from_logic_table)?;
        let index = from
            .find_actual_table_index(data_source_name, from_actual_table)
            .ok_or_else(|| ShardingError::ActualTableNotFound {
                data_source: data_source_name.to_string(),
                table: from_actual_table.to_string(),
            })?;
        let to = self.member(to_logic_table)?;
        to.actual_data_nodes()
            .get(index)
            .filter(|node| node.data_source_name.eq_ignore_ascii_case(data_source_name))
            .map(|node| node.table_name.clone())
            .ok_or_else(|| ShardingError::ActualTableNotFound {
                data_source: data_source_name.to_string(),
                table: to_logic_table.to_string(),
            })
    }

    /// Actual tables of the other members in `available_logic_tables` that
    /// bind to `actual_table` of `logic_table`, keyed by logic table.
    pub fn get_logic_and_actual_tables(
        &self,
        data_source_name: &str,
        logic_table: &str,
        actual_table: &str,
        available_logic_tables: &[&str],
    ) -> Result<IndexMap<String, String>, ShardingError> {
        let mut result = IndexMap::new();
        for other in available_logic_tables {
            if other.eq_ignore_ascii_case(logic_table) || !self.has_logic_table(other) {
                continue;
            }
            let bound = self.get_binding_actual_table(data_source_name, logic_table, other, actual_table)?;
            result.insert(other.to_string(), bound);
        }
        Ok(result)
    }
}

fn check_topology(tables: &[Arc<ShardingTable>]) -> Result<(), BindingMismatch> {
    let Some((first, others)) = tables.split_first() else {
        return Ok(());
    };
    let first_sources = canonical_set(first.actual_data_source_names());
    for other in others {
        if canonical_set(other.actual_data_source_names()) != first_sources {
            return Err(BindingMismatch::DataSources {
                first: first.logic_table().to_string(),
                other: other.logic_table().to_string(),
            });
        }
        for data_source in first.actual_data_source_names() {
            if first.actual_table_names(data_source).len() != other.actual_table_names(data_source).len() {
                return Err(BindingMismatch::TableCount {
                    first: first.logic_table().to_string(),
                    other: other.logic_table().to_string(),
                    data_source: data_source.to_string(),
                });
            }
        }
        // Binding lookups pair nodes by position.
        let aligned = first
            .actual_data_nodes()
            .iter()
            .zip(other.actual_data_nodes())
            .all(|(left, right)| left.data_source_name.eq_ignore_ascii_case(&right.data_source_name));
        if !aligned {
            return Err(BindingMismatch::DataSources {
                first: first.logic_table().to_string(),
                other: other.logic_table().to_string(),
            });
        }
    }
    Ok(())
}

fn check_strategies(
    tables: &[Arc<ShardingTable>],
    context: &BindingCheckContext<'_>,
) -> Result<(), BindingMismatch> {
    for scope in ShardingScope::ALL {
        let configured: Vec<&ShardingTable> = tables
            .iter()
            .map(Arc::as_ref)
            .filter(|table| !sharding_columns(table, scope, context).is_empty())
            .collect();
        for (position, first) in configured.iter().enumerate() {
            for other in &configured[position + 1..] {
                check_strategy_pair(first, other, scope, context)?;
            }
        }
    }
    Ok(())
}

fn check_strategy_pair(
    first: &ShardingTable,
    other: &ShardingTable,
    scope: ShardingScope,
    context: &BindingCheckContext<'_>,
) -> Result<(), BindingMismatch> {
    let first_columns = sharding_columns(first, scope, context);
    let other_columns = sharding_columns(other, scope, context);
    if canonical_set(first_columns.iter().copied()) != canonical_set(other_columns.iter().copied()) {
        return Err(BindingMismatch::ShardingColumn {
            first: first.logic_table().to_string(),
            other: other.logic_table().to_string(),
            scope,
        });
    }

    let first_structure = algorithm_structure(first, scope, &first_columns, context);
    let other_structure = algorithm_structure(other, scope, &other_columns, context);
    if let (Some(first_structure), Some(other_structure)) = (first_structure, other_structure) {
        if first_structure != other_structure {
            return Err(BindingMismatch::AlgorithmExpression {
                first: first.logic_table().to_string(),
                other: other.logic_table().to_string(),
                scope,
            });
        }
    }
    Ok(())
}

fn sharding_columns<'a>(
    table: &'a ShardingTable,
    scope: ShardingScope,
    context: &BindingCheckContext<'a>,
) -> Vec<&'a str> {
    table
        .strategy(scope)
        .map(|strategy| strategy.sharding_columns(context.default_sharding_column))
        .unwrap_or_default()
}

fn algorithm_structure(
    table: &ShardingTable,
    scope: ShardingScope,
    columns: &[&str],
    context: &BindingCheckContext<'_>,
) -> Option<String> {
    let algorithm_name = table.strategy(scope)?.sharding_algorithm_name()?;
    let algorithm = context.sharding_algorithms.get(&canonical_name(algorithm_name))?;
    let column = columns.first()?;
    algorithm.algorithm_structure(table.data_node_info(scope).prefix(), column)
}

fn canonical_set<'a>(names: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    names.into_iter().map(canonical_name).collect()
}

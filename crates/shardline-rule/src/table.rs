//! Per-logic-table sharding metadata.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use shardline_core::{
    canonical_name, AuditStrategyConfiguration, DataNode, DataNodeExpander, DataNodeInfo,
    KeyGenerateStrategyConfiguration, ShardingStrategyConfiguration, TableRuleConfiguration,
    DEFAULT_PADDING_CHAR,
};

use crate::algorithm::ShardingAlgorithm;
use crate::error::ShardingError;

/// The two levels a strategy can shard at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardingScope {
    Database,
    Table,
}

impl ShardingScope {
    pub const ALL: [ShardingScope; 2] = [ShardingScope::Database, ShardingScope::Table];
}

impl fmt::Display for ShardingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::Table => f.write_str("table"),
        }
    }
}

/// A logic table and the actual data nodes it resolves to.
///
/// Node order is the expansion order of the configured expression and is
/// significant: binding tables correspond by position.
#[derive(Debug)]
pub struct ShardingTable {
    logic_table: String,
    actual_data_nodes: Vec<DataNode>,
    actual_tables: HashSet<String>,
    data_node_index: HashMap<(String, String), usize>,
    data_node_groups: IndexMap<String, Vec<DataNode>>,
    database_strategy: Option<ShardingStrategyConfiguration>,
    table_strategy: Option<ShardingStrategyConfiguration>,
    generate_key_column: Option<String>,
    key_generator_name: Option<String>,
    audit_strategy: Option<AuditStrategyConfiguration>,
    sharding_algorithm: Option<Arc<dyn ShardingAlgorithm>>,
    table_data_node: DataNodeInfo,
    data_source_data_node: DataNodeInfo,
}

/// Everything needed to assemble a table once its nodes are known.
pub(crate) struct TableParts<'a> {
    pub logic_table: &'a str,
    pub actual_data_nodes: Vec<DataNode>,
    pub database_strategy: Option<ShardingStrategyConfiguration>,
    pub table_strategy: Option<ShardingStrategyConfiguration>,
    pub key_generate_strategy: Option<&'a KeyGenerateStrategyConfiguration>,
    pub default_generate_key_column: Option<&'a str>,
    pub audit_strategy: Option<AuditStrategyConfiguration>,
    pub sharding_algorithm: Option<Arc<dyn ShardingAlgorithm>>,
}

impl ShardingTable {
    /// Builds a table with explicitly enumerated nodes.
    ///
    /// Without a node expression the table gets one node named after the
    /// logic table on each known data source, which requires a table
    /// strategy to pick among them.
    pub fn from_config(
        config: &TableRuleConfiguration,
        data_source_names: &[String],
        default_generate_key_column: Option<&str>,
    ) -> Result<Self, ShardingError> {
        let missing = || ShardingError::MissingDataNodes {
            logic_table: config.logic_table.clone(),
        };

        let actual_data_nodes = match config
            .actual_data_nodes
            .as_deref()
            .map(str::trim)
            .filter(|expression| !expression.is_empty())
        {
            Some(expression) => DataNodeExpander::expand(expression)?,
            None => {
                let has_table_strategy = config
                    .table_strategy
                    .as_ref()
                    .is_some_and(|strategy| !strategy.is_none());
                if !has_table_strategy {
                    return Err(missing());
                }
                data_source_names
                    .iter()
                    .map(|data_source| DataNode::new(data_source, &config.logic_table))
                    .collect()
            }
        };
        if actual_data_nodes.is_empty() {
            return Err(missing());
        }

        Ok(Self::assemble(TableParts {
            logic_table: &config.logic_table,
            actual_data_nodes,
            database_strategy: config.database_strategy.clone(),
            table_strategy: config.table_strategy.clone(),
            key_generate_strategy: config.key_generate_strategy.as_ref(),
            default_generate_key_column,
            audit_strategy: config.audit_strategy.clone(),
            sharding_algorithm: None,
        }))
    }

    pub(crate) fn assemble(parts: TableParts<'_>) -> Self {
        let logic_table = parts.logic_table.to_string();
        let nodes = parts.actual_data_nodes;

        let mut data_node_index = HashMap::with_capacity(nodes.len());
        let mut data_node_groups: IndexMap<String, Vec<DataNode>> = IndexMap::new();
        let mut actual_tables = HashSet::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            data_node_index
                .entry((
                    canonical_name(&node.data_source_name),
                    canonical_name(&node.table_name),
                ))
                .or_insert(index);
            actual_tables.insert(canonical_name(&node.table_name));
            let existing = data_node_groups
                .keys()
                .position(|name| name.eq_ignore_ascii_case(&node.data_source_name));
            let group = match existing {
                Some(position) => &mut data_node_groups[position],
                None => data_node_groups
                    .entry(node.data_source_name.clone())
                    .or_default(),
            };
            group.push(node.clone());
        }

        let (table_data_node, data_source_data_node) = match nodes.first() {
            Some(first) => (
                DataNodeInfo::extract(&logic_table, &first.table_name, false)
                    .narrow_suffix(nodes.iter().map(|node| node.table_name.as_str())),
                DataNodeInfo::extract(&logic_table, &first.data_source_name, true)
                    .narrow_suffix(nodes.iter().map(|node| node.data_source_name.as_str())),
            ),
            None => (
                DataNodeInfo::new(logic_table.as_str(), 0, DEFAULT_PADDING_CHAR),
                DataNodeInfo::new("", 0, DEFAULT_PADDING_CHAR),
            ),
        };

        let generate_key_column = parts
            .key_generate_strategy
            .map(|strategy| strategy.column.as_str())
            .filter(|column| !column.is_empty())
            .or(parts.default_generate_key_column)
            .map(str::to_string);
        let key_generator_name = parts
            .key_generate_strategy
            .map(|strategy| strategy.key_generator_name.clone());

        tracing::debug!(
            logic_table = %logic_table,
            nodes = nodes.len(),
            data_sources = data_node_groups.len(),
            "built sharding table"
        );

        Self {
            logic_table,
            actual_data_nodes: nodes,
            actual_tables,
            data_node_index,
            data_node_groups,
            database_strategy: parts.database_strategy,
            table_strategy: parts.table_strategy,
            generate_key_column,
            key_generator_name,
            audit_strategy: parts.audit_strategy,
            sharding_algorithm: parts.sharding_algorithm,
            table_data_node,
            data_source_data_node,
        }
    }

    pub fn logic_table(&self) -> &str {
        &self.logic_table
    }

    pub fn actual_data_nodes(&self) -> &[DataNode] {
        &self.actual_data_nodes
    }

    /// Distinct data source names, in node order.
    pub fn actual_data_source_names(&self) -> Vec<&str> {
        self.data_node_groups.keys().map(String::as_str).collect()
    }

    /// Actual table names on one data source, in node order. Empty if the
    /// data source is unknown to this table.
    pub fn actual_table_names(&self, data_source_name: &str) -> Vec<&str> {
        self.data_nodes_on(data_source_name)
            .iter()
            .map(|node| node.table_name.as_str())
            .collect()
    }

    /// Position of the node within `actual_data_nodes`, if present.
    pub fn find_actual_table_index(&self, data_source_name: &str, table_name: &str) -> Option<usize> {
        self.data_node_index
            .get(&(canonical_name(data_source_name), canonical_name(table_name)))
            .copied()
    }

    pub fn is_existed(&self, actual_table_name: &str) -> bool {
        self.actual_tables.contains(&canonical_name(actual_table_name))
    }

    pub fn data_node_groups(&self) -> &IndexMap<String, Vec<DataNode>> {
        &self.data_node_groups
    }

    fn data_nodes_on(&self, data_source_name: &str) -> &[DataNode] {
        self.data_node_groups
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(data_source_name))
            .map(|(_, nodes)| nodes.as_slice())
            .unwrap_or_default()
    }

    pub fn table_data_node(&self) -> &DataNodeInfo {
        &self.table_data_node
    }

    pub fn data_source_data_node(&self) -> &DataNodeInfo {
        &self.data_source_data_node
    }

    pub fn database_strategy(&self) -> Option<&ShardingStrategyConfiguration> {
        self.database_strategy.as_ref()
    }

    pub fn table_strategy(&self) -> Option<&ShardingStrategyConfiguration> {
        self.table_strategy.as_ref()
    }

    /// The table's own strategy at `scope`, if it configures one.
    pub fn strategy(&self, scope: ShardingScope) -> Option<&ShardingStrategyConfiguration> {
        match scope {
            ShardingScope::Database => self.database_strategy(),
            ShardingScope::Table => self.table_strategy(),
        }
    }

    /// The descriptor of target names at `scope`.
    pub fn data_node_info(&self, scope: ShardingScope) -> &DataNodeInfo {
        match scope {
            ShardingScope::Database => &self.data_source_data_node,
            ShardingScope::Table => &self.table_data_node,
        }
    }

    pub fn generate_key_column(&self) -> Option<&str> {
        self.generate_key_column.as_deref()
    }

    pub fn key_generator_name(&self) -> Option<&str> {
        self.key_generator_name.as_deref()
    }

    pub fn audit_strategy(&self) -> Option<&AuditStrategyConfiguration> {
        self.audit_strategy.as_ref()
    }

    /// The auto-table algorithm that synthesized the nodes.
    pub fn sharding_algorithm(&self) -> Option<&Arc<dyn ShardingAlgorithm>> {
        self.sharding_algorithm.as_ref()
    }

    pub fn is_auto_table(&self) -> bool {
        self.sharding_algorithm.is_some()
    }
}

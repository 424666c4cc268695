//! Tables whose actual nodes are synthesized by an auto-table algorithm.

use std::sync::Arc;

use shardline_core::{inline, AutoTableRuleConfiguration, DataNode, ShardingStrategyConfiguration};

use crate::algorithm::ShardingAlgorithm;
use crate::error::ShardingError;
use crate::table::{ShardingTable, TableParts};

/// Places `sharding_count` tables round-robin over the candidate data
/// sources: table `i` is `{logic_table}_{i}` on `candidates[i % len]`.
pub fn auto_table_data_nodes(
    logic_table: &str,
    candidates: &[String],
    sharding_count: usize,
) -> Vec<DataNode> {
    if candidates.is_empty() {
        return Vec::new();
    }
    (0..sharding_count)
        .map(|index| {
            DataNode::new(
                &candidates[index % candidates.len()],
                format!("{logic_table}_{index}"),
            )
        })
        .collect()
}

impl ShardingTable {
    /// Builds an auto table. Candidates come from the table's
    /// `actual_data_sources` expression, else all known data sources.
    pub fn from_auto_config(
        config: &AutoTableRuleConfiguration,
        data_source_names: &[String],
        sharding_algorithm: Arc<dyn ShardingAlgorithm>,
        default_generate_key_column: Option<&str>,
    ) -> Result<Self, ShardingError> {
        let strategy = config
            .sharding_strategy
            .clone()
            .filter(|strategy| !strategy.is_none())
            .ok_or_else(|| ShardingError::MissingDataNodes {
                logic_table: config.logic_table.clone(),
            })?;

        let algorithm_name = strategy.sharding_algorithm_name().unwrap_or_default();
        let sharding_count = sharding_algorithm.auto_tables_amount().ok_or_else(|| {
            ShardingError::algorithm(
                algorithm_name,
                format!(
                    "`{}` is not an auto-table algorithm and cannot shard auto table `{}`",
                    sharding_algorithm.algorithm_type(),
                    config.logic_table
                ),
            )
        })?;

        let candidates = match config
            .actual_data_sources
            .as_deref()
            .map(str::trim)
            .filter(|expression| !expression.is_empty())
        {
            Some(expression) => inline::split_and_evaluate(expression)?,
            None => data_source_names.to_vec(),
        };

        let actual_data_nodes = auto_table_data_nodes(&config.logic_table, &candidates, sharding_count);
        tracing::debug!(
            logic_table = %config.logic_table,
            sharding_count,
            candidates = candidates.len(),
            "synthesized auto table nodes"
        );

        Ok(Self::assemble(TableParts {
            logic_table: &config.logic_table,
            actual_data_nodes,
            database_strategy: Some(ShardingStrategyConfiguration::None),
            table_strategy: Some(strategy),
            key_generate_strategy: config.key_generate_strategy.as_ref(),
            default_generate_key_column,
            audit_strategy: config.audit_strategy.clone(),
            sharding_algorithm: Some(sharding_algorithm),
        }))
    }
}

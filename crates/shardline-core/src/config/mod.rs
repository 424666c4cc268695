//! Sharding rule configuration.
//!
//! A `ShardingRuleConfiguration` is the input from which a sharding rule is
//! built. It can be assembled programmatically or loaded from YAML:
//!
//! ```yaml
//! tables:
//!   - logic_table: t_order
//!     actual_data_nodes: ds_${0..1}.t_order_${0..1}
//!     table_strategy:
//!       standard:
//!         sharding_column: order_id
//!         sharding_algorithm_name: t_order_inline
//! binding_tables:
//!   - t_order, t_order_item
//! sharding_algorithms:
//!   t_order_inline:
//!     type: INLINE
//!     props:
//!       algorithm-expression: t_order_${order_id % 2}
//! ```

pub mod strategy;
pub mod table;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub use strategy::{
    AlgorithmConfiguration, AuditStrategyConfiguration, KeyGenerateStrategyConfiguration,
    Properties, ShardingStrategyConfiguration,
};
pub use table::{AutoTableRuleConfiguration, BindingTableGroupConfiguration, TableRuleConfiguration};

/// Complete sharding rule configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardingRuleConfiguration {
    /// Tables with explicit actual data nodes.
    #[serde(default)]
    pub tables: Vec<TableRuleConfiguration>,

    /// Tables whose nodes are synthesized by an auto-table algorithm.
    #[serde(default)]
    pub auto_tables: Vec<AutoTableRuleConfiguration>,

    #[serde(default)]
    pub binding_tables: Vec<BindingTableGroupConfiguration>,

    /// Tables replicated identically to every data source.
    #[serde(default)]
    pub broadcast_tables: Vec<String>,

    #[serde(default)]
    pub default_database_strategy: Option<ShardingStrategyConfiguration>,

    #[serde(default)]
    pub default_table_strategy: Option<ShardingStrategyConfiguration>,

    #[serde(default)]
    pub default_key_generate_strategy: Option<KeyGenerateStrategyConfiguration>,

    #[serde(default)]
    pub default_audit_strategy: Option<AuditStrategyConfiguration>,

    /// Column used by standard strategies that do not name one.
    #[serde(default)]
    pub default_sharding_column: Option<String>,

    #[serde(default)]
    pub sharding_algorithms: HashMap<String, AlgorithmConfiguration>,

    #[serde(default)]
    pub key_generators: HashMap<String, AlgorithmConfiguration>,

    #[serde(default)]
    pub auditors: HashMap<String, AlgorithmConfiguration>,
}

impl ShardingRuleConfiguration {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Serialize the configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::from)
    }

    /// Logic table names of explicit and auto tables, in declaration order.
    pub fn logic_table_names(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .map(|table| table.logic_table.as_str())
            .chain(self.auto_tables.iter().map(|table| table.logic_table.as_str()))
    }
}

/// Error type for configuration loading and expression evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An inline expression could not be evaluated.
    #[error("invalid inline expression `{expression}`: {reason}")]
    InvalidInlineExpression { expression: String, reason: String },

    /// A data node is not of the form `ds.table` or `ds.catalog.table`.
    #[error("invalid data node `{0}`")]
    InvalidDataNode(String),
}

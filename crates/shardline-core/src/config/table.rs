//! Per-table rule configuration.

use serde::{Deserialize, Serialize};

use super::strategy::{
    AuditStrategyConfiguration, KeyGenerateStrategyConfiguration, ShardingStrategyConfiguration,
};

/// A logic table with explicitly enumerated actual data nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRuleConfiguration {
    pub logic_table: String,

    /// Inline expression such as `ds_${0..1}.t_order_${0..3}`.
    #[serde(default)]
    pub actual_data_nodes: Option<String>,

    #[serde(default)]
    pub database_strategy: Option<ShardingStrategyConfiguration>,

    #[serde(default)]
    pub table_strategy: Option<ShardingStrategyConfiguration>,

    #[serde(default)]
    pub key_generate_strategy: Option<KeyGenerateStrategyConfiguration>,

    #[serde(default)]
    pub audit_strategy: Option<AuditStrategyConfiguration>,
}

impl TableRuleConfiguration {
    pub fn new(logic_table: impl Into<String>, actual_data_nodes: Option<&str>) -> Self {
        Self {
            logic_table: logic_table.into(),
            actual_data_nodes: actual_data_nodes.map(str::to_string),
            database_strategy: None,
            table_strategy: None,
            key_generate_strategy: None,
            audit_strategy: None,
        }
    }

    pub fn with_database_strategy(mut self, strategy: ShardingStrategyConfiguration) -> Self {
        self.database_strategy = Some(strategy);
        self
    }

    pub fn with_table_strategy(mut self, strategy: ShardingStrategyConfiguration) -> Self {
        self.table_strategy = Some(strategy);
        self
    }

    pub fn with_key_generate_strategy(mut self, strategy: KeyGenerateStrategyConfiguration) -> Self {
        self.key_generate_strategy = Some(strategy);
        self
    }

    pub fn with_audit_strategy(mut self, strategy: AuditStrategyConfiguration) -> Self {
        self.audit_strategy = Some(strategy);
        self
    }
}

/// A logic table whose actual nodes are synthesized by an auto-table algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTableRuleConfiguration {
    pub logic_table: String,

    /// Candidate data sources, e.g. `ds_${0..2}`. All known data sources
    /// when absent.
    #[serde(default)]
    pub actual_data_sources: Option<String>,

    #[serde(default)]
    pub sharding_strategy: Option<ShardingStrategyConfiguration>,

    #[serde(default)]
    pub key_generate_strategy: Option<KeyGenerateStrategyConfiguration>,

    #[serde(default)]
    pub audit_strategy: Option<AuditStrategyConfiguration>,
}

impl AutoTableRuleConfiguration {
    pub fn new(logic_table: impl Into<String>, actual_data_sources: Option<&str>) -> Self {
        Self {
            logic_table: logic_table.into(),
            actual_data_sources: actual_data_sources.map(str::to_string),
            sharding_strategy: None,
            key_generate_strategy: None,
            audit_strategy: None,
        }
    }

    pub fn with_sharding_strategy(mut self, strategy: ShardingStrategyConfiguration) -> Self {
        self.sharding_strategy = Some(strategy);
        self
    }

    pub fn with_key_generate_strategy(mut self, strategy: KeyGenerateStrategyConfiguration) -> Self {
        self.key_generate_strategy = Some(strategy);
        self
    }

    pub fn with_audit_strategy(mut self, strategy: AuditStrategyConfiguration) -> Self {
        self.audit_strategy = Some(strategy);
        self
    }
}

/// A binding-table group, written either as `"t_order, t_order_item"` or
/// as `{ name, reference }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingTableGroupConfiguration {
    Reference(String),
    Named {
        #[serde(default)]
        name: Option<String>,
        reference: String,
    },
}

impl BindingTableGroupConfiguration {
    /// The comma-joined logic table list.
    pub fn reference(&self) -> &str {
        match self {
            Self::Reference(reference) | Self::Named { reference, .. } => reference,
        }
    }

    /// Display name: the configured name, else the reference itself.
    pub fn name(&self) -> &str {
        match self {
            Self::Named {
                name: Some(name), ..
            } => name,
            _ => self.reference(),
        }
    }

    pub fn logic_tables(&self) -> Vec<&str> {
        self.reference()
            .split(',')
            .map(str::trim)
            .filter(|table| !table.is_empty())
            .collect()
    }
}

impl From<&str> for BindingTableGroupConfiguration {
    fn from(reference: &str) -> Self {
        Self::Reference(reference.to_string())
    }
}

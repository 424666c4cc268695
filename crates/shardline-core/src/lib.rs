//! # shardline-core
//!
//! Building blocks shared by the Shardline crates.
//!
//! - [`config`]: the sharding rule configuration model and its YAML loader
//! - [`DataNode`] and [`DataNodeExpander`]: physical locations and their
//!   expansion from inline expressions such as `ds_${0..1}.t_order_${0..2}`
//! - [`DataNodeInfo`]: prefix/suffix description of actual names
//! - [`inline`]: the inline expression evaluator
//!
//! Identifiers are compared case-insensitively throughout Shardline. Every
//! map keyed by a table, column or data source name uses
//! [`canonical_name`] as the key while keeping the original spelling for
//! display.

pub mod config;
pub mod datanode;
pub mod datanode_info;
pub mod inline;

pub use config::{
    AlgorithmConfiguration, AuditStrategyConfiguration, AutoTableRuleConfiguration,
    BindingTableGroupConfiguration, ConfigError, KeyGenerateStrategyConfiguration, Properties,
    ShardingRuleConfiguration, ShardingStrategyConfiguration, TableRuleConfiguration,
};
pub use datanode::{DataNode, DataNodeExpander};
pub use datanode_info::{DataNodeInfo, DEFAULT_PADDING_CHAR};

/// Canonical key for a case-insensitive identifier.
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

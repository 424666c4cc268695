//! # shardline-rule
//!
//! The sharding rule model for Shardline.
//!
//! This crate turns a [`ShardingRuleConfiguration`](shardline_core::ShardingRuleConfiguration)
//! into an immutable [`ShardingRule`] that a router can query:
//! - Expand every logic table into its ordered actual data nodes
//! - Synthesize nodes for auto tables from an auto-table algorithm
//! - Validate binding-table groups for aligned topology and strategies
//! - Answer routing questions (sharding columns, key generation, binding
//!   lookups, auditing) without touching the configuration again
//!
//! ## Example
//!
//! ```yaml
//! tables:
//!   - logic_table: t_order
//!     actual_data_nodes: ds_${0..1}.t_order_${0..1}
//!   - logic_table: t_order_item
//!     actual_data_nodes: ds_${0..1}.t_order_item_${0..1}
//! binding_tables:
//!   - t_order, t_order_item
//! ```
//!
//! `t_order_1` on `ds_1` always pairs with `t_order_item_1` on `ds_1`.
//!
//! Algorithms are pluggable: concrete implementations register factories in
//! an [`AlgorithmRegistry`] and the rule instantiates them by type name.

pub mod algorithm;
pub mod auto_table;
pub mod binding;
pub mod error;
pub mod rule;
pub mod schema;
pub mod statement;
pub mod table;

#[cfg(test)]
mod fixture;

pub use algorithm::{
    AlgorithmRegistry, AuditContext, KeyGenerateAlgorithm, PreciseShardingValue, ShardingAlgorithm,
    ShardingAuditAlgorithm, ShardingValue,
};
pub use auto_table::auto_table_data_nodes;
pub use binding::{BindingCheckContext, BindingTableRule};
pub use error::{BindingMismatch, ShardingError};
pub use rule::ShardingRule;
pub use schema::SchemaContext;
pub use statement::{
    ColumnEquality, ColumnRef, SqlAnalyzer, SqlOperation, SqlStatementContext, TableReference,
};
pub use table::{ShardingScope, ShardingTable};

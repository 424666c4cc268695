//! Error types for the rule crate.

use shardline_core::ConfigError;
use thiserror::Error;

use crate::table::ShardingScope;

/// Errors raised while building or querying a sharding rule.
#[derive(Debug, Error)]
pub enum ShardingError {
    /// Configuration could not be evaluated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A table has no actual nodes and no way to derive them.
    #[error("missing required data nodes for logic table `{logic_table}`")]
    MissingDataNodes { logic_table: String },

    /// Two logic tables claim the same actual data node.
    #[error("data node `{data_node}` is claimed by both `{first_table}` and `{second_table}`")]
    DuplicateDataNode {
        data_node: String,
        first_table: String,
        second_table: String,
    },

    /// A binding-table group is inconsistent.
    #[error("invalid binding tables `{group}`: {mismatch}")]
    InvalidBindingTables {
        group: String,
        #[source]
        mismatch: BindingMismatch,
    },

    /// An algorithm is unregistered, misconfigured or of the wrong kind.
    #[error("sharding algorithm `{name}` initialization failed: {reason}")]
    AlgorithmInitialization { name: String, reason: String },

    /// The logic table is not sharded.
    #[error("table rule not found for logic table `{0}`")]
    TableRuleNotFound(String),

    /// The logic table is not part of the binding group.
    #[error("binding table `{logic_table}` not found")]
    BindingTableNotFound { logic_table: String },

    /// No actual table at the requested position on the data source.
    #[error("actual table `{table}` not found on data source `{data_source}`")]
    ActualTableNotFound { data_source: String, table: String },

    /// Neither the table nor the rule configures a key generator.
    #[error("generate-key strategy not found for logic table `{0}`")]
    KeyGenerateStrategyNotFound(String),

    /// An auditor rejected the statement.
    #[error("audit `{auditor}` failed: {reason}")]
    AuditFailed { auditor: String, reason: String },

    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    SqlParse(String),
}

/// The attribute on which two members of a binding group disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingMismatch {
    #[error("`{0}` is not a sharding table")]
    UnknownTable(String),

    #[error("data sources of `{first}` and `{other}` differ")]
    DataSources { first: String, other: String },

    #[error("`{first}` and `{other}` have different table counts on data source `{data_source}`")]
    TableCount {
        first: String,
        other: String,
        data_source: String,
    },

    #[error("{scope} sharding columns of `{first}` and `{other}` differ")]
    ShardingColumn {
        first: String,
        other: String,
        scope: ShardingScope,
    },

    #[error("{scope} sharding algorithm expressions of `{first}` and `{other}` differ")]
    AlgorithmExpression {
        first: String,
        other: String,
        scope: ShardingScope,
    },
}

impl ShardingError {
    pub(crate) fn algorithm(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AlgorithmInitialization {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn binding(group: impl Into<String>, mismatch: BindingMismatch) -> Self {
        Self::InvalidBindingTables {
            group: group.into(),
            mismatch,
        }
    }
}

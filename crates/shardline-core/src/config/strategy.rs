//! Strategy and algorithm configuration.

use serde::{Deserialize, Serialize};

/// Free-form algorithm properties (`sharding-count`, `algorithm-expression`, ...).
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// How a shard value selects a data source or a table.
///
/// ```yaml
/// table_strategy:
///   standard:
///     sharding_column: order_id
///     sharding_algorithm_name: t_order_inline
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShardingStrategyConfiguration {
    /// One column routed by one algorithm. Without a column the rule's
    /// default sharding column applies.
    Standard {
        #[serde(default)]
        sharding_column: Option<String>,
        sharding_algorithm_name: String,
    },

    /// Several comma-separated columns routed together.
    Complex {
        sharding_columns: String,
        sharding_algorithm_name: String,
    },

    /// Shard values come from hints rather than columns.
    Hint { sharding_algorithm_name: String },

    /// No sharding at this scope.
    #[default]
    None,
}

impl ShardingStrategyConfiguration {
    pub fn standard(sharding_column: impl Into<String>, algorithm_name: impl Into<String>) -> Self {
        Self::Standard {
            sharding_column: Some(sharding_column.into()),
            sharding_algorithm_name: algorithm_name.into(),
        }
    }

    pub fn complex(sharding_columns: impl Into<String>, algorithm_name: impl Into<String>) -> Self {
        Self::Complex {
            sharding_columns: sharding_columns.into(),
            sharding_algorithm_name: algorithm_name.into(),
        }
    }

    pub fn hint(algorithm_name: impl Into<String>) -> Self {
        Self::Hint {
            sharding_algorithm_name: algorithm_name.into(),
        }
    }

    /// The algorithm this strategy routes with, if any.
    pub fn sharding_algorithm_name(&self) -> Option<&str> {
        match self {
            Self::Standard {
                sharding_algorithm_name,
                ..
            }
            | Self::Complex {
                sharding_algorithm_name,
                ..
            }
            | Self::Hint {
                sharding_algorithm_name,
            } => Some(sharding_algorithm_name),
            Self::None => None,
        }
    }

    /// Columns this strategy shards on, falling back to `default_column` for
    /// a standard strategy that names none. Hint and none strategies never
    /// contribute a column.
    pub fn sharding_columns<'a>(&'a self, default_column: Option<&'a str>) -> Vec<&'a str> {
        match self {
            Self::Standard {
                sharding_column, ..
            } => sharding_column
                .as_deref()
                .filter(|column| !column.is_empty())
                .or(default_column)
                .into_iter()
                .collect(),
            Self::Complex {
                sharding_columns, ..
            } => sharding_columns
                .split(',')
                .map(str::trim)
                .filter(|column| !column.is_empty())
                .collect(),
            Self::Hint { .. } | Self::None => Vec::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Which column receives generated keys and which generator produces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerateStrategyConfiguration {
    pub column: String,
    pub key_generator_name: String,
}

impl KeyGenerateStrategyConfiguration {
    pub fn new(column: impl Into<String>, key_generator_name: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            key_generator_name: key_generator_name.into(),
        }
    }
}

/// Auditors applied to statements touching a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStrategyConfiguration {
    #[serde(default)]
    pub auditor_names: Vec<String>,

    /// Whether a statement hint may switch the auditors off.
    #[serde(default = "default_allow_hint_disable")]
    pub allow_hint_disable: bool,
}

fn default_allow_hint_disable() -> bool {
    true
}

impl AuditStrategyConfiguration {
    pub fn new(auditor_names: Vec<String>, allow_hint_disable: bool) -> Self {
        Self {
            auditor_names,
            allow_hint_disable,
        }
    }
}

/// A named algorithm: its registered type plus properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfiguration {
    #[serde(rename = "type")]
    pub algorithm_type: String,

    #[serde(default)]
    pub props: Properties,
}

impl AlgorithmConfiguration {
    pub fn new(algorithm_type: impl Into<String>) -> Self {
        Self {
            algorithm_type: algorithm_type.into(),
            props: Properties::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }
}

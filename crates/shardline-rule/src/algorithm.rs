//! Algorithm capabilities and the registry that instantiates them.
//!
//! The rule never embeds concrete algorithms. Implementations register a
//! factory per algorithm type in an [`AlgorithmRegistry`], and the rule
//! resolves each named algorithm configuration through it at build time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use shardline_core::{canonical_name, AlgorithmConfiguration, DataNodeInfo, Properties};

use crate::error::ShardingError;
use crate::rule::ShardingRule;
use crate::statement::SqlStatementContext;

/// A shard key value, either produced by a key generator or read from SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShardingValue {
    Number(i64),
    Text(String),
}

impl ShardingValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ShardingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for ShardingValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ShardingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ShardingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A single shard value together with where it applies.
#[derive(Debug, Clone, Copy)]
pub struct PreciseShardingValue<'a> {
    pub logic_table: &'a str,
    pub column_name: &'a str,
    /// Descriptor of the target names (tables or data sources).
    pub data_node_info: &'a DataNodeInfo,
    pub value: &'a ShardingValue,
}

/// Maps shard values onto target names.
pub trait ShardingAlgorithm: Send + Sync + fmt::Debug {
    fn algorithm_type(&self) -> &str;

    /// Picks the target for `value` among `available_targets`, or `None` if
    /// the value does not resolve to any of them.
    fn do_sharding(
        &self,
        available_targets: &[String],
        value: &PreciseShardingValue<'_>,
    ) -> Option<String>;

    /// Structural form of the algorithm for binding-table comparison, with the
    /// target prefix and the sharding column abstracted away. `None` when the
    /// algorithm has no comparable structure.
    fn algorithm_structure(&self, _data_node_prefix: &str, _sharding_column: &str) -> Option<String> {
        None
    }

    /// Number of tables an auto-table algorithm creates. `None` for
    /// algorithms that route explicitly enumerated nodes.
    fn auto_tables_amount(&self) -> Option<usize> {
        None
    }
}

/// Produces primary-key values for inserts.
pub trait KeyGenerateAlgorithm: Send + Sync + fmt::Debug {
    fn algorithm_type(&self) -> &str;

    fn generate_key(&self) -> ShardingValue;

    /// True when keys come from the database's own auto-increment.
    fn is_support_auto_increment(&self) -> bool {
        false
    }
}

/// What an auditor gets to inspect.
#[derive(Debug, Clone, Copy)]
pub struct AuditContext<'a> {
    pub statement: &'a SqlStatementContext,
    pub rule: &'a ShardingRule,
}

/// Rejects statements before they are routed.
pub trait ShardingAuditAlgorithm: Send + Sync + fmt::Debug {
    fn algorithm_type(&self) -> &str;

    /// Returns the rejection reason when the statement must not run.
    fn check(&self, context: &AuditContext<'_>) -> Result<(), String>;
}

type ShardingFactory =
    Box<dyn Fn(&Properties) -> anyhow::Result<Arc<dyn ShardingAlgorithm>> + Send + Sync>;
type KeyGenerateFactory =
    Box<dyn Fn(&Properties) -> anyhow::Result<Arc<dyn KeyGenerateAlgorithm>> + Send + Sync>;
type AuditFactory =
    Box<dyn Fn(&Properties) -> anyhow::Result<Arc<dyn ShardingAuditAlgorithm>> + Send + Sync>;

/// Factories for every known algorithm type, keyed case-insensitively.
#[derive(Default)]
pub struct AlgorithmRegistry {
    sharding: HashMap<String, ShardingFactory>,
    key_generate: HashMap<String, KeyGenerateFactory>,
    audit: HashMap<String, AuditFactory>,
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("sharding", &sorted_keys(&self.sharding))
            .field("key_generate", &sorted_keys(&self.key_generate))
            .field("audit", &sorted_keys(&self.audit))
            .finish()
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_sharding_algorithm<F>(&mut self, algorithm_type: &str, factory: F) -> &mut Self
    where
        F: Fn(&Properties) -> anyhow::Result<Arc<dyn ShardingAlgorithm>> + Send + Sync + 'static,
    {
        self.sharding
            .insert(canonical_name(algorithm_type), Box::new(factory));
        self
    }

    pub fn register_key_generate_algorithm<F>(&mut self, algorithm_type: &str, factory: F) -> &mut Self
    where
        F: Fn(&Properties) -> anyhow::Result<Arc<dyn KeyGenerateAlgorithm>> + Send + Sync + 'static,
    {
        self.key_generate
            .insert(canonical_name(algorithm_type), Box::new(factory));
        self
    }

    pub fn register_audit_algorithm<F>(&mut self, algorithm_type: &str, factory: F) -> &mut Self
    where
        F: Fn(&Properties) -> anyhow::Result<Arc<dyn ShardingAuditAlgorithm>> + Send + Sync + 'static,
    {
        self.audit
            .insert(canonical_name(algorithm_type), Box::new(factory));
        self
    }

    pub fn contains_sharding_algorithm(&self, algorithm_type: &str) -> bool {
        self.sharding.contains_key(&canonical_name(algorithm_type))
    }

    /// Instantiates the sharding algorithm configured under `name`.
    pub fn create_sharding_algorithm(
        &self,
        name: &str,
        config: &AlgorithmConfiguration,
    ) -> Result<Arc<dyn ShardingAlgorithm>, ShardingError> {
        create(&self.sharding, "sharding", name, config)
    }

    /// Instantiates the key generator configured under `name`.
    pub fn create_key_generate_algorithm(
        &self,
        name: &str,
        config: &AlgorithmConfiguration,
    ) -> Result<Arc<dyn KeyGenerateAlgorithm>, ShardingError> {
        create(&self.key_generate, "key generate", name, config)
    }

    /// Instantiates the auditor configured under `name`.
    pub fn create_audit_algorithm(
        &self,
        name: &str,
        config: &AlgorithmConfiguration,
    ) -> Result<Arc<dyn ShardingAuditAlgorithm>, ShardingError> {
        create(&self.audit, "audit", name, config)
    }
}

fn create<T: ?Sized>(
    factories: &HashMap<String, Box<dyn Fn(&Properties) -> anyhow::Result<Arc<T>> + Send + Sync>>,
    kind: &str,
    name: &str,
    config: &AlgorithmConfiguration,
) -> Result<Arc<T>, ShardingError> {
    let factory = factories
        .get(&canonical_name(&config.algorithm_type))
        .ok_or_else(|| {
            ShardingError::algorithm(
                name,
                format!("unknown {kind} algorithm type `{}`", config.algorithm_type),
            )
        })?;
    factory(&config.props).map_err(|e| ShardingError::algorithm(name, format!("{e:#}")))
}

//! The sharding rule aggregate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use shardline_core::{
    canonical_name, inline, AlgorithmConfiguration, AuditStrategyConfiguration, DataNode,
    DataNodeExpander, ShardingRuleConfiguration, ShardingStrategyConfiguration,
};

use crate::algorithm::{
    AlgorithmRegistry, AuditContext, KeyGenerateAlgorithm, ShardingAlgorithm, ShardingAuditAlgorithm,
    ShardingValue,
};
use crate::binding::{BindingCheckContext, BindingTableRule};
use crate::error::{BindingMismatch, ShardingError};
use crate::schema::SchemaContext;
use crate::statement::{ColumnRef, SqlStatementContext};
use crate::table::{ShardingScope, ShardingTable};

/// Immutable sharding metadata queried by the router.
///
/// Built once from a [`ShardingRuleConfiguration`] and the known data
/// sources. A configuration change builds a new rule; nothing is mutated
/// after [`ShardingRule::build`] returns, so a rule can be shared freely
/// across threads.
#[derive(Debug)]
pub struct ShardingRule {
    data_source_names: Vec<String>,
    sharding_tables: IndexMap<String, Arc<ShardingTable>>,
    binding_table_rules: Vec<Arc<BindingTableRule>>,
    binding_index: HashMap<String, Arc<BindingTableRule>>,
    broadcast_tables: Vec<String>,
    broadcast_index: HashSet<String>,
    actual_table_index: HashMap<String, String>,
    default_database_strategy: ShardingStrategyConfiguration,
    default_table_strategy: ShardingStrategyConfiguration,
    default_sharding_column: Option<String>,
    default_generate_key_column: Option<String>,
    default_key_generator: Option<Arc<dyn KeyGenerateAlgorithm>>,
    default_audit_strategy: Option<AuditStrategyConfiguration>,
    sharding_algorithms: HashMap<String, Arc<dyn ShardingAlgorithm>>,
    key_generators: HashMap<String, Arc<dyn KeyGenerateAlgorithm>>,
    auditors: HashMap<String, Arc<dyn ShardingAuditAlgorithm>>,
}

impl ShardingRule {
    /// Builds a rule, validating every cross-reference. Any failure aborts
    /// the whole build.
    pub fn build<I, S>(
        config: &ShardingRuleConfiguration,
        data_source_names: I,
        registry: &AlgorithmRegistry,
    ) -> Result<Self, ShardingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known_data_sources: Vec<String> = data_source_names.into_iter().map(Into::into).collect();

        let sharding_algorithms = instantiate(&config.sharding_algorithms, |name, algorithm| {
            registry.create_sharding_algorithm(name, algorithm)
        })?;
        let key_generators = instantiate(&config.key_generators, |name, algorithm| {
            registry.create_key_generate_algorithm(name, algorithm)
        })?;
        let auditors = instantiate(&config.auditors, |name, algorithm| {
            registry.create_audit_algorithm(name, algorithm)
        })?;

        let validator = ReferenceValidator {
            sharding_algorithms: &sharding_algorithms,
            key_generators: &key_generators,
            auditors: &auditors,
        };
        validator.check_defaults(config)?;

        let default_key_generator = config
            .default_key_generate_strategy
            .as_ref()
            .map(|strategy| validator.key_generator(&strategy.key_generator_name, "default key generate strategy"))
            .transpose()?;
        let default_generate_key_column = config
            .default_key_generate_strategy
            .as_ref()
            .map(|strategy| strategy.column.clone())
            .filter(|column| !column.is_empty());

        let data_source_names = derive_data_source_names(config, &known_data_sources)?;

        let mut sharding_tables: IndexMap<String, Arc<ShardingTable>> = IndexMap::new();
        for table_config in &config.tables {
            validator.check_table_strategies(
                &table_config.logic_table,
                [
                    table_config.database_strategy.as_ref(),
                    table_config.table_strategy.as_ref(),
                ],
                false,
            )?;
            validator.check_table_extras(
                &table_config.logic_table,
                table_config.key_generate_strategy.as_ref().map(|s| s.key_generator_name.as_str()),
                table_config.audit_strategy.as_ref(),
            )?;
            let table = ShardingTable::from_config(
                table_config,
                &known_data_sources,
                default_generate_key_column.as_deref(),
            )?;
            insert_table(&mut sharding_tables, table);
        }
        for auto_config in &config.auto_tables {
            validator.check_table_strategies(
                &auto_config.logic_table,
                [auto_config.sharding_strategy.as_ref()],
                true,
            )?;
            validator.check_table_extras(
                &auto_config.logic_table,
                auto_config.key_generate_strategy.as_ref().map(|s| s.key_generator_name.as_str()),
                auto_config.audit_strategy.as_ref(),
            )?;
            let algorithm = auto_config
                .sharding_strategy
                .as_ref()
                .and_then(ShardingStrategyConfiguration::sharding_algorithm_name)
                .and_then(|name| sharding_algorithms.get(&canonical_name(name)))
                .cloned()
                .ok_or_else(|| ShardingError::MissingDataNodes {
                    logic_table: auto_config.logic_table.clone(),
                })?;
            let table = ShardingTable::from_auto_config(
                auto_config,
                &known_data_sources,
                algorithm,
                default_generate_key_column.as_deref(),
            )?;
            insert_table(&mut sharding_tables, table);
        }

        let actual_table_index = index_actual_tables(&sharding_tables)?;

        let check_context = BindingCheckContext {
            default_sharding_column: config.default_sharding_column.as_deref(),
            sharding_algorithms: &sharding_algorithms,
        };
        let mut binding_table_rules = Vec::with_capacity(config.binding_tables.len());
        let mut binding_index = HashMap::new();
        for group in &config.binding_tables {
            let logic_tables = group.logic_tables();
            if logic_tables.len() < 2 {
                tracing::warn!(group = group.name(), "binding table group names a single table");
            }
            let members = logic_tables
                .iter()
                .map(|logic_table| {
                    sharding_tables
                        .get(&canonical_name(logic_table))
                        .cloned()
                        .ok_or_else(|| {
                            ShardingError::binding(
                                group.name(),
                                BindingMismatch::UnknownTable(logic_table.to_string()),
                            )
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let binding = Arc::new(BindingTableRule::new(group.name(), members, &check_context)?);
            tracing::debug!(group = binding.name(), tables = logic_tables.len(), "built binding table rule");
            for logic_table in &logic_tables {
                binding_index.insert(canonical_name(logic_table), Arc::clone(&binding));
            }
            binding_table_rules.push(binding);
        }

        let broadcast_tables = config.broadcast_tables.clone();
        let broadcast_index = broadcast_tables.iter().map(|table| canonical_name(table)).collect();

        tracing::info!(
            tables = sharding_tables.len(),
            binding_groups = binding_table_rules.len(),
            broadcast_tables = broadcast_tables.len(),
            data_sources = data_source_names.len(),
            "built sharding rule"
        );

        Ok(Self {
            data_source_names,
            sharding_tables,
            binding_table_rules,
            binding_index,
            broadcast_tables,
            broadcast_index,
            actual_table_index,
            default_database_strategy: config.default_database_strategy.clone().unwrap_or_default(),
            default_table_strategy: config.default_table_strategy.clone().unwrap_or_default(),
            default_sharding_column: config.default_sharding_column.clone(),
            default_generate_key_column,
            default_key_generator,
            default_audit_strategy: config.default_audit_strategy.clone(),
            sharding_algorithms,
            key_generators,
            auditors,
        })
    }

    /// Data sources the rule's tables live on.
    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    pub fn sharding_tables(&self) -> impl Iterator<Item = &ShardingTable> {
        self.sharding_tables.values().map(Arc::as_ref)
    }

    pub fn binding_table_rules(&self) -> &[Arc<BindingTableRule>] {
        &self.binding_table_rules
    }

    pub fn broadcast_tables(&self) -> &[String] {
        &self.broadcast_tables
    }

    pub fn default_sharding_column(&self) -> Option<&str> {
        self.default_sharding_column.as_deref()
    }

    pub fn default_generate_key_column(&self) -> Option<&str> {
        self.default_generate_key_column.as_deref()
    }

    pub fn default_database_strategy(&self) -> &ShardingStrategyConfiguration {
        &self.default_database_strategy
    }

    pub fn default_table_strategy(&self) -> &ShardingStrategyConfiguration {
        &self.default_table_strategy
    }

    pub fn find_sharding_algorithm(&self, name: &str) -> Option<&Arc<dyn ShardingAlgorithm>> {
        self.sharding_algorithms.get(&canonical_name(name))
    }

    pub fn find_table_rule(&self, logic_table: &str) -> Option<&ShardingTable> {
        self.sharding_tables
            .get(&canonical_name(logic_table))
            .map(Arc::as_ref)
    }

    pub fn get_table_rule(&self, logic_table: &str) -> Result<&ShardingTable, ShardingError> {
        self.find_table_rule(logic_table)
            .ok_or_else(|| ShardingError::TableRuleNotFound(logic_table.to_string()))
    }

    pub fn find_table_rule_by_actual_table(&self, actual_table: &str) -> Option<&ShardingTable> {
        self.actual_table_index
            .get(&canonical_name(actual_table))
            .and_then(|logic_table| self.sharding_tables.get(logic_table))
            .map(Arc::as_ref)
    }

    pub fn find_logic_table_by_actual_table(&self, actual_table: &str) -> Option<&str> {
        self.find_table_rule_by_actual_table(actual_table)
            .map(ShardingTable::logic_table)
    }

    pub fn is_sharding_table(&self, logic_table: &str) -> bool {
        self.sharding_tables.contains_key(&canonical_name(logic_table))
    }

    /// True if any name is a sharded logic table or one of its actual tables.
    pub fn contains_sharding_table<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| {
            let name = name.as_ref();
            self.is_sharding_table(name) || self.actual_table_index.contains_key(&canonical_name(name))
        })
    }

    pub fn is_all_sharding_tables<S: AsRef<str>>(&self, logic_tables: &[S]) -> bool {
        !logic_tables.is_empty()
            && logic_tables
                .iter()
                .all(|name| self.is_sharding_table(name.as_ref()))
    }

    /// The sharded subset of `logic_tables`, in the given order.
    pub fn get_sharding_logic_table_names<S: AsRef<str>>(&self, logic_tables: &[S]) -> Vec<String> {
        logic_tables
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| self.is_sharding_table(name))
            .map(str::to_string)
            .collect()
    }

    pub fn is_broadcast_table(&self, logic_table: &str) -> bool {
        self.broadcast_index.contains(&canonical_name(logic_table))
    }

    pub fn is_all_broadcast_tables<S: AsRef<str>>(&self, logic_tables: &[S]) -> bool {
        !logic_tables.is_empty()
            && logic_tables
                .iter()
                .all(|name| self.is_broadcast_table(name.as_ref()))
    }

    pub fn find_binding_table_rule(&self, logic_table: &str) -> Option<&BindingTableRule> {
        self.binding_index
            .get(&canonical_name(logic_table))
            .map(Arc::as_ref)
    }

    /// True only if every name belongs to one common binding group.
    pub fn is_all_binding_tables<S: AsRef<str>>(&self, logic_tables: &[S]) -> bool {
        let Some(binding) = logic_tables
            .iter()
            .find_map(|name| self.find_binding_table_rule(name.as_ref()))
        else {
            return false;
        };
        logic_tables
            .iter()
            .all(|name| binding.has_logic_table(name.as_ref()))
    }

    /// The binding check for joins.
    ///
    /// Without a join this is [`Self::is_all_binding_tables`]. With one, the
    /// tables must also be joined on their sharding columns: for each scope
    /// at which the first table shards, an AND-connected equality must link
    /// the sharding columns of every named table. Predicates containing OR
    /// are not analyzed and yield `false`.
    pub fn is_all_binding_tables_for_statement<S: AsRef<str>>(
        &self,
        schema: &SchemaContext,
        statement: &SqlStatementContext,
        logic_tables: &[S],
    ) -> bool {
        if !self.is_all_binding_tables(logic_tables) {
            return false;
        }
        if !statement.contains_join() {
            return true;
        }
        let Some(equalities) = statement.column_equalities() else {
            return false;
        };

        let names: Vec<&str> = logic_tables.iter().map(AsRef::as_ref).collect();
        let mut joined: HashMap<ShardingScope, HashSet<String>> = HashMap::new();
        for equality in &equalities {
            let Some(left_table) = self.resolve_column_table(&equality.left, statement, schema, &names) else {
                continue;
            };
            let Some(right_table) = self.resolve_column_table(&equality.right, statement, schema, &names) else {
                continue;
            };
            if left_table.eq_ignore_ascii_case(right_table) {
                continue;
            }
            for scope in ShardingScope::ALL {
                if self.scope_sharding_column(scope, &equality.left.name, left_table).is_some()
                    && self.scope_sharding_column(scope, &equality.right.name, right_table).is_some()
                {
                    let tables = joined.entry(scope).or_default();
                    tables.insert(canonical_name(left_table));
                    tables.insert(canonical_name(right_table));
                }
            }
        }

        let Some(first) = names.first().and_then(|name| self.find_table_rule(name)) else {
            return false;
        };
        ShardingScope::ALL.into_iter().all(|scope| {
            let requires_join = !self
                .resolve_strategy(first, scope)
                .sharding_columns(self.default_sharding_column())
                .is_empty();
            !requires_join
                || joined.get(&scope).is_some_and(|tables| {
                    names
                        .iter()
                        .all(|name| tables.contains(&canonical_name(name)))
                })
        })
    }

    fn resolve_column_table<'a>(
        &self,
        column: &ColumnRef,
        statement: &'a SqlStatementContext,
        schema: &SchemaContext,
        candidates: &[&'a str],
    ) -> Option<&'a str> {
        match &column.owner {
            Some(owner) => statement.resolve_owner(owner),
            None => schema.find_owner(candidates, &column.name),
        }
    }

    /// The effective strategy of `table` at `scope`: its own, else the default.
    fn resolve_strategy<'a>(&'a self, table: &'a ShardingTable, scope: ShardingScope) -> &'a ShardingStrategyConfiguration {
        table.strategy(scope).unwrap_or(match scope {
            ShardingScope::Database => &self.default_database_strategy,
            ShardingScope::Table => &self.default_table_strategy,
        })
    }

    fn scope_sharding_column(&self, scope: ShardingScope, column: &str, logic_table: &str) -> Option<String> {
        let table = self.find_table_rule(logic_table)?;
        self.resolve_strategy(table, scope)
            .sharding_columns(self.default_sharding_column())
            .into_iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(column))
            .map(str::to_string)
    }

    /// The configured spelling of `column` if it shards `logic_table` at the
    /// database scope, else at the table scope.
    pub fn find_sharding_column(&self, column: &str, logic_table: &str) -> Option<String> {
        ShardingScope::ALL
            .into_iter()
            .find_map(|scope| self.scope_sharding_column(scope, column, logic_table))
    }

    pub fn is_sharding_column(&self, column: &str, logic_table: &str) -> bool {
        self.find_sharding_column(column, logic_table).is_some()
    }

    pub fn find_generate_key_column_name(&self, logic_table: &str) -> Option<&str> {
        self.find_table_rule(logic_table)?.generate_key_column()
    }

    pub fn is_generate_key_column(&self, column: &str, logic_table: &str) -> bool {
        self.find_generate_key_column_name(logic_table)
            .is_some_and(|generate_key_column| generate_key_column.eq_ignore_ascii_case(column))
    }

    fn key_generator_for(&self, table: &ShardingTable) -> Option<&Arc<dyn KeyGenerateAlgorithm>> {
        match table.key_generator_name() {
            Some(name) => self.key_generators.get(&canonical_name(name)),
            None => self.default_key_generator.as_ref(),
        }
    }

    /// Generates a key with the table's generator, else the default one.
    pub fn generate_key(&self, logic_table: &str) -> Result<ShardingValue, ShardingError> {
        let table = self.get_table_rule(logic_table)?;
        let generator = self
            .key_generator_for(table)
            .ok_or_else(|| ShardingError::KeyGenerateStrategyNotFound(logic_table.to_string()))?;
        Ok(generator.generate_key())
    }

    pub fn is_support_auto_increment(&self, logic_table: &str) -> bool {
        self.find_table_rule(logic_table)
            .and_then(|table| self.key_generator_for(table))
            .is_some_and(|generator| generator.is_support_auto_increment())
    }

    /// The first actual node of the table.
    pub fn get_data_node(&self, logic_table: &str) -> Result<&DataNode, ShardingError> {
        self.get_table_rule(logic_table)?
            .actual_data_nodes()
            .first()
            .ok_or_else(|| ShardingError::MissingDataNodes {
                logic_table: logic_table.to_string(),
            })
    }

    /// Actual nodes of every table, keyed by logic table name.
    pub fn get_all_data_nodes(&self) -> IndexMap<String, Vec<DataNode>> {
        self.sharding_tables
            .values()
            .map(|table| (table.logic_table().to_string(), table.actual_data_nodes().to_vec()))
            .collect()
    }

    pub fn get_data_nodes_by_table_name(&self, logic_table: &str) -> &[DataNode] {
        self.find_table_rule(logic_table)
            .map(ShardingTable::actual_data_nodes)
            .unwrap_or_default()
    }

    /// Every actual table name, each once, in table order.
    pub fn get_all_actual_tables(&self) -> Vec<&str> {
        let tables: IndexSet<&str> = self
            .sharding_tables
            .values()
            .flat_map(|table| table.actual_data_nodes())
            .map(|node| node.table_name.as_str())
            .collect();
        tables.into_iter().collect()
    }

    pub fn get_database_sharding_strategy_configuration<'a>(
        &'a self,
        table: &'a ShardingTable,
    ) -> &'a ShardingStrategyConfiguration {
        self.resolve_strategy(table, ShardingScope::Database)
    }

    pub fn get_table_sharding_strategy_configuration<'a>(
        &'a self,
        table: &'a ShardingTable,
    ) -> &'a ShardingStrategyConfiguration {
        self.resolve_strategy(table, ShardingScope::Table)
    }

    pub fn get_audit_strategy_configuration<'a>(
        &'a self,
        table: &'a ShardingTable,
    ) -> Option<&'a AuditStrategyConfiguration> {
        table.audit_strategy().or(self.default_audit_strategy.as_ref())
    }

    /// True unless the named sharding tables span more than one data source.
    /// Names that are not sharding tables are ignored.
    pub fn is_all_tables_in_same_data_source<S: AsRef<str>>(&self, logic_tables: &[S]) -> bool {
        let data_sources: HashSet<String> = logic_tables
            .iter()
            .filter_map(|name| self.find_table_rule(name.as_ref()))
            .flat_map(|table| table.actual_data_source_names())
            .map(canonical_name)
            .collect();
        data_sources.len() <= 1
    }

    /// Bound actual tables for `actual_table` of `logic_table`, restricted to
    /// `available_logic_tables`. Empty when the table has no binding group.
    pub fn get_logic_and_actual_tables_from_binding_table(
        &self,
        data_source_name: &str,
        logic_table: &str,
        actual_table: &str,
        available_logic_tables: &[&str],
    ) -> Result<IndexMap<String, String>, ShardingError> {
        match self.find_binding_table_rule(logic_table) {
            Some(binding) => binding.get_logic_and_actual_tables(
                data_source_name,
                logic_table,
                actual_table,
                available_logic_tables,
            ),
            None => Ok(IndexMap::new()),
        }
    }

    /// Runs the auditors of every sharding table the statement touches.
    ///
    /// Auditors whose strategy allows it are skipped when
    /// `hint_disable_audit` is set.
    pub fn audit(&self, statement: &SqlStatementContext, hint_disable_audit: bool) -> Result<(), ShardingError> {
        let mut auditor_names: IndexSet<String> = IndexSet::new();
        for table in statement
            .table_names()
            .into_iter()
            .filter_map(|name| self.find_table_rule(name))
        {
            let Some(strategy) = self.get_audit_strategy_configuration(table) else {
                continue;
            };
            if strategy.allow_hint_disable && hint_disable_audit {
                continue;
            }
            auditor_names.extend(strategy.auditor_names.iter().map(|name| canonical_name(name)));
        }

        let context = AuditContext { statement, rule: self };
        for name in &auditor_names {
            if let Some(auditor) = self.auditors.get(name) {
                auditor
                    .check(&context)
                    .map_err(|reason| ShardingError::AuditFailed {
                        auditor: name.clone(),
                        reason,
                    })?;
            }
        }
        Ok(())
    }
}

fn instantiate<T: ?Sized, F>(
    configs: &HashMap<String, AlgorithmConfiguration>,
    create: F,
) -> Result<HashMap<String, Arc<T>>, ShardingError>
where
    F: Fn(&str, &AlgorithmConfiguration) -> Result<Arc<T>, ShardingError>,
{
    configs
        .iter()
        .map(|(name, config)| Ok((canonical_name(name), create(name, config)?)))
        .collect()
}

fn insert_table(tables: &mut IndexMap<String, Arc<ShardingTable>>, table: ShardingTable) {
    let key = canonical_name(table.logic_table());
    if tables.contains_key(&key) {
        tracing::warn!(logic_table = table.logic_table(), "duplicate logic table ignored");
        return;
    }
    tables.insert(key, Arc::new(table));
}

/// Maps each actual table to its logic table, rejecting data nodes claimed
/// by two tables.
fn index_actual_tables(
    tables: &IndexMap<String, Arc<ShardingTable>>,
) -> Result<HashMap<String, String>, ShardingError> {
    let mut owners: HashMap<(String, String), &str> = HashMap::new();
    let mut index = HashMap::new();
    for (logic_key, table) in tables {
        for node in table.actual_data_nodes() {
            let key = (
                canonical_name(&node.data_source_name),
                canonical_name(&node.table_name),
            );
            if let Some(owner) = owners.insert(key, table.logic_table()) {
                if !owner.eq_ignore_ascii_case(table.logic_table()) {
                    return Err(ShardingError::DuplicateDataNode {
                        data_node: node.to_string(),
                        first_table: owner.to_string(),
                        second_table: table.logic_table().to_string(),
                    });
                }
            }
            index
                .entry(canonical_name(&node.table_name))
                .or_insert_with(|| logic_key.clone());
        }
    }
    Ok(index)
}

/// The rule's data sources: those referenced by explicit nodes and
/// auto-table candidate lists when every table names its nodes, otherwise
/// all known data sources.
fn derive_data_source_names(
    config: &ShardingRuleConfiguration,
    known: &[String],
) -> Result<Vec<String>, ShardingError> {
    let has_node_expressions = config
        .tables
        .iter()
        .all(|table| table.actual_data_nodes.as_deref().is_some_and(|nodes| !nodes.trim().is_empty()));
    if (config.tables.is_empty() && config.auto_tables.is_empty()) || !has_node_expressions {
        return Ok(known.to_vec());
    }

    let mut result: IndexSet<String> = IndexSet::new();
    for table in &config.tables {
        if let Some(expression) = table.actual_data_nodes.as_deref() {
            for node in DataNodeExpander::expand(expression)? {
                result.insert(node.data_source_name);
            }
        }
    }
    for table in &config.auto_tables {
        match table.actual_data_sources.as_deref().filter(|expression| !expression.trim().is_empty()) {
            Some(expression) => result.extend(inline::split_and_evaluate(expression)?),
            None => result.extend(known.iter().cloned()),
        }
    }
    Ok(result.into_iter().collect())
}

/// Checks algorithm references against the instantiated algorithms.
struct ReferenceValidator<'a> {
    sharding_algorithms: &'a HashMap<String, Arc<dyn ShardingAlgorithm>>,
    key_generators: &'a HashMap<String, Arc<dyn KeyGenerateAlgorithm>>,
    auditors: &'a HashMap<String, Arc<dyn ShardingAuditAlgorithm>>,
}

impl ReferenceValidator<'_> {
    fn sharding_algorithm(
        &self,
        strategy: Option<&ShardingStrategyConfiguration>,
        owner: &str,
    ) -> Result<Option<&Arc<dyn ShardingAlgorithm>>, ShardingError> {
        let Some(name) = strategy.and_then(ShardingStrategyConfiguration::sharding_algorithm_name) else {
            return Ok(None);
        };
        self.sharding_algorithms
            .get(&canonical_name(name))
            .map(Some)
            .ok_or_else(|| ShardingError::algorithm(name, format!("referenced by {owner} but not configured")))
    }

    fn check_defaults(&self, config: &ShardingRuleConfiguration) -> Result<(), ShardingError> {
        for (strategy, owner) in [
            (config.default_database_strategy.as_ref(), "default database strategy"),
            (config.default_table_strategy.as_ref(), "default table strategy"),
        ] {
            if let Some(algorithm) = self.sharding_algorithm(strategy, owner)? {
                reject_auto_algorithm(algorithm, strategy, owner)?;
            }
        }
        if let Some(audit) = &config.default_audit_strategy {
            self.check_auditors(audit, "default audit strategy")?;
        }
        Ok(())
    }

    /// Explicit tables must not use auto-table algorithms and auto tables
    /// must use one.
    fn check_table_strategies<const N: usize>(
        &self,
        logic_table: &str,
        strategies: [Option<&ShardingStrategyConfiguration>; N],
        auto_table: bool,
    ) -> Result<(), ShardingError> {
        let owner = format!("table `{logic_table}`");
        for strategy in strategies {
            let Some(algorithm) = self.sharding_algorithm(strategy, &owner)? else {
                continue;
            };
            if auto_table {
                if algorithm.auto_tables_amount().is_none() {
                    return Err(ShardingError::algorithm(
                        strategy.and_then(ShardingStrategyConfiguration::sharding_algorithm_name).unwrap_or_default(),
                        format!("auto table `{logic_table}` requires an auto-table algorithm"),
                    ));
                }
            } else {
                reject_auto_algorithm(algorithm, strategy, &owner)?;
            }
        }
        Ok(())
    }

    fn check_table_extras(
        &self,
        logic_table: &str,
        key_generator_name: Option<&str>,
        audit: Option<&AuditStrategyConfiguration>,
    ) -> Result<(), ShardingError> {
        let owner = format!("table `{logic_table}`");
        if let Some(name) = key_generator_name {
            self.key_generator(name, &owner)?;
        }
        if let Some(audit) = audit {
            self.check_auditors(audit, &owner)?;
        }
        Ok(())
    }

    fn key_generator(&self, name: &str, owner: &str) -> Result<Arc<dyn KeyGenerateAlgorithm>, ShardingError> {
        self.key_generators
            .get(&canonical_name(name))
            .cloned()
            .ok_or_else(|| ShardingError::algorithm(name, format!("key generator referenced by {owner} but not configured")))
    }

    fn check_auditors(&self, audit: &AuditStrategyConfiguration, owner: &str) -> Result<(), ShardingError> {
        match audit
            .auditor_names
            .iter()
            .find(|name| !self.auditors.contains_key(&canonical_name(name)))
        {
            Some(missing) => Err(ShardingError::algorithm(
                missing.as_str(),
                format!("auditor referenced by {owner} but not configured"),
            )),
            None => Ok(()),
        }
    }
}

fn reject_auto_algorithm(
    algorithm: &Arc<dyn ShardingAlgorithm>,
    strategy: Option<&ShardingStrategyConfiguration>,
    owner: &str,
) -> Result<(), ShardingError> {
    if algorithm.auto_tables_amount().is_some() {
        return Err(ShardingError::algorithm(
            strategy.and_then(ShardingStrategyConfiguration::sharding_algorithm_name).unwrap_or_default(),
            format!("auto-table algorithm `{}` cannot be used by {owner}", algorithm.algorithm_type()),
        ));
    }
    Ok(())
}

//! Sharding rule scenarios using the built-in algorithms.

use pretty_assertions::assert_eq;
use shardline_algorithms::builtin_registry;
use shardline_core::{
    AlgorithmConfiguration, AutoTableRuleConfiguration, DataNode, KeyGenerateStrategyConfiguration,
    ShardingRuleConfiguration, ShardingStrategyConfiguration, TableRuleConfiguration,
};
use shardline_rule::{
    BindingMismatch, SchemaContext, ShardingError, ShardingRule, ShardingScope, ShardingValue,
    SqlAnalyzer,
};

const DATA_SOURCES: [&str; 4] = ["ds_0", "ds_1", "resource0", "resource1"];

fn inline(expression: &str) -> AlgorithmConfiguration {
    AlgorithmConfiguration::new("INLINE").with_prop("algorithm-expression", expression)
}

/// Two bound tables sharded by `user_id` across data sources and
/// `order_id` across tables.
fn order_config(item_table_modulo: u32) -> ShardingRuleConfiguration {
    let mut config = ShardingRuleConfiguration::default();
    config.tables.push(
        TableRuleConfiguration::new("t_order", Some("ds_${0..1}.t_order_${0..1}"))
            .with_table_strategy(ShardingStrategyConfiguration::standard("order_id", "t_order_inline"))
            .with_key_generate_strategy(KeyGenerateStrategyConfiguration::new("order_id", "uuid")),
    );
    config.tables.push(
        TableRuleConfiguration::new("t_order_item", Some("ds_${0..1}.t_order_item_${0..1}"))
            .with_table_strategy(ShardingStrategyConfiguration::standard("order_id", "t_order_item_inline"))
            .with_key_generate_strategy(KeyGenerateStrategyConfiguration::new("item_id", "increment")),
    );
    config.binding_tables.push("t_order, t_order_item".into());
    config.default_database_strategy = Some(ShardingStrategyConfiguration::standard("user_id", "database_inline"));
    config.sharding_algorithms.insert("database_inline".to_string(), inline("ds_${user_id % 2}"));
    config
        .sharding_algorithms
        .insert("t_order_inline".to_string(), inline("t_order_${order_id % 2}"));
    config.sharding_algorithms.insert(
        "t_order_item_inline".to_string(),
        inline(&format!("t_order_item_$->{{order_id % {item_table_modulo}}}")),
    );
    config
        .key_generators
        .insert("uuid".to_string(), AlgorithmConfiguration::new("UUID"));
    config
        .key_generators
        .insert("increment".to_string(), AlgorithmConfiguration::new("AUTO_INCREMENT"));
    config
}

fn build(config: &ShardingRuleConfiguration) -> Result<ShardingRule, ShardingError> {
    ShardingRule::build(config, DATA_SOURCES, &builtin_registry())
}

/// Structurally equal inline expressions bind.
#[test]
fn test_inline_binding_group() {
    let rule = build(&order_config(2)).unwrap();
    let binding = rule.find_binding_table_rule("T_ORDER_ITEM").unwrap();
    assert_eq!(binding.get_all_logic_tables(), vec!["t_order", "t_order_item"]);
    assert_eq!(
        binding
            .get_binding_actual_table("ds_1", "t_order", "t_order_item", "t_order_1")
            .unwrap(),
        "t_order_item_1"
    );
    assert_eq!(rule.data_source_names(), &["ds_0", "ds_1"]);
}

/// `% 2` and `% 3` route differently, so the group is rejected.
#[test]
fn test_inline_expression_mismatch() {
    let err = build(&order_config(3)).unwrap_err();
    match err {
        ShardingError::InvalidBindingTables { group, mismatch } => {
            assert_eq!(group, "t_order, t_order_item");
            assert!(matches!(
                mismatch,
                BindingMismatch::AlgorithmExpression {
                    scope: ShardingScope::Table,
                    ..
                }
            ));
        }
        other => panic!("expected binding error, got {other}"),
    }
}

/// Tables route through their inline algorithms to existing actual tables.
#[test]
fn test_routing_through_table_algorithm() {
    let rule = build(&order_config(2)).unwrap();
    let table = rule.get_table_rule("t_order").unwrap();
    let algorithm = rule.find_sharding_algorithm("T_ORDER_INLINE").unwrap();
    let targets: Vec<String> = table
        .actual_table_names("ds_0")
        .into_iter()
        .map(str::to_string)
        .collect();
    let value = ShardingValue::Number(7);
    let target = algorithm.do_sharding(
        &targets,
        &shardline_rule::PreciseShardingValue {
            logic_table: "t_order",
            column_name: "order_id",
            data_node_info: table.table_data_node(),
            value: &value,
        },
    );
    assert_eq!(target.as_deref(), Some("t_order_1"));
    assert_eq!(table.find_actual_table_index("ds_0", "t_order_1"), Some(1));
}

/// Generated keys follow the generator's type.
#[test]
fn test_generate_key_types() {
    let rule = build(&order_config(2)).unwrap();
    match rule.generate_key("t_order").unwrap() {
        ShardingValue::Text(key) => assert_eq!(key.len(), 32),
        other => panic!("expected a UUID, got {other:?}"),
    }
    assert_eq!(rule.generate_key("t_order_item").unwrap(), ShardingValue::Number(1));
    assert!(rule.is_support_auto_increment("t_order_item"));
    assert!(!rule.is_support_auto_increment("t_order"));
    assert!(rule.is_generate_key_column("ITEM_ID", "t_order_item"));
}

/// The table's own strategy wins over the default at its scope; defaults
/// fill the other scope.
#[test]
fn test_find_sharding_column() {
    let mut config = order_config(2);
    config.default_table_strategy = Some(ShardingStrategyConfiguration::standard("status", "t_order_inline"));
    config.tables[0].database_strategy = Some(ShardingStrategyConfiguration::standard("tenant_id", "database_inline"));
    let rule = build(&config).unwrap();

    assert_eq!(rule.find_sharding_column("tenant_id", "t_order").as_deref(), Some("tenant_id"));
    assert_eq!(rule.find_sharding_column("user_id", "t_order"), None);
    assert_eq!(rule.find_sharding_column("status", "t_order"), None);
    assert_eq!(rule.find_sharding_column("user_id", "t_order_item").as_deref(), Some("user_id"));
    assert_eq!(rule.find_sharding_column("Order_Id", "t_order_item").as_deref(), Some("order_id"));
}

/// Four auto tables over three data sources wrap around.
#[test]
fn test_auto_table_round_robin() {
    let mut config = ShardingRuleConfiguration::default();
    config.auto_tables.push(
        AutoTableRuleConfiguration::new("t_log", Some("ds0, ds1, ds2"))
            .with_sharding_strategy(ShardingStrategyConfiguration::standard("log_id", "mod")),
    );
    config.sharding_algorithms.insert(
        "mod".to_string(),
        AlgorithmConfiguration::new("MOD").with_prop("sharding-count", 4),
    );
    let rule = ShardingRule::build(&config, ["ds0", "ds1", "ds2", "ds3"], &builtin_registry()).unwrap();

    assert_eq!(
        rule.get_data_nodes_by_table_name("t_log"),
        &[
            DataNode::new("ds0", "t_log_0"),
            DataNode::new("ds1", "t_log_1"),
            DataNode::new("ds2", "t_log_2"),
            DataNode::new("ds0", "t_log_3"),
        ]
    );
    assert_eq!(rule.data_source_names(), &["ds0", "ds1", "ds2"]);
    assert_eq!(rule.find_logic_table_by_actual_table("t_log_3"), Some("t_log"));
}

/// Without candidates an auto table spreads over every known data source.
#[test]
fn test_auto_table_uses_all_data_sources() {
    let mut config = ShardingRuleConfiguration::default();
    config.auto_tables.push(
        AutoTableRuleConfiguration::new("t_log", None)
            .with_sharding_strategy(ShardingStrategyConfiguration::standard("log_id", "hash")),
    );
    config.sharding_algorithms.insert(
        "hash".to_string(),
        AlgorithmConfiguration::new("HASH_MOD").with_prop("sharding-count", "6"),
    );
    let rule = build(&config).unwrap();
    let nodes = rule.get_data_nodes_by_table_name("t_log");
    assert_eq!(nodes.len(), 6);
    assert_eq!(nodes[3], DataNode::new("resource1", "t_log_3"));
    assert_eq!(nodes[5], DataNode::new("ds_1", "t_log_5"));
    assert_eq!(rule.data_source_names(), &DATA_SOURCES);
}

/// An unregistered algorithm type aborts the build.
#[test]
fn test_unknown_algorithm_type() {
    let mut config = order_config(2);
    config
        .sharding_algorithms
        .insert("database_inline".to_string(), AlgorithmConfiguration::new("RANGE"));
    assert!(matches!(
        build(&config),
        Err(ShardingError::AlgorithmInitialization { name, .. }) if name == "database_inline"
    ));
}

/// Joins on both sharding columns keep the tables bound; joins on one do not.
#[test]
fn test_join_binding() {
    let rule = build(&order_config(2)).unwrap();
    let analyzer = SqlAnalyzer::new();
    let schema = SchemaContext::new()
        .with_table("t_order", ["order_id", "user_id", "status"])
        .with_table("t_order_item", ["item_id", "order_id", "user_id"]);
    let names = ["t_order", "t_order_item"];

    let bound = analyzer
        .analyze_sql(
            "SELECT * FROM t_order o JOIN t_order_item i ON o.user_id = i.user_id AND o.order_id = i.order_id \
             WHERE o.status = 'paid'",
        )
        .unwrap();
    assert!(rule.is_all_binding_tables_for_statement(&schema, &bound, &names));

    let partial = analyzer
        .analyze_sql("SELECT * FROM t_order o JOIN t_order_item i ON o.order_id = i.order_id")
        .unwrap();
    assert!(!rule.is_all_binding_tables_for_statement(&schema, &partial, &names));

    let in_where = analyzer
        .analyze_sql(
            "SELECT * FROM t_order o JOIN t_order_item i ON o.order_id = i.order_id WHERE o.user_id = i.user_id AND status = 'paid'",
        )
        .unwrap();
    assert!(rule.is_all_binding_tables_for_statement(&schema, &in_where, &names));
}

/// Binding lookups skip tables the statement does not use.
#[test]
fn test_logic_and_actual_tables_from_binding_table() {
    let rule = build(&order_config(2)).unwrap();
    let tables = rule
        .get_logic_and_actual_tables_from_binding_table("ds_0", "t_order", "t_order_0", &["t_order", "t_order_item"])
        .unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables["t_order_item"], "t_order_item_0");
}

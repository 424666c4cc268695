//! Building a rule from a YAML configuration with the built-in algorithms.

use pretty_assertions::assert_eq;
use shardline_algorithms::builtin_registry;
use shardline_core::ShardingRuleConfiguration;
use shardline_rule::{ShardingError, ShardingRule, ShardingValue, SqlAnalyzer};

const CONFIG: &str = r#"
tables:
  - logic_table: t_order
    actual_data_nodes: ds_${0..1}.t_order_${0..1}
    table_strategy:
      standard:
        sharding_column: order_id
        sharding_algorithm_name: t_order_inline
    key_generate_strategy:
      column: order_id
      key_generator_name: snowflake
    audit_strategy:
      auditor_names: [sharding_key_required]
      allow_hint_disable: true
  - logic_table: t_order_item
    actual_data_nodes: ds_$->{0..1}.t_order_item_$->{0..1}
    table_strategy:
      standard:
        sharding_column: order_id
        sharding_algorithm_name: t_order_item_inline
auto_tables:
  - logic_table: t_user
    actual_data_sources: ds_${0..1}
    sharding_strategy:
      standard:
        sharding_column: user_id
        sharding_algorithm_name: user_mod
binding_tables:
  - name: order_group
    reference: t_order, t_order_item
broadcast_tables:
  - t_dict
default_database_strategy:
  standard:
    sharding_column: user_id
    sharding_algorithm_name: database_inline
default_table_strategy: none
sharding_algorithms:
  database_inline:
    type: INLINE
    props:
      algorithm-expression: ds_${user_id % 2}
  t_order_inline:
    type: INLINE
    props:
      algorithm-expression: t_order_${order_id % 2}
  t_order_item_inline:
    type: inline
    props:
      algorithm-expression: t_order_item_$->{order_id % 2}
  user_mod:
    type: MOD
    props:
      sharding-count: 4
key_generators:
  snowflake:
    type: SNOWFLAKE
    props:
      worker-id: 7
auditors:
  sharding_key_required:
    type: DML_SHARDING_CONDITIONS
"#;

fn rule() -> ShardingRule {
    let config = ShardingRuleConfiguration::from_yaml(CONFIG).unwrap();
    ShardingRule::build(&config, ["ds_0", "ds_1", "ds_2"], &builtin_registry()).unwrap()
}

/// Every table, binding group and derived data source comes out of YAML.
#[test]
fn test_rule_from_yaml() {
    let rule = rule();
    assert_eq!(rule.data_source_names(), &["ds_0", "ds_1"]);
    assert!(rule.is_all_binding_tables(&["T_ORDER", "t_order_item"]));
    assert_eq!(rule.find_binding_table_rule("t_order").unwrap().name(), "order_group");
    assert!(rule.is_broadcast_table("T_DICT"));
    assert_eq!(rule.get_all_data_nodes().len(), 3);
    assert_eq!(rule.get_data_nodes_by_table_name("t_user").len(), 4);
    assert!(rule.get_table_rule("t_user").unwrap().is_auto_table());
    assert_eq!(rule.get_all_actual_tables().len(), 8);
}

/// Snowflake keys carry the configured worker id and increase.
#[test]
fn test_snowflake_keys() {
    let rule = rule();
    let first = rule.generate_key("t_order").unwrap().as_i64().unwrap();
    let second = rule.generate_key("t_order").unwrap().as_i64().unwrap();
    assert!(second > first);
    assert_eq!((first >> 12) & 0x3ff, 7);
    assert!(matches!(
        rule.generate_key("t_order_item"),
        Err(ShardingError::KeyGenerateStrategyNotFound(_))
    ));
    assert!(!matches!(rule.generate_key("t_order").unwrap(), ShardingValue::Text(_)));
}

/// The auditor rejects full-scan DML unless the hint disables it.
#[test]
fn test_audit_sharding_conditions() {
    let rule = rule();
    let analyzer = SqlAnalyzer::new();
    let full_scan = analyzer.analyze_sql("DELETE FROM t_order WHERE status = 'x'").unwrap();
    let targeted = analyzer.analyze_sql("DELETE FROM t_order WHERE order_id = 10").unwrap();

    assert!(matches!(
        rule.audit(&full_scan, false),
        Err(ShardingError::AuditFailed { auditor, .. }) if auditor == "sharding_key_required"
    ));
    assert!(rule.audit(&full_scan, true).is_ok());
    assert!(rule.audit(&targeted, false).is_ok());
}

/// An auto table pointing at a standard algorithm is rejected.
#[test]
fn test_auto_table_requires_auto_algorithm() {
    let yaml = CONFIG.replace("sharding_algorithm_name: user_mod", "sharding_algorithm_name: database_inline");
    let config = ShardingRuleConfiguration::from_yaml(&yaml).unwrap();
    assert!(matches!(
        ShardingRule::build(&config, ["ds_0", "ds_1"], &builtin_registry()),
        Err(ShardingError::AlgorithmInitialization { name, .. }) if name == "database_inline"
    ));
}

//! Fixture algorithms for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Context;
use shardline_core::Properties;

use crate::algorithm::{
    AlgorithmRegistry, AuditContext, KeyGenerateAlgorithm, PreciseShardingValue, ShardingAlgorithm,
    ShardingAuditAlgorithm, ShardingValue,
};
use crate::statement::SqlOperation;

/// Routes to the first target. Reports the `structure` property verbatim.
#[derive(Debug, Default)]
pub struct StandardFixture {
    structure: Option<String>,
}

impl StandardFixture {
    pub fn with_structure(structure: &str) -> Self {
        Self {
            structure: Some(structure.to_string()),
        }
    }
}

impl ShardingAlgorithm for StandardFixture {
    fn algorithm_type(&self) -> &str {
        "STANDARD_TEST"
    }

    fn do_sharding(&self, available_targets: &[String], _value: &PreciseShardingValue<'_>) -> Option<String> {
        available_targets.first().cloned()
    }

    fn algorithm_structure(&self, _data_node_prefix: &str, _sharding_column: &str) -> Option<String> {
        self.structure.clone()
    }
}

/// An auto-table algorithm creating a fixed number of tables.
#[derive(Debug)]
pub struct AutoFixture {
    sharding_count: usize,
}

impl AutoFixture {
    pub fn new(sharding_count: usize) -> Self {
        Self { sharding_count }
    }
}

impl ShardingAlgorithm for AutoFixture {
    fn algorithm_type(&self) -> &str {
        "AUTO_TEST"
    }

    fn do_sharding(&self, available_targets: &[String], value: &PreciseShardingValue<'_>) -> Option<String> {
        let index = value.value.as_i64()?.rem_euclid(self.sharding_count as i64) as usize;
        available_targets.get(index).cloned()
    }

    fn auto_tables_amount(&self) -> Option<usize> {
        Some(self.sharding_count)
    }
}

/// Counts up from one. Text keys when `text` is set.
#[derive(Debug, Default)]
pub struct KeyFixture {
    next: AtomicI64,
    text: bool,
    auto_increment: bool,
}

impl KeyGenerateAlgorithm for KeyFixture {
    fn algorithm_type(&self) -> &str {
        "KEY_TEST"
    }

    fn generate_key(&self) -> ShardingValue {
        let value = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        if self.text {
            ShardingValue::Text(format!("key-{value}"))
        } else {
            ShardingValue::Number(value)
        }
    }

    fn is_support_auto_increment(&self) -> bool {
        self.auto_increment
    }
}

/// Rejects DELETE statements.
#[derive(Debug)]
pub struct NoDeleteAuditFixture;

impl ShardingAuditAlgorithm for NoDeleteAuditFixture {
    fn algorithm_type(&self) -> &str {
        "AUDIT_TEST"
    }

    fn check(&self, context: &AuditContext<'_>) -> Result<(), String> {
        if context.statement.operation() == SqlOperation::Delete {
            Err("DELETE is not allowed".to_string())
        } else {
            Ok(())
        }
    }
}

fn flag(props: &Properties, key: &str) -> bool {
    props.get(key).and_then(|value| value.as_bool()).unwrap_or(false)
}

pub fn registry() -> AlgorithmRegistry {
    let mut registry = AlgorithmRegistry::new();
    registry
        .register_sharding_algorithm("STANDARD_TEST", |props| {
            Ok(Arc::new(StandardFixture {
                structure: props
                    .get("structure")
                    .and_then(|value| value.as_str())
                    .map(str::to_string),
            }))
        })
        .register_sharding_algorithm("AUTO_TEST", |props| {
            let count = props
                .get("sharding-count")
                .and_then(|value| value.as_u64())
                .context("sharding-count must be a positive integer")?;
            Ok(Arc::new(AutoFixture::new(count as usize)))
        })
        .register_key_generate_algorithm("KEY_TEST", |props| {
            Ok(Arc::new(KeyFixture {
                next: AtomicI64::new(0),
                text: flag(props, "text"),
                auto_increment: flag(props, "auto-increment"),
            }))
        })
        .register_audit_algorithm("AUDIT_TEST", |_| Ok(Arc::new(NoDeleteAuditFixture)));
    registry
}

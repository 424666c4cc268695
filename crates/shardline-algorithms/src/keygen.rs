//! Stateless and counter-based key generators.

use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use shardline_core::Properties;
use shardline_rule::{KeyGenerateAlgorithm, ShardingValue};
use uuid::Uuid;

use crate::props;

pub const UUID_TYPE: &str = "UUID";
pub const AUTO_INCREMENT_TYPE: &str = "AUTO_INCREMENT";
const INITIAL_VALUE_KEY: &str = "initial-value";

/// Random v4 UUIDs in their 32-character simple form.
#[derive(Debug, Default)]
pub struct UuidKeyGenerateAlgorithm;

impl KeyGenerateAlgorithm for UuidKeyGenerateAlgorithm {
    fn algorithm_type(&self) -> &str {
        UUID_TYPE
    }

    fn generate_key(&self) -> ShardingValue {
        ShardingValue::Text(Uuid::new_v4().simple().to_string())
    }
}

/// Defers key assignment to the database's auto-increment column.
///
/// Keys handed out locally count up from `initial-value` (default 1).
#[derive(Debug)]
pub struct AutoIncrementKeyGenerateAlgorithm {
    next: AtomicI64,
}

impl AutoIncrementKeyGenerateAlgorithm {
    pub fn new(initial_value: i64) -> Self {
        Self {
            next: AtomicI64::new(initial_value),
        }
    }

    pub fn from_props(props: &Properties) -> Result<Self> {
        Ok(Self::new(props::integer(props, INITIAL_VALUE_KEY)?.unwrap_or(1)))
    }
}

impl KeyGenerateAlgorithm for AutoIncrementKeyGenerateAlgorithm {
    fn algorithm_type(&self) -> &str {
        AUTO_INCREMENT_TYPE
    }

    fn generate_key(&self) -> ShardingValue {
        ShardingValue::Number(self.next.fetch_add(1, Ordering::Relaxed))
    }

    fn is_support_auto_increment(&self) -> bool {
        true
    }
}

//! Auto-table algorithms that pick a shard index from the value: `MOD` on
//! the numeric value and `HASH_MOD` on a CRC32 of its text.

use anyhow::Result;
use shardline_core::{DataNodeInfo, Properties};
use shardline_rule::{PreciseShardingValue, ShardingAlgorithm};

use crate::props;

pub const MOD_TYPE: &str = "MOD";
pub const HASH_MOD_TYPE: &str = "HASH_MOD";
const SHARDING_COUNT_KEY: &str = "sharding-count";

/// Routes numeric values to shard `value mod sharding-count`.
#[derive(Debug)]
pub struct ModShardingAlgorithm {
    sharding_count: usize,
}

impl ModShardingAlgorithm {
    pub fn new(sharding_count: usize) -> Self {
        Self { sharding_count }
    }

    pub fn from_props(props: &Properties) -> Result<Self> {
        Ok(Self::new(props::required_count(props, SHARDING_COUNT_KEY)?))
    }
}

impl ShardingAlgorithm for ModShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        MOD_TYPE
    }

    fn do_sharding(&self, available_targets: &[String], value: &PreciseShardingValue<'_>) -> Option<String> {
        let index = value.value.as_i64()?.rem_euclid(self.sharding_count as i64) as usize;
        find_target(available_targets, value.data_node_info, index)
    }

    fn auto_tables_amount(&self) -> Option<usize> {
        Some(self.sharding_count)
    }
}

/// Routes any value to shard `crc32(value) mod sharding-count`.
#[derive(Debug)]
pub struct HashModShardingAlgorithm {
    sharding_count: usize,
}

impl HashModShardingAlgorithm {
    pub fn new(sharding_count: usize) -> Self {
        Self { sharding_count }
    }

    pub fn from_props(props: &Properties) -> Result<Self> {
        Ok(Self::new(props::required_count(props, SHARDING_COUNT_KEY)?))
    }

    fn shard_index(&self, text: &str) -> usize {
        crc32fast::hash(text.as_bytes()) as usize % self.sharding_count
    }
}

impl ShardingAlgorithm for HashModShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        HASH_MOD_TYPE
    }

    fn do_sharding(&self, available_targets: &[String], value: &PreciseShardingValue<'_>) -> Option<String> {
        let index = self.shard_index(&value.value.to_string());
        find_target(available_targets, value.data_node_info, index)
    }

    fn auto_tables_amount(&self) -> Option<usize> {
        Some(self.sharding_count)
    }
}

/// The target whose numeric suffix is `index`.
fn find_target(available_targets: &[String], info: &DataNodeInfo, index: usize) -> Option<String> {
    available_targets
        .iter()
        .find(|target| {
            info.suffix_of(target)
                .and_then(|suffix| suffix.parse::<usize>().ok())
                == Some(index)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shardline_rule::ShardingValue;

    fn targets() -> Vec<String> {
        (0..4).map(|index| format!("t_order_{index}")).collect()
    }

    fn shard(algorithm: &dyn ShardingAlgorithm, value: ShardingValue) -> Option<String> {
        let info = DataNodeInfo::new("t_order_", 1, '0');
        algorithm.do_sharding(
            &targets(),
            &PreciseShardingValue {
                logic_table: "t_order",
                column_name: "order_id",
                data_node_info: &info,
                value: &value,
            },
        )
    }

    #[test]
    fn test_mod_routing() {
        let algorithm = ModShardingAlgorithm::new(4);
        assert_eq!(shard(&algorithm, ShardingValue::Number(6)).as_deref(), Some("t_order_2"));
        assert_eq!(shard(&algorithm, ShardingValue::Number(-1)).as_deref(), Some("t_order_3"));
        assert_eq!(shard(&algorithm, ShardingValue::from("9")).as_deref(), Some("t_order_1"));
        assert_eq!(shard(&algorithm, ShardingValue::from("x")), None);
        assert_eq!(algorithm.auto_tables_amount(), Some(4));
    }

    #[test]
    fn test_mod_target_missing() {
        let algorithm = ModShardingAlgorithm::new(8);
        assert_eq!(shard(&algorithm, ShardingValue::Number(5)), None);
    }

    #[test]
    fn test_hash_mod_is_stable() {
        let algorithm = HashModShardingAlgorithm::new(4);
        let expected = format!("t_order_{}", crc32fast::hash(b"alice") % 4);
        assert_eq!(shard(&algorithm, ShardingValue::from("alice")), Some(expected.clone()));
        assert_eq!(shard(&algorithm, ShardingValue::from("alice")), Some(expected));
        assert_eq!(algorithm.auto_tables_amount(), Some(4));
    }

    #[test]
    fn test_sharding_count_is_required() {
        let mut props = Properties::new();
        assert!(ModShardingAlgorithm::from_props(&props).is_err());
        props.insert(SHARDING_COUNT_KEY.to_string(), 0.into());
        assert!(HashModShardingAlgorithm::from_props(&props).is_err());
        props.insert(SHARDING_COUNT_KEY.to_string(), "3".into());
        assert_eq!(ModShardingAlgorithm::from_props(&props).unwrap().auto_tables_amount(), Some(3));
    }
}

//! # shardline-algorithms
//!
//! Built-in algorithms for Shardline rules.
//!
//! | Type | Kind | Properties |
//! |------|------|------------|
//! | `INLINE` | standard sharding | `algorithm-expression` |
//! | `MOD` | auto-table sharding | `sharding-count` |
//! | `HASH_MOD` | auto-table sharding | `sharding-count` |
//! | `UUID` | key generation | |
//! | `SNOWFLAKE` | key generation | `worker-id`, `max-tolerate-time-difference-milliseconds` |
//! | `AUTO_INCREMENT` | key generation | `initial-value` |
//! | `DML_SHARDING_CONDITIONS` | audit | |
//!
//! Nothing is registered implicitly; pass [`builtin_registry`] (or a
//! registry extended with [`register_builtin_algorithms`]) to
//! [`ShardingRule::build`](shardline_rule::ShardingRule::build).

pub mod audit;
pub mod inline;
pub mod keygen;
pub mod modulo;
pub mod snowflake;

mod props;

use std::sync::Arc;

use shardline_rule::AlgorithmRegistry;

pub use audit::DmlShardingConditionsAuditAlgorithm;
pub use inline::InlineShardingAlgorithm;
pub use keygen::{AutoIncrementKeyGenerateAlgorithm, UuidKeyGenerateAlgorithm};
pub use modulo::{HashModShardingAlgorithm, ModShardingAlgorithm};
pub use snowflake::SnowflakeKeyGenerateAlgorithm;

/// Registers every built-in algorithm type into `registry`.
pub fn register_builtin_algorithms(registry: &mut AlgorithmRegistry) -> &mut AlgorithmRegistry {
    registry
        .register_sharding_algorithm(inline::TYPE, |props| {
            Ok(Arc::new(InlineShardingAlgorithm::from_props(props)?))
        })
        .register_sharding_algorithm(modulo::MOD_TYPE, |props| {
            Ok(Arc::new(ModShardingAlgorithm::from_props(props)?))
        })
        .register_sharding_algorithm(modulo::HASH_MOD_TYPE, |props| {
            Ok(Arc::new(HashModShardingAlgorithm::from_props(props)?))
        })
        .register_key_generate_algorithm(keygen::UUID_TYPE, |_| Ok(Arc::new(UuidKeyGenerateAlgorithm)))
        .register_key_generate_algorithm(keygen::AUTO_INCREMENT_TYPE, |props| {
            Ok(Arc::new(AutoIncrementKeyGenerateAlgorithm::from_props(props)?))
        })
        .register_key_generate_algorithm(snowflake::TYPE, |props| {
            Ok(Arc::new(SnowflakeKeyGenerateAlgorithm::from_props(props)?))
        })
        .register_audit_algorithm(audit::TYPE, |_| Ok(Arc::new(DmlShardingConditionsAuditAlgorithm)));
    tracing::debug!(?registry, "registered built-in algorithms");
    registry
}

/// A registry holding only the built-in algorithms.
pub fn builtin_registry() -> AlgorithmRegistry {
    let mut registry = AlgorithmRegistry::new();
    register_builtin_algorithms(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardline_core::AlgorithmConfiguration;

    #[test]
    fn test_builtin_types_are_registered() {
        let registry = builtin_registry();
        for algorithm_type in ["INLINE", "mod", "Hash_Mod"] {
            assert!(registry.contains_sharding_algorithm(algorithm_type), "{algorithm_type}");
        }
        let generator = registry
            .create_key_generate_algorithm("uuid", &AlgorithmConfiguration::new("UUID"))
            .unwrap();
        assert_eq!(generator.algorithm_type(), "UUID");
        let auditor = registry
            .create_audit_algorithm("audit", &AlgorithmConfiguration::new("DML_SHARDING_CONDITIONS"))
            .unwrap();
        assert_eq!(auditor.algorithm_type(), "DML_SHARDING_CONDITIONS");
    }

    #[test]
    fn test_invalid_props_fail_creation() {
        let registry = builtin_registry();
        assert!(registry
            .create_sharding_algorithm("t_mod", &AlgorithmConfiguration::new("MOD"))
            .is_err());
        assert!(registry
            .create_key_generate_algorithm(
                "snowflake",
                &AlgorithmConfiguration::new("SNOWFLAKE").with_prop("worker-id", 5000)
            )
            .is_err());
    }
}

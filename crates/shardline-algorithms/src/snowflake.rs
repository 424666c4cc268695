//! The `SNOWFLAKE` key generator.
//!
//! A key packs, from the high bits down: 41 bits of milliseconds since
//! 2016-11-01T00:00:00Z, a 10-bit worker id and a 12-bit per-millisecond
//! sequence. Keys from one generator are strictly increasing.

use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Result};
use chrono::Utc;
use shardline_core::Properties;
use shardline_rule::{KeyGenerateAlgorithm, ShardingValue};

use crate::props;

pub const TYPE: &str = "SNOWFLAKE";
pub const EPOCH_MILLIS: i64 = 1_477_958_400_000;

const WORKER_ID_KEY: &str = "worker-id";
const MAX_TOLERATE_KEY: &str = "max-tolerate-time-difference-milliseconds";
const DEFAULT_MAX_TOLERATE_MILLIS: i64 = 10;

const SEQUENCE_BITS: u32 = 12;
const WORKER_ID_BITS: u32 = 10;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const MAX_WORKER_ID: i64 = 1 << WORKER_ID_BITS;

#[derive(Debug, Default)]
struct State {
    last_millis: i64,
    sequence: i64,
}

#[derive(Debug)]
pub struct SnowflakeKeyGenerateAlgorithm {
    worker_id: i64,
    max_tolerate_millis: i64,
    clock: fn() -> i64,
    state: Mutex<State>,
}

fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

impl SnowflakeKeyGenerateAlgorithm {
    pub fn new(worker_id: i64) -> Result<Self> {
        Self::with_clock(worker_id, system_clock)
    }

    /// A generator reading milliseconds from `clock`.
    pub fn with_clock(worker_id: i64, clock: fn() -> i64) -> Result<Self> {
        if !(0..MAX_WORKER_ID).contains(&worker_id) {
            bail!("worker id must be in [0, {MAX_WORKER_ID}), got {worker_id}");
        }
        Ok(Self {
            worker_id,
            max_tolerate_millis: DEFAULT_MAX_TOLERATE_MILLIS,
            clock,
            state: Mutex::new(State::default()),
        })
    }

    pub fn from_props(props: &Properties) -> Result<Self> {
        let mut generator = Self::new(props::integer(props, WORKER_ID_KEY)?.unwrap_or(0))?;
        if let Some(tolerate) = props::integer(props, MAX_TOLERATE_KEY)? {
            generator.max_tolerate_millis = tolerate;
        }
        Ok(generator)
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    fn next_id(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut now = (self.clock)();
        if now < state.last_millis {
            let behind = state.last_millis - now;
            if behind > self.max_tolerate_millis {
                tracing::warn!(behind_ms = behind, "clock moved backwards, continuing from last timestamp");
            }
            now = state.last_millis;
        }
        if now == state.last_millis {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // sequence exhausted, borrow the next millisecond
                now += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_millis = now;
        ((now - EPOCH_MILLIS) << (WORKER_ID_BITS + SEQUENCE_BITS))
            | (self.worker_id << SEQUENCE_BITS)
            | state.sequence
    }
}

impl KeyGenerateAlgorithm for SnowflakeKeyGenerateAlgorithm {
    fn algorithm_type(&self) -> &str {
        TYPE
    }

    fn generate_key(&self) -> ShardingValue {
        ShardingValue::Number(self.next_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const FIXED_MILLIS: i64 = EPOCH_MILLIS + 1_000;

    fn fixed_clock() -> i64 {
        FIXED_MILLIS
    }

    fn key(generator: &SnowflakeKeyGenerateAlgorithm) -> i64 {
        generator.generate_key().as_i64().unwrap()
    }

    #[test]
    fn test_epoch() {
        let epoch = Utc.with_ymd_and_hms(2016, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(epoch.timestamp_millis(), EPOCH_MILLIS);
    }

    #[test]
    fn test_key_layout() {
        let generator = SnowflakeKeyGenerateAlgorithm::with_clock(3, fixed_clock).unwrap();
        let first = key(&generator);
        assert_eq!(first >> 22, 1_000);
        assert_eq!((first >> 12) & 0x3ff, 3);
        assert_eq!(first & SEQUENCE_MASK, 0);
        assert_eq!(key(&generator) & SEQUENCE_MASK, 1);
    }

    #[test]
    fn test_keys_increase_past_sequence_exhaustion() {
        let generator = SnowflakeKeyGenerateAlgorithm::with_clock(1, fixed_clock).unwrap();
        let mut previous = key(&generator);
        for _ in 0..5_000 {
            let next = key(&generator);
            assert!(next > previous);
            previous = next;
        }
        assert_eq!(previous >> 22, 1_001);
    }

    #[test]
    fn test_worker_id_range() {
        assert!(SnowflakeKeyGenerateAlgorithm::new(1023).is_ok());
        assert!(SnowflakeKeyGenerateAlgorithm::new(1024).is_err());
        assert!(SnowflakeKeyGenerateAlgorithm::new(-1).is_err());

        let mut props = Properties::new();
        props.insert(WORKER_ID_KEY.to_string(), "12".into());
        assert_eq!(SnowflakeKeyGenerateAlgorithm::from_props(&props).unwrap().worker_id(), 12);
    }

    #[test]
    fn test_system_clock_keys_are_positive() {
        let generator = SnowflakeKeyGenerateAlgorithm::new(0).unwrap();
        assert!(key(&generator) > 0);
        assert!(!generator.is_support_auto_increment());
    }
}

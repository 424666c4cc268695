//! Typed access to algorithm properties.
//!
//! YAML configurations may spell numbers as strings (`sharding-count: "4"`),
//! so numeric readers accept both.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use shardline_core::Properties;

pub fn string<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str)
}

pub fn required_string<'a>(props: &'a Properties, key: &str) -> Result<&'a str> {
    string(props, key)
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("property `{key}` is required"))
}

pub fn integer(props: &Properties, key: &str) -> Result<Option<i64>> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .map(Some)
            .with_context(|| format!("property `{key}` must be an integer, got {number}")),
        Some(Value::String(text)) => text
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("property `{key}` must be an integer, got `{text}`")),
        Some(other) => bail!("property `{key}` must be an integer, got {other}"),
    }
}

/// A strictly positive count.
pub fn required_count(props: &Properties, key: &str) -> Result<usize> {
    match integer(props, key)? {
        Some(value) if value > 0 => Ok(value as usize),
        Some(value) => bail!("property `{key}` must be positive, got {value}"),
        None => bail!("property `{key}` is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            _ => Properties::new(),
        }
    }

    #[test]
    fn test_count_accepts_numbers_and_strings() {
        assert_eq!(required_count(&props(json!({"n": 4})), "n").unwrap(), 4);
        assert_eq!(required_count(&props(json!({"n": " 8 "})), "n").unwrap(), 8);
    }

    #[test]
    fn test_count_rejects_bad_values() {
        assert!(required_count(&props(json!({})), "n").is_err());
        assert!(required_count(&props(json!({"n": 0})), "n").is_err());
        assert!(required_count(&props(json!({"n": "many"})), "n").is_err());
        assert!(required_count(&props(json!({"n": true})), "n").is_err());
    }

    #[test]
    fn test_required_string() {
        let props = props(json!({"expr": "t_${id % 2}", "blank": " "}));
        assert_eq!(required_string(&props, "expr").unwrap(), "t_${id % 2}");
        assert!(required_string(&props, "blank").is_err());
        assert!(required_string(&props, "missing").is_err());
    }
}

//! Inline expression evaluation.
//!
//! Inline expressions enumerate names compactly. A comma separates
//! independent segments, and each segment may carry any number of
//! placeholders written as `${...}` or `$->{...}`:
//!
//! - `${0..2}` expands to `0`, `1`, `2` (inclusive range)
//! - `${['a', 'b']}` or `${[a, b]}` expands to the listed values
//! - `${7}` or `${'x'}` expands to a single value
//!
//! Several placeholders in one segment expand as a cartesian product in
//! which the leftmost placeholder is the outermost loop, so
//! `ds_${0..1}.t_${0..1}` yields `ds_0.t_0, ds_0.t_1, ds_1.t_0, ds_1.t_1`.

use crate::config::ConfigError;

const PLACEHOLDER_START: &str = "${";
const LEGACY_PLACEHOLDER_START: &str = "$->{";

#[derive(Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Placeholder(Vec<String>),
}

/// Rewrites the legacy `$->{` placeholder opener into `${`.
pub fn normalize_placeholders(expression: &str) -> String {
    expression.replace(LEGACY_PLACEHOLDER_START, PLACEHOLDER_START)
}

/// Splits an inline expression on top-level commas and evaluates every
/// segment, returning the concatenated values in order.
pub fn split_and_evaluate(expression: &str) -> Result<Vec<String>, ConfigError> {
    let normalized = normalize_placeholders(expression);
    let mut result = Vec::new();
    for segment in split_segments(&normalized, expression)? {
        let parts = parse_segment(&segment, expression)?;
        result.extend(expand_parts(parts));
    }
    Ok(result)
}

fn invalid(expression: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidInlineExpression {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

fn split_segments(normalized: &str, original: &str) -> Result<Vec<String>, ConfigError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in normalized.chars() {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid(original, "unbalanced '}'"))?;
                current.push(ch);
            }
            ',' if depth == 0 => {
                push_segment(&mut segments, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(invalid(original, "unterminated placeholder"));
    }
    push_segment(&mut segments, &current);
    Ok(segments)
}

fn push_segment(segments: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}

fn parse_segment(segment: &str, original: &str) -> Result<Vec<Part>, ConfigError> {
    let mut parts = Vec::new();
    let mut rest = segment;
    while let Some(start) = rest.find(PLACEHOLDER_START) {
        if start > 0 {
            parts.push(Part::Literal(rest[..start].to_string()));
        }
        let body_start = start + PLACEHOLDER_START.len();
        let body_len = closing_brace(&rest[body_start..])
            .ok_or_else(|| invalid(original, "unterminated placeholder"))?;
        let body = &rest[body_start..body_start + body_len];
        parts.push(Part::Placeholder(evaluate_placeholder(body, original)?));
        rest = &rest[body_start + body_len + 1..];
    }
    if !rest.is_empty() {
        parts.push(Part::Literal(rest.to_string()));
    }
    Ok(parts)
}

/// Byte offset of the `}` closing a placeholder whose body starts at `text`.
fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(offset),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn evaluate_placeholder(body: &str, original: &str) -> Result<Vec<String>, ConfigError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(invalid(original, "empty placeholder"));
    }

    if let Some(list) = body.strip_prefix('[') {
        let list = list
            .strip_suffix(']')
            .ok_or_else(|| invalid(original, format!("unterminated list `{body}`")))?;
        return list
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| literal_value(item, original))
            .collect();
    }

    if let Some((low, high)) = body.split_once("..") {
        let low = parse_bound(low, original)?;
        let high = parse_bound(high, original)?;
        if low > high {
            return Err(invalid(
                original,
                format!("range lower bound {low} exceeds upper bound {high}"),
            ));
        }
        return Ok((low..=high).map(|value| value.to_string()).collect());
    }

    Ok(vec![literal_value(body, original)?])
}

fn parse_bound(bound: &str, original: &str) -> Result<i64, ConfigError> {
    bound
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid(original, format!("range bound `{}` is not an integer", bound.trim())))
}

fn literal_value(item: &str, original: &str) -> Result<String, ConfigError> {
    for quote in ['\'', '"'] {
        if let Some(inner) = item.strip_prefix(quote) {
            return inner
                .strip_suffix(quote)
                .map(str::to_string)
                .ok_or_else(|| invalid(original, format!("unterminated quote in `{item}`")));
        }
    }
    if item
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        Ok(item.to_string())
    } else {
        Err(invalid(original, format!("cannot resolve `{item}`")))
    }
}

fn expand_parts(parts: Vec<Part>) -> Vec<String> {
    let mut expanded = vec![String::new()];
    for part in parts {
        match part {
            Part::Literal(text) => expanded.iter_mut().for_each(|prefix| prefix.push_str(&text)),
            Part::Placeholder(values) => {
                expanded = expanded
                    .iter()
                    .flat_map(|prefix| values.iter().map(move |value| format!("{prefix}{value}")))
                    .collect();
            }
        }
    }
    expanded
}

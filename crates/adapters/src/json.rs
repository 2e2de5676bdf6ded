// SPDX-License-Identifier: MIT

//! Normalize the external CLI's Python-`repr`-style dictionaries into
//! strict JSON, then decode the four record kinds the agent's sync pass
//! consumes.

use bb_core::BbError;
use serde_json::Value;

/// Rewrite single-quoted, unicode-prefixed Python-repr tokens into strict
/// JSON: single quotes outside an already-double-quoted span become double
/// quotes, and a leading `u` immediately before a single-quoted span is
/// dropped.
pub fn normalize_python_repr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            'u' if !in_single && !in_double && chars.peek() == Some(&'\'') => {
                // Drop the prefix; the following quote is handled next.
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push('"');
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push('"');
            }
            _ => out.push(c),
        }
    }

    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pool {
    pub id: String,
    pub units: String,
    pub granularity: u64,
    pub quantity: u64,
    pub free: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    pub id: i64,
    pub bytes: u64,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub id: String,
    pub token: String,
    pub used: bool,
    pub user_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub id: String,
    pub instance_id: String,
}

fn as_value_list(v: Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items,
        single => vec![single],
    }
}

fn field_str(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn field_u64(v: &Value, key: &str) -> u64 {
    v.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn field_i64(v: &Value, key: &str) -> i64 {
    v.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn field_bool(v: &Value, key: &str) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn parse_records(raw: &str) -> Result<Vec<Value>, BbError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let normalized = normalize_python_repr(raw);
    let value: Value = serde_json::from_str(&normalized)
    .map_err(|e| BbError::InvalidRequest(format!("malformed JSON adapter output: {e}")))?;
    Ok(as_value_list(value))
}

pub fn parse_pools(raw: &str) -> Result<Vec<Pool>, BbError> {
    Ok(parse_records(raw)?
        .iter()
        .map(|v| Pool {
            id: field_str(v, "id"),
            units: field_str(v, "units"),
            granularity: field_u64(v, "granularity"),
            quantity: field_u64(v, "quantity"),
            free: field_u64(v, "free"),
        })
        .collect())
}

pub fn parse_instances(raw: &str) -> Result<Vec<Instance>, BbError> {
    Ok(parse_records(raw)?
        .iter()
        .map(|v| Instance {
            id: field_i64(v, "id"),
            bytes: field_u64(v, "bytes"),
            label: field_str(v, "label"),
        })
        .collect())
}

pub fn parse_sessions(raw: &str) -> Result<Vec<Session>, BbError> {
    Ok(parse_records(raw)?
        .iter()
        .map(|v| Session {
            id: field_str(v, "id"),
            token: field_str(v, "token"),
            used: field_bool(v, "used"),
            user_id: field_u64(v, "owner") as u32,
        })
        .collect())
}

pub fn parse_configurations(raw: &str) -> Result<Vec<Config>, BbError> {
    Ok(parse_records(raw)?
        .iter()
        .map(|v| Config {
            id: field_str(v, "id"),
            instance_id: v
            .get("links")
            .and_then(|l| l.get("instance"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        })
        .collect())
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;

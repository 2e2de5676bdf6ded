// SPDX-License-Identifier: MIT

//! Scan `#BB`/`#DW` directive lines (or a single interactive flag string)
//! into a [`BufferSpec`].
//!
//! This is a single-pass line scanner, not a parser-combinator grammar —
//! the directive language is a flat set of `key=value` tokens, which a
//! hand-rolled scan covers without pulling in a parsing crate.

use crate::capacity::{parse_capacity, parse_swap_gib, Capacity};
use crate::spec::{BufferSpec, JobScratchRequest, PersistentCreate, PersistentDestroy};
use bb_core::BbError;
use std::collections::HashMap;

/// Parse key=value tokens from the words following a directive keyword.
/// Bare words with no `=` (e.g. `hurry`) are recorded with an empty value.
fn tokenize(words: &[&str]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for word in words {
        match word.split_once('=') {
            Some((k, v)) => {
                map.insert(k.to_string(), v.to_string());
            }
            None => {
                map.insert(word.to_string(), String::new());
            }
        }
    }
    map
}

fn require_name(tokens: &HashMap<String, String>) -> Result<String, BbError> {
    let name = tokens
    .get("name")
    .ok_or_else(|| BbError::InvalidRequest("missing name=".to_string()))?;
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(BbError::InvalidRequest(format!(
                    "persistent buffer name must not begin with a digit: {name}"
                )));
    }
    Ok(name.clone())
}

fn apply_capacity(spec: &mut BufferSpec, tokens: &HashMap<String, String>) -> Result<(), BbError> {
    let raw = tokens
    .get("capacity")
    .ok_or_else(|| BbError::InvalidRequest("missing capacity=".to_string()))?;
    match parse_capacity(raw)? {
        Capacity::Bytes(bytes) => {
            spec.job_scratch = Some(JobScratchRequest {
                bytes,
                access_mode: tokens.get("access_mode").or_else(|| tokens.get("access")).cloned(),
                buffer_type: tokens.get("type").cloned(),
            });
        }
        Capacity::Nodes(n) => spec.gres_nodes = Some(n),
    }
    Ok(())
}

/// Whether directive line scanning should stop: directives must precede
/// the real script body, and a line not starting with `#` terminates
/// scanning.
fn is_directive_line(line: &str) -> bool {
    line.starts_with('#')
}

fn process_line(spec: &mut BufferSpec, line: &str, uid: u32, allow_persistent: bool) -> Result<(), BbError> {
    let trimmed = line.trim();
    let rest = if let Some(r) = trimmed.strip_prefix("#BB") {
        r
    } else if let Some(r) = trimmed.strip_prefix("#DW") {
        r
    } else {
        return Ok(()); // A `#` comment that isn't ours; ignore.
    };

    let words: Vec<&str> = rest.split_whitespace().collect();
    let Some((keyword, rest_words)) = words.split_first() else {
        return Ok(());
    };
    let tokens = tokenize(rest_words);

    match *keyword {
        "create_persistent" => {
            if !allow_persistent {
                return Err(BbError::InvalidRequest(
                        "invalid request: persistent buffer creation not permitted".to_string(),
                    ));
            }
            let name = require_name(&tokens)?;
            let raw_cap = tokens
            .get("capacity")
            .ok_or_else(|| BbError::InvalidRequest("missing capacity=".to_string()))?;
            let size = match parse_capacity(raw_cap)? {
                Capacity::Bytes(b) => b,
                Capacity::Nodes(_) => {
                    return Err(BbError::InvalidRequest(
                            "persistent capacity must be byte-oriented".to_string(),
                        ))
                }
            };
            spec.persistent_creates.push(PersistentCreate {
                name,
                size,
                access_mode: tokens.get("access").cloned(),
                buffer_type: tokens.get("type").cloned(),
            });
        }
        "destroy_persistent" => {
            if !allow_persistent {
                return Err(BbError::InvalidRequest(
                        "invalid request: persistent buffer destruction not permitted".to_string(),
                    ));
            }
            let name = require_name(&tokens)?;
            let hurry = tokens.contains_key("hurry");
            spec.persistent_destroys.push(PersistentDestroy { name, hurry });
        }
        "jobdw" => apply_capacity(spec, &tokens)?,
        "swap" => {
            // `#DW swap S` — the bare value follows the keyword directly,
            // not as `swap=`.
            let raw = rest_words
            .first()
            .ok_or_else(|| BbError::InvalidRequest("missing swap size".to_string()))?;
            spec.swap_gib = Some(parse_swap_gib(raw)?);
        }
        "persistentdw" => {
            let name = require_name(&tokens)?;
            spec.persistent_uses.push(name);
        }
        other => {
            return Err(BbError::InvalidRequest(format!("unrecognized directive: {other}")));
        }
    }

    let _ = uid;
    Ok(())
}

/// Parse a job script body: scan `#BB`/`#DW` lines until the first line
/// that doesn't start with `#`.
pub fn parse_script_directives(
    body: &str,
    uid: u32,
    cfg: &bb_core::BbConfig,
) -> Result<BufferSpec, BbError> {
    let mut spec = BufferSpec::default();
    let allow_persistent = cfg.is_privileged(uid);
    for line in body.lines() {
        if !is_directive_line(line) {
            break;
        }
        process_line(&mut spec, line, uid, allow_persistent)?;
    }
    Ok(spec)
}

/// Parse a single interactive buffer-request string, e.g.
/// `"capacity=1GiB swap=4"`. The interactive form accepts the same
/// `capacity=` and `swap=` tokens in a single line.
pub fn parse_interactive(line: &str, _uid: u32, _cfg: &bb_core::BbConfig) -> Result<BufferSpec, BbError> {
    let mut spec = BufferSpec::default();
    let words: Vec<&str> = line.split_whitespace().collect();
    let tokens = tokenize(&words);

    if tokens.contains_key("capacity") {
        apply_capacity(&mut spec, &tokens)?;
    }
    if let Some(raw) = tokens.get("swap") {
        spec.swap_gib = Some(parse_swap_gib(raw)?);
    }
    Ok(spec)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;

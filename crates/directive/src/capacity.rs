// SPDX-License-Identifier: MIT

//! Parsing of `capacity=`/`swap=` quantities.

use bb_core::BbError;

/// A parsed `capacity=` value: either a byte-oriented quantity or the
/// node-count marker bit.
///
/// The marker bit is the literal form `<N>nodes` (e.g. `capacity=4nodes`),
/// read the same way DataWarp's own CLI accepts a bare node count instead
/// of a byte size for requests
/// that want one instance per node rather than a fixed total size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Bytes(u64),
    Nodes(u32),
}

const UNITS: &[(&str, u64)] = &[
    ("TiB", 1u64 << 40),
    ("GiB", 1u64 << 30),
    ("MiB", 1u64 << 20),
    ("KiB", 1u64 << 10),
    ("TB", 1_000_000_000_000),
    ("GB", 1_000_000_000),
    ("MB", 1_000_000),
    ("KB", 1_000),
    ("B", 1),
];

/// Parse a `capacity=` token's value, e.g. `"1GiB"`, `"100GB"`, `"4nodes"`.
pub fn parse_capacity(raw: &str) -> Result<Capacity, BbError> {
    let raw = raw.trim();
    if let Some(digits) = raw.strip_suffix("nodes") {
        let n: u32 = digits
        .trim()
        .parse()
        .map_err(|_| BbError::InvalidRequest(format!("invalid node-count capacity: {raw}")))?;
        return Ok(Capacity::Nodes(n));
    }

    for (suffix, multiplier) in UNITS {
        if let Some(digits) = raw.strip_suffix(suffix) {
            let n: f64 = digits
            .trim()
            .parse()
            .map_err(|_| BbError::InvalidRequest(format!("invalid capacity: {raw}")))?;
            if n < 0.0 {
                return Err(BbError::InvalidRequest(format!("negative capacity: {raw}")));
            }
            return Ok(Capacity::Bytes((n * *multiplier as f64).round() as u64));
        }
    }

    // Bare integer: bytes.
    let n: u64 = raw
    .parse()
    .map_err(|_| BbError::InvalidRequest(format!("invalid capacity: {raw}")))?;
    Ok(Capacity::Bytes(n))
}

/// Parse a `swap=`/`#DW swap` value in GiB.
pub fn parse_swap_gib(raw: &str) -> Result<u32, BbError> {
    raw.trim()
    .parse()
    .map_err(|_| BbError::InvalidRequest(format!("invalid swap size: {raw}")))
}

#[cfg(test)]
#[path = "capacity_tests.rs"]
mod tests;

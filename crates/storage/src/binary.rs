// SPDX-License-Identifier: MIT

//! The snapshot's binary layout: `u16 version · u32 record_count
//! · record*`, strings length-prefixed.
//!
//! Strings are length-prefixed with `u16` throughout, matching the width
//! already used for `version`.

use crate::record::SnapshotRecord;
use bb_core::BbError;

pub const CURRENT_SNAPSHOT_VERSION: u16 = 1;

fn write_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u16::MAX as usize) as u16;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&bytes[..len as usize]);
}

fn read_string(buf: &[u8], cursor: &mut usize) -> Result<String, BbError> {
    let len = read_u16(buf, cursor)? as usize;
    let end = *cursor + len;
    let bytes = buf
    .get(*cursor..end)
    .ok_or_else(|| BbError::SnapshotIo("truncated string in snapshot".to_string()))?;
    *cursor = end;
    String::from_utf8(bytes.to_vec()).map_err(|e| BbError::SnapshotIo(format!("invalid utf8 in snapshot: {e}")))
}

fn read_u16(buf: &[u8], cursor: &mut usize) -> Result<u16, BbError> {
    let end = *cursor + 2;
    let bytes = buf
    .get(*cursor..end)
    .ok_or_else(|| BbError::SnapshotIo("truncated u16 in snapshot".to_string()))?;
    *cursor = end;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buf: &[u8], cursor: &mut usize) -> Result<u32, BbError> {
    let end = *cursor + 4;
    let bytes = buf
    .get(*cursor..end)
    .ok_or_else(|| BbError::SnapshotIo("truncated u32 in snapshot".to_string()))?;
    *cursor = end;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(buf: &[u8], cursor: &mut usize) -> Result<u64, BbError> {
    let end = *cursor + 8;
    let bytes = buf
    .get(*cursor..end)
    .ok_or_else(|| BbError::SnapshotIo("truncated u64 in snapshot".to_string()))?;
    *cursor = end;
    Ok(u64::from_le_bytes(bytes.try_into().map_err(|_| BbError::SnapshotIo("bad u64".to_string()))?))
}

pub fn encode_snapshot(records: &[SnapshotRecord], emulation: bool) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&CURRENT_SNAPSHOT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for r in records {
        write_string(&mut buf, &r.account);
        buf.extend_from_slice(&r.create_time.to_le_bytes());
        write_string(&mut buf, &r.name);
        write_string(&mut buf, &r.partition);
        write_string(&mut buf, &r.qos);
        buf.extend_from_slice(&r.user_id.to_le_bytes());
        if emulation {
            buf.extend_from_slice(&r.size.unwrap_or(0).to_le_bytes());
        }
    }
    buf
}

pub fn decode_snapshot(buf: &[u8], emulation: bool) -> Result<Vec<SnapshotRecord>, BbError> {
    let mut cursor = 0usize;
    let version = read_u16(buf, &mut cursor)?;
    if version != CURRENT_SNAPSHOT_VERSION {
        return Err(BbError::SnapshotIo(format!("unsupported snapshot version: {version}")));
    }
    let count = read_u32(buf, &mut cursor)?;
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let account = read_string(buf, &mut cursor)?;
        let create_time = read_u64(buf, &mut cursor)?;
        let name = read_string(buf, &mut cursor)?;
        let partition = read_string(buf, &mut cursor)?;
        let qos = read_string(buf, &mut cursor)?;
        let user_id = read_u32(buf, &mut cursor)?;
        let size = if emulation { Some(read_u64(buf, &mut cursor)?) } else { None };
        records.push(SnapshotRecord {
            account,
            create_time,
            name,
            partition,
            qos,
            user_id,
            size,
        });
    }
    Ok(records)
}

#[cfg(test)]
#[path = "binary_tests.rs"]
mod tests;

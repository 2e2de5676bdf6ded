// SPDX-License-Identifier: MIT

//! Byte-to-MB conversion shared by `set_tres_cnt`/`xlate_bb_2_tres_str`,
//! which report the byte request as MB.

const BYTES_PER_MB: u64 = 1 << 20;

pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes.div_ceil(BYTES_PER_MB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_whole_megabytes() {
        assert_eq!(bytes_to_mb(0), 0);
        assert_eq!(bytes_to_mb(1), 1);
        assert_eq!(bytes_to_mb(1 << 20), 1);
        assert_eq!(bytes_to_mb((1 << 20) + 1), 2);
    }
}

use super::*;

fn sample() -> Vec<SnapshotRecord> {
    vec![
        SnapshotRecord {
            account: "acct1".to_string(),
            create_time: 1_700_000_000,
            name: "job1".to_string(),
            partition: "part1".to_string(),
            qos: "normal".to_string(),
            user_id: 1000,
            size: None,
        },
        SnapshotRecord {
            account: "acct2".to_string(),
            create_time: 1_700_000_500,
            name: "persist-foo".to_string(),
            partition: "part2".to_string(),
            qos: "high".to_string(),
            user_id: 1001,
            size: None,
        },
    ]
}

#[test]
fn round_trips_without_emulation() {
    let records = sample();
    let bytes = encode_snapshot(&records, false);
    let decoded = decode_snapshot(&bytes, false).unwrap();
    assert_eq!(decoded, records);
}

#[test]
fn round_trips_with_emulation_size() {
    let mut records = sample();
    records[0].size = Some(4096);
    records[1].size = Some(8192);
    let bytes = encode_snapshot(&records, true);
    let decoded = decode_snapshot(&bytes, true).unwrap();
    assert_eq!(decoded, records);
}

#[test]
fn empty_record_set_round_trips() {
    let bytes = encode_snapshot(&[], false);
    assert_eq!(decode_snapshot(&bytes, false).unwrap(), vec![]);
}

#[test]
fn rejects_truncated_buffer() {
    let records = sample();
    let bytes = encode_snapshot(&records, false);
    let truncated = &bytes[..bytes.len() - 3];
    assert!(decode_snapshot(truncated, false).is_err());
}

#[test]
fn rejects_unsupported_version() {
    let mut bytes = encode_snapshot(&[], false);
    bytes[0] = 0xff;
    assert!(decode_snapshot(&bytes, false).is_err());
}

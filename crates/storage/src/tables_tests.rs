use super::*;
use bb_core::{AssociationRef, BufferState};

fn alloc(owner: u32, job_id: Option<&str>, name: Option<&str>) -> Allocation {
    Allocation {
        owner: UserId::new(owner),
        job_id: job_id.map(JobId::from),
        name: name.map(|s| s.to_string()),
        size: 1024,
        account: "acct".to_string(),
        partition: "part".to_string(),
        qos: "normal".to_string(),
        create_time: 1_700_000_000,
        last_seen: 1_700_000_000,
        state: BufferState::Pending,
        association: AssociationRef::default(),
        charged: false,
    }
}

#[test]
fn inserts_and_finds_job_scratch_allocation() {
    let mut store = StateStore::new();
    store.insert_allocation(alloc(1000, Some("42"), None));
    let key = AllocationKey::JobScratch(JobId::from("42"));
    assert!(store.find_allocation(UserId::new(1000), &key).is_some());
}

#[test]
fn buckets_by_user_id_modulo_bucket_count() {
    let mut store = StateStore::new();
    store.insert_allocation(alloc(1000, None, Some("foo")));
    store.insert_allocation(alloc(1000 + BUCKET_COUNT as u32, None, Some("bar")));
    // Both land in the same bucket but remain independently addressable.
    let foo = AllocationKey::Persistent(UserId::new(1000), "foo".to_string());
    let bar = AllocationKey::Persistent(UserId::new(1000 + BUCKET_COUNT as u32), "bar".to_string());
    assert!(store.find_allocation(UserId::new(1000), &foo).is_some());
    assert!(store.find_allocation(UserId::new(1000 + BUCKET_COUNT as u32), &bar).is_some());
}

#[test]
fn removes_allocation() {
    let mut store = StateStore::new();
    store.insert_allocation(alloc(1000, Some("42"), None));
    let key = AllocationKey::JobScratch(JobId::from("42"));
    assert!(store.remove_allocation(UserId::new(1000), &key).is_some());
    assert!(store.find_allocation(UserId::new(1000), &key).is_none());
}

#[test]
fn tracks_usage_counters_per_user_account_partition_qos() {
    let mut store = StateStore::new();
    let key = UsageKey {
        user_id: UserId::new(1000),
        account: "acct".to_string(),
        partition: "part".to_string(),
        qos: "normal".to_string(),
    };
    store.add_usage(key.clone(), 100);
    store.add_usage(key.clone(), 50);
    assert_eq!(store.usage(&key), 150);
    store.sub_usage(&key, 200);
    assert_eq!(store.usage(&key), 0, "usage must not underflow");
}

#[test]
fn plan_table_round_trips_by_job_id() {
    let mut store = StateStore::new();
    let plan = bb_core::BufferPlan {
        job_id: JobId::from("7"),
        user_id: UserId::new(1000),
        account: "acct".to_string(),
        partition: "part".to_string(),
        qos: "normal".to_string(),
        total_size: 0,
        swap_gib: 0,
        swap_node_count: 0,
        access_mode: None,
        buffer_type: None,
        gres: vec![],
        persistent_ops: vec![],
        state: BufferState::Pending,
        canonical: String::new(),
        state_entered_at: 0,
        state_reason: None,
        state_desc: None,
    };
    store.upsert_plan(plan.clone());
    assert_eq!(store.plan(&JobId::from("7")).unwrap().account, "acct");
    assert!(store.remove_plan(&JobId::from("7")).is_some());
    assert!(store.plan(&JobId::from("7")).is_none());
}

#[test]
fn usage_for_user_sums_across_account_partition_qos() {
    let mut store = StateStore::new();
    store.add_usage(
        UsageKey { user_id: UserId::new(1000), account: "a1".to_string(), partition: "p1".to_string(), qos: "normal".to_string() },
        100,
    );
    store.add_usage(
        UsageKey { user_id: UserId::new(1000), account: "a2".to_string(), partition: "p2".to_string(), qos: "high".to_string() },
        50,
    );
    store.add_usage(
        UsageKey { user_id: UserId::new(2000), account: "a1".to_string(), partition: "p1".to_string(), qos: "normal".to_string() },
        999,
    );
    assert_eq!(store.usage_for_user(UserId::new(1000)), 150);
}

#[test]
fn pool_state_round_trips() {
    let mut store = StateStore::new();
    assert_eq!(store.pool.total, 0);
    store.set_pool(PoolState { granularity: 1024, total: 1_000_000, used: 200_000 });
    let pool = store.pool;
    assert_eq!(pool.granularity, 1024);
    assert_eq!(pool.total, 1_000_000);
    assert_eq!(pool.used, 200_000);
}

#[test]
fn gres_state_defaults_to_zero_for_unknown_name() {
    let store = StateStore::new();
    let gres = store.gres("gpu");
    assert_eq!(gres.avail, 0);
    assert_eq!(gres.used, 0);
    assert_eq!(gres.reserved, 0);
}

#[test]
fn recovered_record_is_claimed_once_by_name_and_owner() {
    let mut store = StateStore::new();
    store.seed_recovered(vec![crate::record::SnapshotRecord {
            account: "acct".to_string(),
            create_time: 1_700_000_000,
            name: "foo".to_string(),
            partition: "part".to_string(),
            qos: "normal".to_string(),
            user_id: 1000,
            size: None,
        }]);
    assert!(store.take_recovered("foo", UserId::new(2000)).is_none(), "a different owner of the same name must not claim it");
    let claimed = store.take_recovered("foo", UserId::new(1000)).expect("record should be claimable");
    assert_eq!(claimed.account, "acct");
    assert!(store.take_recovered("foo", UserId::new(1000)).is_none(), "a record is claimed at most once");
    assert!(store.take_recovered("bar", UserId::new(1000)).is_none());
}

#[test]
fn recovered_records_with_the_same_name_are_kept_separate_by_owner() {
    let mut store = StateStore::new();
    store.seed_recovered(vec![
        crate::record::SnapshotRecord {
            account: "acct-a".to_string(),
            create_time: 1_700_000_000,
            name: "shared".to_string(),
            partition: "part".to_string(),
            qos: "normal".to_string(),
            user_id: 1000,
            size: None,
        },
        crate::record::SnapshotRecord {
            account: "acct-b".to_string(),
            create_time: 1_700_000_000,
            name: "shared".to_string(),
            partition: "part".to_string(),
            qos: "normal".to_string(),
            user_id: 2000,
            size: None,
        },
    ]);
    assert_eq!(store.take_recovered("shared", UserId::new(1000)).unwrap().account, "acct-a");
    assert_eq!(store.take_recovered("shared", UserId::new(2000)).unwrap().account, "acct-b");
}

#[test]
fn gres_state_round_trips_by_name() {
    let mut store = StateStore::new();
    store.set_gres("gpu", GresState { avail: 8, used: 3, reserved: 1 });
    let gpu = store.gres("gpu");
    assert_eq!(gpu.avail, 8);
    assert_eq!(gpu.used, 3);
    assert_eq!(gpu.reserved, 1);
    assert_eq!(store.gres_names().collect::<Vec<_>>(), vec![&"gpu".to_string()]);
}

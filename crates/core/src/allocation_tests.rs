use super::*;

fn base_allocation() -> Allocation {
    Allocation {
        owner: UserId::new(42),
        job_id: None,
        name: None,
        size: 1024,
        account: "acct".into(),
        partition: "part".into(),
        qos: "normal".into(),
        create_time: 0,
        last_seen: 0,
        state: BufferState::Allocated,
        association: AssociationRef::default(),
        charged: true,
    }
}

#[test]
fn job_scratch_key_uses_job_id() {
    let mut alloc = base_allocation();
    alloc.job_id = Some(JobId::new("55"));
    assert_eq!(alloc.key(), AllocationKey::JobScratch(JobId::new("55")));
    assert!(!alloc.is_persistent());
}

#[test]
fn persistent_key_uses_owner_and_name() {
    let mut alloc = base_allocation();
    alloc.name = Some("scratch1".into());
    assert_eq!(
        alloc.key(),
        AllocationKey::Persistent(UserId::new(42), "scratch1".into())
    );
    assert!(alloc.is_persistent());
}

#[test]
fn association_ref_invalidate_clears_cache() {
    let mut assoc = AssociationRef::new("acct:42");
    assoc.cached = Some(AssociationHandle(7));
    assoc.invalidate();
    assert!(assoc.cached.is_none());
}

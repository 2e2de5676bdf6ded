// SPDX-License-Identifier: MIT

//! Capacity & quota planner: a pure admission test plus preemption victim
//! selection. Nothing here touches the state store or the external
//! command runner — callers apply the verdict.

use bb_core::{
    round_up_to_granularity, Allocation, AllocationKey, BbConfig, BufferPlan, HostJobQuery, PreemptionPolicy,
    ReservationSource, UserId,
};
use bb_storage::StateStore;
use std::collections::HashMap;

/// The three-way verdict defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitDecision {
    /// `0` — may start now.
    Admit,
    /// `1` — exceeds a configured limit; skip, keep iterating.
    Skip,
    /// `2` — insufficient capacity even after preemption; stop iterating.
    Stop,
}

/// Full admission result: the verdict plus which allocations (if any) must
/// be torn down to make room.
#[derive(Debug, Clone, Default)]
pub struct AdmitOutcome {
    pub decision_detail: Option<AdmitDecision>,
    pub preempt: Vec<AllocationKey>,
}

impl AdmitOutcome {
    pub fn decision(&self) -> AdmitDecision {
        self.decision_detail.unwrap_or(AdmitDecision::Stop)
    }
}

struct Deficits {
    user: u64,
    total: u64,
    gres: HashMap<String, u64>,
}

/// Run the admission test for `plan`.
pub fn evaluate<H: HostJobQuery + ReservationSource>(
    state: &StateStore,
    cfg: &BbConfig,
    host: &H,
    now: u64,
    plan: &BufferPlan,
) -> AdmitOutcome {
    let add_space = round_up_to_granularity(plan.add_space(), cfg.granularity);

    let resv_space: u64 = host
    .reservations()
    .iter()
    .filter(|r| r.matches_plugin)
    .map(|r| r.used_space)
    .sum();

    let user_needed = match cfg.user_size_limit {
        Some(limit) => {
            let have = state.usage_for_user(plan.user_id);
            (have + add_space).saturating_sub(limit)
        }
        None => 0,
    };

    let pool = state.pool();
    let total_needed = (pool.used + add_space + resv_space).saturating_sub(pool.total);

    let mut gres_deficits = HashMap::new();
    for req in &plan.gres {
        let Some(&avail) = cfg.gres_avail.get(&req.name) else {
            return AdmitOutcome { decision_detail: Some(AdmitDecision::Skip), preempt: vec![] };
        };
        if req.count > avail {
            return AdmitOutcome { decision_detail: Some(AdmitDecision::Skip), preempt: vec![] };
        }
        let gres = state.gres(&req.name);
        let free = avail.saturating_sub(gres.used + gres.reserved);
        let needed = req.count.saturating_sub(free);
        if needed > 0 {
            gres_deficits.insert(req.name.clone(), needed);
        }
    }

    let deficits = Deficits { user: user_needed, total: total_needed, gres: gres_deficits };

    if deficits.user == 0 && deficits.total == 0 && deficits.gres.is_empty() {
        return AdmitOutcome { decision_detail: Some(AdmitDecision::Admit), preempt: vec![] };
    }

    // Generic-resource deficits have no preemption path in this model: no
    // Allocation carries per-gres accounting to release a preempted
    // allocation's gres share against. Any outstanding gres deficit stops
    // iteration outright.
    if !deficits.gres.is_empty() {
        return AdmitOutcome { decision_detail: Some(AdmitDecision::Stop), preempt: vec![] };
    }

    let candidate_start_time = host.job_info(&plan.job_id).map(|i| i.start_time).unwrap_or(now);
    let victims = select_victims(state, host, cfg.preemption_policy, plan.user_id, now, candidate_start_time, deficits.user, deficits.total);

    let covered = victims.user_remaining == 0 && victims.total_remaining == 0;
    AdmitOutcome {
        decision_detail: Some(if covered { AdmitDecision::Admit } else { AdmitDecision::Stop }),
        preempt: victims.keys,
    }
}

struct VictimSelection {
    keys: Vec<AllocationKey>,
    user_remaining: u64,
    total_remaining: u64,
}

/// Enumerate preemption victims per: candidates are allocations
/// whose projected `use_time` is both in the future and later than the
/// candidate job's own start time, ordered by the configured policy,
/// charged first against the same user's own allocations and then against
/// everyone else's.
fn select_victims<H: HostJobQuery>(
    state: &StateStore,
    host: &H,
    policy: PreemptionPolicy,
    candidate_user: UserId,
    now: u64,
    candidate_start_time: u64,
    user_needed: u64,
    total_needed: u64,
) -> VictimSelection {
    // Job-scratch allocations only: a persistent buffer has no job record
    // to source a projected use_time from, so it is never a victim.
    let mut pool: Vec<(Allocation, u64, u32)> = state
    .allocations()
    .filter(|a| a.job_id.is_some() && !a.state.is_terminal())
    .filter_map(|a| {
        let job_id = a.job_id.clone()?;
        let info = host.job_info(&job_id)?;
        Some((a.clone(), info.start_time, info.priority))
    })
    .filter(|(_, use_time, _)| *use_time > now && *use_time > candidate_start_time)
    .collect();

    match policy {
        PreemptionPolicy::LatestStartTimeFirst => pool.sort_by(|a, b| b.1.cmp(&a.1)),
        PreemptionPolicy::LowestPriorityFirst => pool.sort_by(|a, b| a.2.cmp(&b.2)),
    }

    let mut keys = Vec::new();
    let mut user_remaining = user_needed;
    let mut total_remaining = total_needed;

    for (a, _, _) in pool.iter().filter(|(a, _, _)| a.owner == candidate_user) {
        if user_remaining == 0 && total_remaining == 0 {
            break;
        }
        keys.push(a.key());
        user_remaining = user_remaining.saturating_sub(a.size);
        total_remaining = total_remaining.saturating_sub(a.size);
    }

    for (a, _, _) in pool.iter().filter(|(a, _, _)| a.owner != candidate_user) {
        if total_remaining == 0 {
            break;
        }
        let key = a.key();
        if keys.contains(&key) {
            continue;
        }
        keys.push(key);
        total_remaining = total_remaining.saturating_sub(a.size);
    }

    VictimSelection { keys, user_remaining, total_remaining }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;

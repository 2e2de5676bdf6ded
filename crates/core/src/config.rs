// SPDX-License-Identifier: MIT

//! This plugin's own settings. Excludes parsing the *host* scheduler's
//! config file; `BbConfig` is supplied by the host at plugin init,
//! typically loaded from this plugin's own TOML file via `toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// How victims are ordered when the planner needs to preempt in-progress
/// stage-ins to make room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreemptionPolicy {
    /// Preempt the allocation with the furthest-future `start_time` first
    /// (kicks the job least likely to need its space soon).
    LatestStartTimeFirst,
    /// Preempt the lowest-priority job first.
    LowestPriorityFirst,
}

impl Default for PreemptionPolicy {
    fn default() -> Self {
        Self::LowestPriorityFirst
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub stage_in_secs: u64,
    pub stage_out_secs: u64,
    pub pre_run_secs: u64,
    pub setup_secs: u64,
    pub teardown_secs: u64,
    pub post_run_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            stage_in_secs: 24 * 3600,
            stage_out_secs: 24 * 3600,
            pre_run_secs: 5,
            setup_secs: 5,
            teardown_secs: 5,
            post_run_secs: 5,
        }
    }
}

impl Timeouts {
    pub fn for_function(&self, function: &str) -> Duration {
        let secs = match function {
            "data_in" | "setup" => self.stage_in_secs,
            "data_out" => self.stage_out_secs,
            "pre_run" => self.pre_run_secs,
            "teardown" => self.teardown_secs,
            "post_run" => self.post_run_secs,
            _ => self.setup_secs,
        };
        Duration::from_secs(secs)
    }
}

/// This plugin's configuration, supplied by the host at plugin init.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BbConfig {
    /// Name this plugin is registered under; used to match reservations
    /// against the host's reservation table.
    pub plugin_name: String,
    /// Absolute path to the external data-movement CLI.
    pub cli_path: PathBuf,
    /// Pool capacity granularity in bytes, refreshed from `show_pools` by
    /// the agent but seeded here for startup-before-first-sync behavior.
    pub granularity: u64,
    /// Per-user cumulative size limit in bytes, if configured.
    pub user_size_limit: Option<u64>,
    /// Per-(partition, qos) size limits, if configured.
    pub partition_qos_limits: HashMap<String, u64>,
    /// Per-generic-resource-kind available quantity. An undefined kind is
    /// treated as having no dedicated limit.
    pub gres_avail: HashMap<String, u64>,
    pub timeouts: Timeouts,
    /// uids allowed to use `create_persistent`/`destroy_persistent`
    /// regardless of `allow_all_persistent`.
    pub privileged_users: Vec<u32>,
    /// If non-empty, only these uids may submit a burst-buffer request at
    /// all; checked before `deny_users`.
    pub allow_users: Vec<u32>,
    /// uids refused outright, regardless of `allow_users`.
    pub deny_users: Vec<u32>,
    /// Site flag: when true, every submitter may request persistent
    /// create/destroy.
    pub allow_all_persistent: bool,
    pub preemption_policy: PreemptionPolicy,
    /// Background agent sync interval.
    pub sync_interval_secs: u64,
    /// Emulation mode: used-capacity counters come from the snapshot, not
    /// the external subsystem.
    pub emulation_mode: bool,
    /// Root directory for per-job artifacts and the snapshot file.
    pub state_save_dir: PathBuf,
}

impl Default for BbConfig {
    fn default() -> Self {
        Self {
            plugin_name: "cray".to_string(),
            cli_path: PathBuf::from("/opt/cray/dw_wlm/default/bin/dw_wlm_cli"),
            granularity: 1,
            user_size_limit: None,
            partition_qos_limits: HashMap::new(),
            gres_avail: HashMap::new(),
            timeouts: Timeouts::default(),
            privileged_users: Vec::new(),
            allow_users: Vec::new(),
            deny_users: Vec::new(),
            allow_all_persistent: false,
            preemption_policy: PreemptionPolicy::default(),
            sync_interval_secs: 10,
            emulation_mode: false,
            state_save_dir: PathBuf::from("/var/spool/slurm/burst_buffer"),
        }
    }
}

impl BbConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Whether `uid` may submit a burst-buffer request at all: denied
    /// outright if on `deny_users`, otherwise admitted unless `allow_users`
    /// is non-empty and excludes it.
    pub fn is_permitted(&self, uid: u32) -> bool {
        if self.deny_users.contains(&uid) {
            return false;
        }
        self.allow_users.is_empty() || self.allow_users.contains(&uid)
    }

    pub fn is_privileged(&self, uid: u32) -> bool {
        self.allow_all_persistent || self.privileged_users.contains(&uid)
    }

    /// Whether `uid` is a super-user for ownership checks. Unlike
    /// [`is_privileged`](Self::is_privileged), the site-wide
    /// `allow_all_persistent` flag does not confer this — it only widens
    /// who may *submit* persistent directives, not who may act on buffers
    /// they don't own.
    pub fn is_super_user(&self, uid: u32) -> bool {
        self.privileged_users.contains(&uid)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

use std::path::PathBuf;

use occ_scheduler::SchedulerConfig;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    gov::SweepLimits,
    slashing::JailPolicy,
    AppConfig,
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Log filter directives.
    pub log: String,
    /// Writes a human readable format to stdout instead of JSON.
    pub pretty_print: bool,
    /// Forces writing trace data to stdout no matter if connected to a tty or not.
    pub force_stdout: bool,
    /// The JSON file holding the genesis app state.
    pub genesis_file: PathBuf,
    /// The file of JSON encoded blocks to replay, one per line.
    pub blocks_file: PathBuf,
    /// Worker threads of the scheduler. `0` uses one per core.
    pub occ_workers: usize,
    /// Parallel rounds per block before the scheduler executes the rest sequentially.
    pub occ_max_rounds: usize,
    pub max_tx_bytes: usize,
    /// Includes messages nested in `MsgExec`.
    pub max_msgs_per_tx: usize,
    pub gov_max_proposals_per_block: u32,
    /// Deposits and votes settled per block across all proposals.
    pub gov_max_entries_per_block: u32,
    /// Either `keep_marginal` or `halt`.
    pub jail_policy: JailPolicy,
}

impl config::Config for Config {
    const PREFIX: &'static str = "OCC_CHAIN_";
}

impl Config {
    #[must_use]
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            scheduler: SchedulerConfig {
                workers: self.occ_workers,
                max_rounds: self.occ_max_rounds,
            },
            max_tx_bytes: self.max_tx_bytes,
            max_msgs_per_tx: self.max_msgs_per_tx,
            gov_sweep: SweepLimits {
                max_proposals: self.gov_max_proposals_per_block,
                max_entries: self.gov_max_entries_per_block,
            },
            jail_policy: self.jail_policy,
        }
    }
}

//! Downtime tracking, jailing and unjailing.

pub(crate) mod action;
pub(crate) mod component;
mod hooks;
mod state_ext;
pub(crate) mod storage;

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    ensure,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

pub use self::action::MsgUnjail;
pub(crate) use self::{
    hooks::SlashingHooks,
    state_ext::{
        StateReadExt,
        StateWriteExt,
    },
};

/// What to do when jailing every validator that crossed the downtime threshold would
/// leave the validator set without voting power.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JailPolicy {
    /// Spare the highest-power offenders until some voting power remains.
    #[default]
    KeepMarginal,
    /// Refuse to finalize the block.
    Halt,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ValidatorSigningInfo {
    pub address: [u8; 20],
    pub start_height: u64,
    pub index_offset: u64,
    /// Unix seconds.
    pub jailed_until: u64,
    pub tombstoned: bool,
    pub missed_blocks_counter: u64,
}

impl ValidatorSigningInfo {
    #[must_use]
    pub fn new(address: &tendermint::account::Id, start_height: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(address.as_bytes());
        Self {
            address: bytes,
            start_height,
            index_offset: 0,
            jailed_until: 0,
            tombstoned: false,
            missed_blocks_counter: 0,
        }
    }

    #[must_use]
    pub fn consensus_address(&self) -> tendermint::account::Id {
        tendermint::account::Id::new(self.address)
    }
}

#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct SlashingParams {
    pub signed_blocks_window: u64,
    pub min_signed_per_window_bps: u64,
    pub downtime_jail_duration_secs: u64,
    pub slash_fraction_downtime_bps: u64,
}

impl SlashingParams {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            self.signed_blocks_window > 0,
            "signed_blocks_window must be positive"
        );
        ensure!(
            self.min_signed_per_window_bps <= 10_000,
            "min_signed_per_window_bps must not exceed 10000"
        );
        ensure!(
            self.slash_fraction_downtime_bps <= 10_000,
            "slash_fraction_downtime_bps must not exceed 10000"
        );
        Ok(())
    }

    /// The number of missed blocks within the window above which a validator is jailed.
    #[must_use]
    pub fn max_missed_blocks(&self) -> u64 {
        let min_signed = u128::from(self.signed_blocks_window)
            * u128::from(self.min_signed_per_window_bps)
            / 10_000;
        self.signed_blocks_window
            .saturating_sub(u64::try_from(min_signed).unwrap_or(u64::MAX))
    }
}

impl Default for SlashingParams {
    fn default() -> Self {
        Self {
            signed_blocks_window: 100,
            min_signed_per_window_bps: 5_000,
            downtime_jail_duration_secs: 600,
            slash_fraction_downtime_bps: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisSigningInfo {
    pub address: tendermint::account::Id,
    pub start_height: u64,
    pub index_offset: u64,
    pub jailed_until: u64,
    pub tombstoned: bool,
    pub missed_blocks_counter: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisMissedBlocks {
    pub address: tendermint::account::Id,
    pub missed_indices: Vec<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisSlashing {
    pub params: SlashingParams,
    #[serde(default)]
    pub signing_infos: Vec<GenesisSigningInfo>,
    #[serde(default)]
    pub missed_blocks: Vec<GenesisMissedBlocks>,
}

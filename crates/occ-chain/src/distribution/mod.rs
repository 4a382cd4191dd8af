//! Allocation of collected fees to the proposer, the voters and the community pool.

pub(crate) mod component;
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

pub(crate) use self::state_ext::{
    StateReadExt,
    StateWriteExt,
};

#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct DistributionParams {
    pub community_tax_bps: u64,
    pub base_proposer_reward_bps: u64,
    pub bonus_proposer_reward_bps: u64,
}

impl DistributionParams {
    pub(crate) fn validate(&self) -> Result<()> {
        let total = self
            .community_tax_bps
            .saturating_add(self.base_proposer_reward_bps)
            .saturating_add(self.bonus_proposer_reward_bps);
        ensure!(
            total <= 10_000,
            "community tax and proposer rewards add up to {total} bps, more than 10000"
        );
        Ok(())
    }
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            community_tax_bps: 200,
            base_proposer_reward_bps: 100,
            bonus_proposer_reward_bps: 400,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisDistribution {
    pub params: DistributionParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_above_the_whole_are_rejected() {
        let params = DistributionParams {
            community_tax_bps: 5_000,
            base_proposer_reward_bps: 5_000,
            bonus_proposer_reward_bps: 1,
        };
        assert!(params.validate().is_err());
        assert!(DistributionParams::default().validate().is_ok());
    }
}

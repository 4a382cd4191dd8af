use eyre::{
    OptionExt as _,
    Result,
};
use occ_storage::StateWrite;
use tracing::debug;

use super::{
    StateReadExt as _,
    StateWriteExt as _,
    ValidatorSigningInfo,
};
use crate::{
    address::Address,
    staking::{
        StakingHooks,
        VALIDATOR_UPDATE_DELAY,
    },
};

/// Keeps signing infos in step with the validator lifecycle.
pub(crate) struct SlashingHooks;

impl StakingHooks for SlashingHooks {
    fn after_validator_bonded<S: StateWrite>(
        &self,
        state: &mut S,
        consensus_address: &tendermint::account::Id,
        _operator: &Address,
        height: u64,
    ) -> Result<()> {
        if state.get_signing_info(consensus_address)?.is_none() {
            state.put_signing_info(ValidatorSigningInfo::new(consensus_address, height))?;
        }
        Ok(())
    }

    /// Votes of a removed validator keep arriving until the removal reached consensus,
    /// so its signing info outlives it by the update delay plus one block.
    fn after_validator_removed<S: StateWrite>(
        &self,
        state: &mut S,
        consensus_address: &tendermint::account::Id,
        operator: &Address,
        height: u64,
    ) -> Result<()> {
        let purge_height = height
            .checked_add(VALIDATOR_UPDATE_DELAY + 1)
            .ok_or_eyre("purge height overflows")?;
        state.schedule_signing_info_purge(purge_height, consensus_address)?;
        debug!(%operator, purge_height, "scheduled signing info purge");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use occ_storage::{
        StateDelta,
        Storage,
    };

    use super::*;
    use crate::test_utils::address;

    #[test]
    fn bonding_initializes_missing_signing_info_only() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        let consensus = tendermint::account::Id::new([1; 20]);
        SlashingHooks
            .after_validator_bonded(&mut state, &consensus, &address(1), 5)
            .unwrap();
        assert_eq!(
            5,
            state.get_signing_info(&consensus).unwrap().unwrap().start_height
        );

        SlashingHooks
            .after_validator_bonded(&mut state, &consensus, &address(1), 9)
            .unwrap();
        assert_eq!(
            5,
            state.get_signing_info(&consensus).unwrap().unwrap().start_height
        );
    }
}

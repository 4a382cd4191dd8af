use eyre::Result;
use occ_storage::StateWrite;

use crate::address::Address;

/// Callbacks fired synchronously by staking as validators and delegations change.
///
/// Every method defaults to doing nothing.
pub(crate) trait StakingHooks {
    fn after_validator_bonded<S: StateWrite>(
        &self,
        _state: &mut S,
        _consensus_address: &tendermint::account::Id,
        _operator: &Address,
        _height: u64,
    ) -> Result<()> {
        Ok(())
    }

    fn after_validator_begin_unbonding<S: StateWrite>(
        &self,
        _state: &mut S,
        _consensus_address: &tendermint::account::Id,
        _operator: &Address,
        _height: u64,
    ) -> Result<()> {
        Ok(())
    }

    fn after_validator_removed<S: StateWrite>(
        &self,
        _state: &mut S,
        _consensus_address: &tendermint::account::Id,
        _operator: &Address,
        _height: u64,
    ) -> Result<()> {
        Ok(())
    }

    fn before_delegation_removed<S: StateWrite>(
        &self,
        _state: &mut S,
        _delegator: &Address,
        _validator: &Address,
    ) -> Result<()> {
        Ok(())
    }
}

impl StakingHooks for () {}

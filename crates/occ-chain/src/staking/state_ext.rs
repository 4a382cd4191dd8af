use std::collections::BTreeMap;

use eyre::{
    OptionExt as _,
    Result,
    WrapErr as _,
};
use occ_storage::{
    StateRead,
    StateWrite,
};
use tracing::instrument;

use super::{
    storage::{
        self,
        keys,
    },
    StakingParams,
    UnbondingDelegation,
    Validator,
    ValidatorUpdate,
};
use crate::{
    address::Address,
    storage::{
        delete,
        get,
        keys::parse_address_hex,
        prefix_keys,
        prefix_values,
        put,
    },
};

pub(crate) trait StateReadExt: StateRead {
    #[instrument(skip_all, err)]
    fn get_staking_params(&self) -> Result<StakingParams> {
        get::<_, StakingParams>(self, keys::PARAMS)
            .wrap_err("failed reading staking params from state")?
            .ok_or_eyre("staking params not found in state")
    }

    #[instrument(skip_all, fields(%operator), err)]
    fn get_validator(&self, operator: &Address) -> Result<Option<Validator>> {
        get(self, &keys::validator(operator)).wrap_err("failed reading validator from state")
    }

    fn get_validators(&self) -> Result<Vec<Validator>> {
        prefix_values::<_, Validator>(self, keys::VALIDATOR_PREFIX, usize::MAX)
            .map(|validators| validators.into_iter().map(|(_, v)| v).collect())
            .wrap_err("failed reading validators from state")
    }

    /// Looks up the operator behind a consensus address.
    #[instrument(skip_all, err)]
    fn get_validator_by_consensus_address(
        &self,
        address: &tendermint::account::Id,
    ) -> Result<Option<Address>> {
        get::<_, storage::Operator>(self, &keys::consensus_index(address))
            .map(|operator| operator.map(|operator| operator.0))
            .wrap_err("failed reading consensus address index from state")
    }

    /// The eligible validators in power order, at most `limit` of them.
    fn get_power_index(&self, limit: usize) -> Result<Vec<Address>> {
        prefix_keys(self, keys::POWER_INDEX_PREFIX, limit)
            .wrap_err("failed reading power index from state")?
            .iter()
            .map(|key| -> Result<Address> {
                let (_, operator) = key
                    .split_once('/')
                    .ok_or_eyre("malformed power index key")?;
                parse_address_hex(operator)
            })
            .collect()
    }

    fn get_last_validator_powers(&self) -> Result<BTreeMap<Address, u64>> {
        prefix_values::<_, storage::Power>(self, keys::LAST_POWER_PREFIX, usize::MAX)
            .wrap_err("failed reading last validator powers from state")?
            .into_iter()
            .map(|(operator, power)| -> Result<(Address, u64)> {
                Ok((parse_address_hex(&operator)?, power.0))
            })
            .collect()
    }

    fn get_last_validator_power(&self, operator: &Address) -> Result<Option<u64>> {
        get::<_, storage::Power>(self, &keys::last_power(operator))
            .map(|power| power.map(|power| power.0))
            .wrap_err("failed reading last validator power from state")
    }

    fn get_last_total_power(&self) -> Result<u64> {
        get::<_, storage::Power>(self, keys::LAST_TOTAL_POWER)
            .map(|power| power.map_or(0, |power| power.0))
            .wrap_err("failed reading last total power from state")
    }

    fn get_delegation(&self, delegator: &Address, validator: &Address) -> Result<u128> {
        get::<_, storage::Shares>(self, &keys::delegation(delegator, validator))
            .map(|shares| shares.map_or(0, |shares| shares.0))
            .wrap_err("failed reading delegation from state")
    }

    /// Every delegation of `delegator` as `(validator, shares)`.
    fn get_delegations_of(&self, delegator: &Address) -> Result<Vec<(Address, u128)>> {
        prefix_values::<_, storage::Shares>(self, &keys::delegations_of(delegator), usize::MAX)
            .wrap_err("failed reading delegations from state")?
            .into_iter()
            .map(|(validator, shares)| -> Result<(Address, u128)> {
                Ok((parse_address_hex(&validator)?, shares.0))
            })
            .collect()
    }

    fn get_unbonding_delegation(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Result<Option<UnbondingDelegation>> {
        get(self, &keys::unbonding_delegation(delegator, validator))
            .wrap_err("failed reading unbonding delegation from state")
    }

    fn get_block_validator_updates(&self) -> Result<Vec<ValidatorUpdate>> {
        get::<_, storage::Updates>(self, keys::BLOCK_VALIDATOR_UPDATES)
            .map(|updates| updates.map(|updates| updates.0).unwrap_or_default())
            .wrap_err("failed reading block validator updates from state")
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

pub(crate) trait StateWriteExt: StateWrite {
    fn put_staking_params(&mut self, params: StakingParams) -> Result<()> {
        put(self, keys::PARAMS.to_string(), params)
    }

    /// Writes `validator` and keeps the power and consensus indices in step.
    #[instrument(skip_all, fields(operator = %validator.operator), err)]
    fn put_validator(&mut self, validator: &Validator) -> Result<()> {
        if let Some(previous) = self.get_validator(&validator.operator)? {
            if previous.is_eligible() {
                delete(
                    self,
                    keys::power_index(previous.consensus_power(), &previous.operator),
                );
            }
        }
        if validator.is_eligible() {
            put(
                self,
                keys::power_index(validator.consensus_power(), &validator.operator),
                (),
            )?;
        }
        put(
            self,
            keys::consensus_index(&validator.consensus_address()),
            storage::Operator(validator.operator),
        )?;
        put(self, keys::validator(&validator.operator), validator.clone())
    }

    /// Deletes `validator` from the primary store and every index.
    fn remove_validator(&mut self, validator: &Validator) {
        delete(
            self,
            keys::power_index(validator.consensus_power(), &validator.operator),
        );
        delete(self, keys::consensus_index(&validator.consensus_address()));
        delete(self, keys::last_power(&validator.operator));
        delete(self, keys::validator(&validator.operator));
    }

    fn put_last_validator_power(&mut self, operator: &Address, power: u64) -> Result<()> {
        put(self, keys::last_power(operator), storage::Power(power))
    }

    fn delete_last_validator_power(&mut self, operator: &Address) {
        delete(self, keys::last_power(operator));
    }

    fn put_last_total_power(&mut self, power: u64) -> Result<()> {
        put(self, keys::LAST_TOTAL_POWER.to_string(), storage::Power(power))
    }

    fn put_delegation(&mut self, delegator: &Address, validator: &Address, shares: u128) -> Result<()> {
        let key = keys::delegation(delegator, validator);
        if shares == 0 {
            delete(self, key);
            return Ok(());
        }
        put(self, key, storage::Shares(shares))
    }

    fn put_unbonding_delegation(&mut self, unbonding: UnbondingDelegation) -> Result<()> {
        let key = keys::unbonding_delegation(&unbonding.delegator, &unbonding.validator);
        if unbonding.entries.is_empty() {
            delete(self, key);
            return Ok(());
        }
        put(self, key, unbonding)
    }

    fn insert_unbonding_validator_queue(&mut self, validator: &Validator) -> Result<()> {
        put(
            self,
            keys::unbonding_queue(validator.unbonding_completion_time, &validator.operator),
            (),
        )
    }

    fn delete_unbonding_validator_queue(&mut self, validator: &Validator) {
        delete(
            self,
            keys::unbonding_queue(validator.unbonding_completion_time, &validator.operator),
        );
    }

    fn insert_unbonding_delegation_queue(
        &mut self,
        completion_time: u64,
        delegator: &Address,
        validator: &Address,
    ) -> Result<()> {
        put(
            self,
            keys::unbonding_delegation_queue(completion_time, delegator, validator),
            (),
        )
    }

    fn delete_unbonding_delegation_queue(
        &mut self,
        completion_time: u64,
        delegator: &Address,
        validator: &Address,
    ) {
        delete(
            self,
            keys::unbonding_delegation_queue(completion_time, delegator, validator),
        );
    }

    fn put_block_validator_updates(&mut self, updates: Vec<ValidatorUpdate>) -> Result<()> {
        put(
            self,
            keys::BLOCK_VALIDATOR_UPDATES.to_string(),
            storage::Updates(updates),
        )
    }

    fn clear_block_validator_updates(&mut self) {
        delete(self, keys::BLOCK_VALIDATOR_UPDATES.to_string());
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}

#[cfg(test)]
mod tests {
    use occ_storage::{
        StateDelta,
        Storage,
    };

    use super::*;
    use crate::{
        staking::POWER_REDUCTION,
        test_utils::{
            address,
            validator,
        },
    };

    #[test]
    fn power_index_follows_validator_writes() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        let mut first = validator(1, 5 * POWER_REDUCTION);
        let second = validator(2, 7 * POWER_REDUCTION);
        state.put_validator(&first).unwrap();
        state.put_validator(&second).unwrap();
        assert_eq!(vec![address(2), address(1)], state.get_power_index(10).unwrap());

        first.tokens = 9 * POWER_REDUCTION;
        state.put_validator(&first).unwrap();
        assert_eq!(vec![address(1), address(2)], state.get_power_index(10).unwrap());
        assert_eq!(vec![address(1)], state.get_power_index(1).unwrap());

        first.jailed = true;
        state.put_validator(&first).unwrap();
        assert_eq!(vec![address(2)], state.get_power_index(10).unwrap());
    }

    #[test]
    fn consensus_index_resolves_operator_until_removal() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        let validator = validator(3, POWER_REDUCTION);
        state.put_validator(&validator).unwrap();
        let consensus = validator.consensus_address();
        assert_eq!(
            Some(address(3)),
            state.get_validator_by_consensus_address(&consensus).unwrap()
        );

        state.remove_validator(&validator);
        assert_eq!(None, state.get_validator_by_consensus_address(&consensus).unwrap());
        assert!(state.get_power_index(10).unwrap().is_empty());
        assert!(state.get_validator(&address(3)).unwrap().is_none());
    }

    #[test]
    fn delegations_are_listed_per_delegator() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.put_delegation(&address(1), &address(5), 10).unwrap();
        state.put_delegation(&address(1), &address(4), 20).unwrap();
        state.put_delegation(&address(2), &address(4), 30).unwrap();
        assert_eq!(
            vec![(address(4), 20), (address(5), 10)],
            state.get_delegations_of(&address(1)).unwrap()
        );
        state.put_delegation(&address(1), &address(4), 0).unwrap();
        assert_eq!(vec![(address(5), 10)], state.get_delegations_of(&address(1)).unwrap());
    }

    #[test]
    fn last_powers_round_trip_through_state() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.put_last_validator_power(&address(1), 4).unwrap();
        state.put_last_validator_power(&address(2), 6).unwrap();
        state.delete_last_validator_power(&address(1));
        assert_eq!(
            BTreeMap::from([(address(2), 6)]),
            state.get_last_validator_powers().unwrap()
        );
    }
}

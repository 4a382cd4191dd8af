use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    ensure,
    Result,
    WrapErr as _,
};
use occ_storage::StateWrite;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

use super::{
    keeper,
    BondStatus,
    StateReadExt as _,
    StateWriteExt as _,
    Validator,
};
use crate::{
    address::consensus_address,
    app::ActionHandler,
    slashing::SlashingHooks,
    transaction::{
        parse_address,
        MessageError,
        TxContext,
    },
};

const MAX_COMMISSION_RATE_BPS: u16 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgCreateValidator {
    pub operator: String,
    #[serde(with = "hex::serde")]
    pub consensus_key: [u8; 32],
    pub commission_rate_bps: u16,
    pub min_self_delegation: u128,
    pub self_delegation: u128,
}

impl ActionHandler for MsgCreateValidator {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("operator", &self.operator)?;
        if tendermint::PublicKey::from_raw_ed25519(&self.consensus_key).is_none() {
            return Err(MessageError::invalid(
                "consensus_key",
                "not a valid ed25519 public key",
            ));
        }
        if self.commission_rate_bps > MAX_COMMISSION_RATE_BPS {
            return Err(MessageError::invalid(
                "commission_rate_bps",
                format!("must not exceed {MAX_COMMISSION_RATE_BPS}"),
            ));
        }
        if self.self_delegation == 0 {
            return Err(MessageError::zero_amount("self_delegation"));
        }
        if self.self_delegation < self.min_self_delegation {
            return Err(MessageError::invalid(
                "self_delegation",
                "must not be below min_self_delegation",
            ));
        }
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, _context: &TxContext) -> Result<()> {
        let operator = parse_address("operator", &self.operator)?;
        ensure!(
            state.get_validator(&operator)?.is_none(),
            "validator {operator} already exists"
        );
        let consensus = consensus_address(&self.consensus_key);
        ensure!(
            state
                .get_validator_by_consensus_address(&consensus)?
                .is_none(),
            "consensus key is already used by another validator"
        );
        state.put_validator(&Validator {
            operator,
            consensus_key: self.consensus_key,
            tokens: 0,
            delegator_shares: 0,
            jailed: false,
            status: BondStatus::Unbonded,
            commission_rate_bps: self.commission_rate_bps,
            min_self_delegation: self.min_self_delegation,
            unbonding_height: 0,
            unbonding_completion_time: 0,
        })?;
        keeper::delegate(&mut state, &operator, &operator, self.self_delegation)
            .wrap_err("failed self delegating")?;
        info!(%operator, "created validator");
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgDelegate {
    pub delegator: String,
    pub validator: String,
    pub amount: u128,
}

impl ActionHandler for MsgDelegate {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("delegator", &self.delegator)?;
        parse_address("validator", &self.validator)?;
        if self.amount == 0 {
            return Err(MessageError::zero_amount("amount"));
        }
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, _context: &TxContext) -> Result<()> {
        let delegator = parse_address("delegator", &self.delegator)?;
        let validator = parse_address("validator", &self.validator)?;
        keeper::delegate(&mut state, &delegator, &validator, self.amount)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgUndelegate {
    pub delegator: String,
    pub validator: String,
    pub amount: u128,
}

impl ActionHandler for MsgUndelegate {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("delegator", &self.delegator)?;
        parse_address("validator", &self.validator)?;
        if self.amount == 0 {
            return Err(MessageError::zero_amount("amount"));
        }
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, context: &TxContext) -> Result<()> {
        let delegator = parse_address("delegator", &self.delegator)?;
        let validator = parse_address("validator", &self.validator)?;
        keeper::undelegate(
            &mut state,
            &SlashingHooks,
            &delegator,
            &validator,
            self.amount,
            context.height,
            context.time,
        )?;
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
    use crate::{
        accounts::{
            ModuleAccount,
            StateReadExt as _,
            StateWriteExt as _,
            BOND_DENOM,
        },
        staking::{
            StakingParams,
            POWER_REDUCTION,
        },
        test_utils::{
            address,
            assert_error_contains,
            consensus_key,
            tx_context,
        },
    };

    fn create(n: u8, self_delegation: u128) -> MsgCreateValidator {
        MsgCreateValidator {
            operator: address(n).to_string(),
            consensus_key: consensus_key(n),
            commission_rate_bps: 500,
            min_self_delegation: 1,
            self_delegation,
        }
    }

    fn state_with_funds(storage: &Storage) -> StateDelta<occ_storage::Snapshot> {
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.put_staking_params(StakingParams::default()).unwrap();
        for n in 1..=3 {
            state
                .mint(&address(n), BOND_DENOM, 100 * POWER_REDUCTION)
                .unwrap();
        }
        state
    }

    #[test]
    fn create_validator_self_delegates_into_not_bonded_pool() {
        let storage = Storage::new();
        let mut state = state_with_funds(&storage);
        create(1, 10 * POWER_REDUCTION)
            .check_and_execute(&mut state, &tx_context())
            .unwrap();

        let validator = state.get_validator(&address(1)).unwrap().unwrap();
        assert_eq!(BondStatus::Unbonded, validator.status);
        assert_eq!(10 * POWER_REDUCTION, validator.tokens);
        assert_eq!(
            10 * POWER_REDUCTION,
            state
                .get_account_balance(&ModuleAccount::NotBondedPool.address(), BOND_DENOM)
                .unwrap()
        );
        assert_eq!(vec![address(1)], state.get_power_index(10).unwrap());
    }

    #[test]
    fn reused_consensus_key_is_rejected() {
        let storage = Storage::new();
        let mut state = state_with_funds(&storage);
        create(1, POWER_REDUCTION)
            .check_and_execute(&mut state, &tx_context())
            .unwrap();
        let mut second = create(2, POWER_REDUCTION);
        second.consensus_key = consensus_key(1);
        let error = second
            .check_and_execute(&mut state, &tx_context())
            .unwrap_err();
        assert_error_contains(&error, "already used");
    }

    #[test]
    fn self_delegation_below_minimum_is_rejected_statelessly() {
        let mut msg = create(1, 5);
        msg.min_self_delegation = 6;
        assert!(msg.check_stateless().is_err());
    }

    #[test]
    fn delegate_then_undelegate_creates_unbonding_entry() {
        let storage = Storage::new();
        let mut state = state_with_funds(&storage);
        create(1, POWER_REDUCTION)
            .check_and_execute(&mut state, &tx_context())
            .unwrap();
        let delegate = MsgDelegate {
            delegator: address(2).to_string(),
            validator: address(1).to_string(),
            amount: 4 * POWER_REDUCTION,
        };
        delegate.check_and_execute(&mut state, &tx_context()).unwrap();
        assert_eq!(
            4 * POWER_REDUCTION,
            state.get_delegation(&address(2), &address(1)).unwrap()
        );

        let undelegate = MsgUndelegate {
            delegator: address(2).to_string(),
            validator: address(1).to_string(),
            amount: POWER_REDUCTION,
        };
        undelegate
            .check_and_execute(&mut state, &tx_context())
            .unwrap();
        let unbonding = state
            .get_unbonding_delegation(&address(2), &address(1))
            .unwrap()
            .unwrap();
        assert_eq!(POWER_REDUCTION, unbonding.entries[0].balance);
        assert_eq!(
            4 * POWER_REDUCTION,
            state.get_validator(&address(1)).unwrap().unwrap().tokens
        );
    }

    #[test]
    fn undelegating_more_than_delegated_fails() {
        let storage = Storage::new();
        let mut state = state_with_funds(&storage);
        create(1, POWER_REDUCTION)
            .check_and_execute(&mut state, &tx_context())
            .unwrap();
        let undelegate = MsgUndelegate {
            delegator: address(2).to_string(),
            validator: address(1).to_string(),
            amount: 1,
        };
        let error = undelegate
            .check_and_execute(&mut state, &tx_context())
            .unwrap_err();
        assert_error_contains(&error, "exceeds the delegation");
    }
}

//! Validators, delegations and the validator set handed to consensus.

pub(crate) mod action;
pub(crate) mod component;
mod hooks;
mod keeper;
mod state_ext;
pub(crate) mod storage;

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    eyre,
    OptionExt as _,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

pub use self::action::{
    MsgCreateValidator,
    MsgDelegate,
    MsgUndelegate,
};
pub(crate) use self::{
    hooks::StakingHooks,
    keeper::{
        apply_and_return_validator_set_updates,
        complete_mature_unbonding_delegations,
        delegate,
        jail,
        slash,
        unbond_all_mature_validators,
        undelegate,
        unjail,
    },
    state_ext::{
        StateReadExt,
        StateWriteExt,
    },
};
use crate::{
    accounts::ModuleAccount,
    address::{
        consensus_address,
        Address,
    },
};

/// Tokens per unit of consensus power.
pub const POWER_REDUCTION: u128 = 1_000_000;

/// Blocks between a validator update being returned to consensus and taking effect.
pub const VALIDATOR_UPDATE_DELAY: u64 = 1;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BondStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Validator {
    pub operator: Address,
    pub consensus_key: [u8; 32],
    pub tokens: u128,
    pub delegator_shares: u128,
    pub jailed: bool,
    pub status: BondStatus,
    pub commission_rate_bps: u16,
    pub min_self_delegation: u128,
    pub unbonding_height: u64,
    /// Unix seconds.
    pub unbonding_completion_time: u64,
}

impl Validator {
    #[must_use]
    pub fn consensus_power(&self) -> u64 {
        u64::try_from(self.tokens / POWER_REDUCTION).unwrap_or(u64::MAX)
    }

    #[must_use]
    pub fn consensus_address(&self) -> tendermint::account::Id {
        consensus_address(&self.consensus_key)
    }

    /// Whether the validator belongs in the power index.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        !self.jailed && self.consensus_power() > 0
    }

    /// The module account holding the validator's tokens.
    #[must_use]
    pub fn pool(&self) -> ModuleAccount {
        match self.status {
            BondStatus::Bonded => ModuleAccount::BondedPool,
            BondStatus::Unbonding | BondStatus::Unbonded => ModuleAccount::NotBondedPool,
        }
    }

    pub(crate) fn shares_from_tokens(&self, amount: u128) -> Result<u128> {
        if self.delegator_shares == 0 {
            return Ok(amount);
        }
        eyre::ensure!(
            self.tokens > 0,
            "validator {} has shares but no tokens",
            self.operator
        );
        amount
            .checked_mul(self.delegator_shares)
            .map(|product| product / self.tokens)
            .ok_or_eyre("share calculation overflows")
    }

    pub(crate) fn tokens_from_shares(&self, shares: u128) -> Result<u128> {
        if self.delegator_shares == 0 {
            return Ok(0);
        }
        shares
            .checked_mul(self.tokens)
            .map(|product| product / self.delegator_shares)
            .ok_or_eyre("token calculation overflows")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UnbondingEntry {
    pub creation_height: u64,
    pub completion_time: u64,
    pub balance: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UnbondingDelegation {
    pub delegator: Address,
    pub validator: Address,
    pub entries: Vec<UnbondingEntry>,
}

#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct StakingParams {
    pub unbonding_time_secs: u64,
    pub max_validators: u32,
}

impl StakingParams {
    pub(crate) fn validate(&self) -> Result<()> {
        eyre::ensure!(self.max_validators > 0, "max_validators must be positive");
        Ok(())
    }
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            unbonding_time_secs: 21 * 24 * 60 * 60,
            max_validators: 100,
        }
    }
}

/// A change of a validator's consensus power. Zero power removes the validator.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ValidatorUpdate {
    pub consensus_key: [u8; 32],
    pub power: u64,
}

impl ValidatorUpdate {
    /// Converts into the update consensus understands.
    ///
    /// # Errors
    /// Fails if the key is not a valid ed25519 key or the power exceeds the range
    /// consensus accepts.
    pub fn to_tendermint(&self) -> Result<tendermint::validator::Update> {
        let pub_key = tendermint::PublicKey::from_raw_ed25519(&self.consensus_key)
            .ok_or_eyre("consensus key is not a valid ed25519 key")?;
        let power = tendermint::vote::Power::try_from(self.power)
            .map_err(|e| eyre!("validator power {} is out of range: {e}", self.power))?;
        Ok(tendermint::validator::Update {
            pub_key,
            power,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisValidator {
    pub operator: Address,
    #[serde(with = "hex::serde")]
    pub consensus_key: [u8; 32],
    pub self_delegation: u128,
    pub commission_rate_bps: u16,
    pub min_self_delegation: u128,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisStaking {
    pub params: StakingParams,
    pub validators: Vec<GenesisValidator>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        address,
        consensus_key,
    };

    fn validator(tokens: u128, shares: u128) -> Validator {
        Validator {
            operator: address(1),
            consensus_key: consensus_key(1),
            tokens,
            delegator_shares: shares,
            jailed: false,
            status: BondStatus::Bonded,
            commission_rate_bps: 0,
            min_self_delegation: 0,
            unbonding_height: 0,
            unbonding_completion_time: 0,
        }
    }

    #[test]
    fn power_is_tokens_over_power_reduction() {
        assert_eq!(0, validator(999_999, 999_999).consensus_power());
        assert_eq!(3, validator(3_500_000, 3_500_000).consensus_power());
    }

    #[test]
    fn shares_follow_the_exchange_rate() {
        let slashed = validator(50, 100);
        assert_eq!(20, slashed.shares_from_tokens(10).unwrap());
        assert_eq!(5, slashed.tokens_from_shares(10).unwrap());
        assert_eq!(7, validator(0, 0).shares_from_tokens(7).unwrap());
    }

    #[test]
    fn fully_slashed_validator_cannot_issue_shares() {
        assert!(validator(0, 100).shares_from_tokens(1).is_err());
    }

    #[test]
    fn jailed_or_powerless_validators_are_not_eligible() {
        let mut jailed = validator(POWER_REDUCTION, POWER_REDUCTION);
        assert!(jailed.is_eligible());
        jailed.jailed = true;
        assert!(!jailed.is_eligible());
        assert!(!validator(1, 1).is_eligible());
    }

    #[test]
    fn update_converts_to_tendermint() {
        let update = ValidatorUpdate {
            consensus_key: consensus_key(1),
            power: 10,
        }
        .to_tendermint()
        .unwrap();
        assert_eq!(10, update.power.value());
    }
}

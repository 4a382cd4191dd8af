use crate::{
    address::Address,
    storage::keys::{
        AccountPrefixer,
        AddressHex,
        ConsensusHex,
        Sortable,
    },
};

pub(in crate::staking) const PARAMS: &str = "staking/params";
pub(in crate::staking) const VALIDATOR_PREFIX: &str = "staking/validator/";
pub(in crate::staking) const POWER_INDEX_PREFIX: &str = "staking/power/";
pub(in crate::staking) const LAST_POWER_PREFIX: &str = "staking/last_power/";
pub(in crate::staking) const LAST_TOTAL_POWER: &str = "staking/last_total_power";
pub(in crate::staking) const UNBONDING_QUEUE_PREFIX: &str = "staking/unbonding_queue/";
pub(in crate::staking) const DELEGATION_PREFIX: &str = "staking/delegation/";
pub(in crate::staking) const UNBONDING_DELEGATION_QUEUE_PREFIX: &str =
    "staking/unbonding_delegation_queue/";
pub(in crate::staking) const BLOCK_VALIDATOR_UPDATES: &str = "staking/block_validator_updates";
const CONSENSUS_PREFIX: &str = "staking/consensus/";
const UNBONDING_DELEGATION_PREFIX: &str = "staking/unbonding_delegation/";

pub(in crate::staking) fn validator(operator: &Address) -> String {
    AccountPrefixer::new(VALIDATOR_PREFIX, operator).to_string()
}

/// Ordered by power descending, then operator ascending.
///
/// Example: `staking/power/fffffffffffffff5/0101....0101`.
///                         |u64::MAX - 10 |
pub(in crate::staking) fn power_index(power: u64, operator: &Address) -> String {
    format!(
        "{POWER_INDEX_PREFIX}{}/{}",
        Sortable(u64::MAX - power),
        AddressHex(operator)
    )
}

pub(in crate::staking) fn consensus_index(address: &tendermint::account::Id) -> String {
    format!("{CONSENSUS_PREFIX}{}", ConsensusHex(address))
}

pub(in crate::staking) fn last_power(operator: &Address) -> String {
    AccountPrefixer::new(LAST_POWER_PREFIX, operator).to_string()
}

pub(in crate::staking) fn unbonding_queue(completion_time: u64, operator: &Address) -> String {
    format!(
        "{UNBONDING_QUEUE_PREFIX}{}/{}",
        Sortable(completion_time),
        AddressHex(operator)
    )
}

pub(in crate::staking) fn delegation(delegator: &Address, validator: &Address) -> String {
    format!(
        "{}/{}",
        AccountPrefixer::new(DELEGATION_PREFIX, delegator),
        AddressHex(validator)
    )
}

pub(in crate::staking) fn delegations_of(delegator: &Address) -> String {
    format!("{}/", AccountPrefixer::new(DELEGATION_PREFIX, delegator))
}

pub(in crate::staking) fn unbonding_delegation(delegator: &Address, validator: &Address) -> String {
    format!(
        "{}/{}",
        AccountPrefixer::new(UNBONDING_DELEGATION_PREFIX, delegator),
        AddressHex(validator)
    )
}

pub(in crate::staking) fn unbonding_delegation_queue(
    completion_time: u64,
    delegator: &Address,
    validator: &Address,
) -> String {
    format!(
        "{UNBONDING_DELEGATION_QUEUE_PREFIX}{}/{}/{}",
        Sortable(completion_time),
        AddressHex(delegator),
        AddressHex(validator)
    )
}

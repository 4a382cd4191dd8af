use borsh::{
    BorshDeserialize,
    BorshSerialize,
};

use crate::{
    address::Address,
    staking::{
        StakingParams,
        UnbondingDelegation,
        Validator,
        ValidatorUpdate,
    },
    storage::impl_stored_value,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Params(StakingParams),
    Validator(Validator),
    Operator(Operator),
    Shares(Shares),
    Power(Power),
    UnbondingDelegation(UnbondingDelegation),
    Updates(Updates),
}

/// The operator address a consensus address maps to.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::staking) struct Operator(pub(in crate::staking) Address);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::staking) struct Shares(pub(in crate::staking) u128);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::staking) struct Power(pub(in crate::staking) u64);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::staking) struct Updates(pub(in crate::staking) Vec<ValidatorUpdate>);

impl_stored_value!(Staking, Value, ValueImpl {
    Params(StakingParams) => "params",
    Validator(Validator) => "validator",
    Operator(Operator) => "operator",
    Shares(Shares) => "shares",
    Power(Power) => "power",
    UnbondingDelegation(UnbondingDelegation) => "unbonding delegation",
    Updates(Updates) => "validator updates",
});

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};

use crate::{
    distribution::DistributionParams,
    storage::impl_stored_value,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Params(DistributionParams),
    Amount(Amount),
    Proposer(Proposer),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::distribution) struct Amount(pub(in crate::distribution) u128);

/// The consensus address of a block proposer.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::distribution) struct Proposer(pub(in crate::distribution) [u8; 20]);

impl_stored_value!(Distribution, Value, ValueImpl {
    Params(DistributionParams) => "params",
    Amount(Amount) => "amount",
    Proposer(Proposer) => "proposer",
});

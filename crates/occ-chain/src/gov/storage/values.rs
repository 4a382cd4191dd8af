use borsh::{
    BorshDeserialize,
    BorshSerialize,
};

use crate::{
    gov::{
        AccessOperation,
        GovParams,
        Proposal,
        SweepCursor,
        WeightedVoteOption,
    },
    storage::impl_stored_value,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Params(GovParams),
    ProposalId(ProposalId),
    Proposal(Proposal),
    Deposit(Deposit),
    Vote(Vote),
    SweepCursor(SweepCursor),
    DependencyMapping(DependencyMapping),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::gov) struct ProposalId(pub(in crate::gov) u64);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::gov) struct Deposit(pub(in crate::gov) u128);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::gov) struct Vote(pub(in crate::gov) Vec<WeightedVoteOption>);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::gov) struct DependencyMapping(pub(in crate::gov) Vec<AccessOperation>);

impl_stored_value!(Gov, Value, ValueImpl {
    Params(GovParams) => "params",
    ProposalId(ProposalId) => "proposal id",
    Proposal(Proposal) => "proposal",
    Deposit(Deposit) => "deposit",
    Vote(Vote) => "vote",
    SweepCursor(SweepCursor) => "sweep cursor",
    DependencyMapping(DependencyMapping) => "dependency mapping",
});

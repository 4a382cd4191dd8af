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
    AccessOperation,
    GovParams,
    Proposal,
    SweepCursor,
    WeightedVoteOption,
};
use crate::{
    address::Address,
    storage::{
        delete,
        due_queue_keys,
        get,
        keys::{
            parse_address_hex,
            Sortable,
        },
        prefix_values,
        put,
    },
};

pub(crate) trait StateReadExt: StateRead {
    #[instrument(skip_all, err)]
    fn get_gov_params(&self) -> Result<GovParams> {
        get::<_, GovParams>(self, keys::PARAMS)
            .wrap_err("failed reading gov params from state")?
            .ok_or_eyre("gov params not found in state")
    }

    /// The id the next submitted proposal receives. Ids start at 1.
    fn get_next_proposal_id(&self) -> Result<u64> {
        get::<_, storage::ProposalId>(self, keys::NEXT_PROPOSAL_ID)
            .map(|id| id.map_or(1, |id| id.0))
            .wrap_err("failed reading next proposal id from state")
    }

    #[instrument(skip_all, fields(id), err)]
    fn get_proposal(&self, id: u64) -> Result<Option<Proposal>> {
        get(self, &keys::proposal(id)).wrap_err("failed reading proposal from state")
    }

    fn get_deposit(&self, id: u64, depositor: &Address) -> Result<u128> {
        get::<_, storage::Deposit>(self, &keys::deposit(id, depositor))
            .map(|deposit| deposit.map_or(0, |deposit| deposit.0))
            .wrap_err("failed reading deposit from state")
    }

    /// Up to `limit` deposits of proposal `id`, ordered by depositor.
    fn get_deposits(&self, id: u64, limit: usize) -> Result<Vec<(Address, u128)>> {
        prefix_values::<_, storage::Deposit>(self, &keys::deposits_prefix(id), limit)
            .wrap_err("failed reading deposits from state")?
            .into_iter()
            .map(|(depositor, deposit)| Ok((parse_address_hex(&depositor)?, deposit.0)))
            .collect()
    }

    fn get_vote(&self, id: u64, voter: &Address) -> Result<Option<Vec<WeightedVoteOption>>> {
        get::<_, storage::Vote>(self, &keys::vote(id, voter))
            .map(|vote| vote.map(|vote| vote.0))
            .wrap_err("failed reading vote from state")
    }

    /// Up to `limit` votes on proposal `id`, ordered by voter.
    fn get_votes(&self, id: u64, limit: usize) -> Result<Vec<(Address, Vec<WeightedVoteOption>)>> {
        prefix_values::<_, storage::Vote>(self, &keys::votes_prefix(id), limit)
            .wrap_err("failed reading votes from state")?
            .into_iter()
            .map(|(voter, vote)| Ok((parse_address_hex(&voter)?, vote.0)))
            .collect()
    }

    fn get_sweep_cursor(&self) -> Result<Option<SweepCursor>> {
        get(self, keys::SWEEP_CURSOR).wrap_err("failed reading gov sweep cursor from state")
    }

    fn get_dependency_mapping(&self, message_key: &str) -> Result<Option<Vec<AccessOperation>>> {
        get::<_, storage::DependencyMapping>(self, &keys::dependency_mapping(message_key))
            .map(|mapping| mapping.map(|mapping| mapping.0))
            .wrap_err("failed reading dependency mapping from state")
    }

    /// Proposals whose deposit period ended at or before `time`, as `(end time, id)`.
    fn get_expired_deposit_periods(&self, time: u64, limit: usize) -> Result<Vec<(u64, u64)>> {
        expired(self, keys::INACTIVE_QUEUE_PREFIX, time, limit)
            .wrap_err("failed reading inactive proposal queue")
    }

    /// Proposals whose voting period ended at or before `time`, as `(end time, id)`.
    fn get_expired_voting_periods(&self, time: u64, limit: usize) -> Result<Vec<(u64, u64)>> {
        expired(self, keys::ACTIVE_QUEUE_PREFIX, time, limit)
            .wrap_err("failed reading active proposal queue")
    }
}

fn expired<S: StateRead + ?Sized>(
    state: &S,
    prefix: &str,
    time: u64,
    limit: usize,
) -> Result<Vec<(u64, u64)>> {
    due_queue_keys(state, prefix, time, limit)?
        .into_iter()
        .map(|(end, id)| Ok((end, Sortable::parse(&id)?)))
        .collect()
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

pub(crate) trait StateWriteExt: StateWrite {
    fn put_gov_params(&mut self, params: GovParams) -> Result<()> {
        put(self, keys::PARAMS.to_string(), params)
    }

    fn put_next_proposal_id(&mut self, id: u64) -> Result<()> {
        put(self, keys::NEXT_PROPOSAL_ID.to_string(), storage::ProposalId(id))
    }

    fn put_proposal(&mut self, proposal: Proposal) -> Result<()> {
        put(self, keys::proposal(proposal.id), proposal)
    }

    fn put_deposit(&mut self, id: u64, depositor: &Address, amount: u128) -> Result<()> {
        put(self, keys::deposit(id, depositor), storage::Deposit(amount))
    }

    fn delete_deposit(&mut self, id: u64, depositor: &Address) {
        delete(self, keys::deposit(id, depositor));
    }

    fn put_vote(&mut self, id: u64, voter: &Address, options: Vec<WeightedVoteOption>) -> Result<()> {
        put(self, keys::vote(id, voter), storage::Vote(options))
    }

    fn delete_vote(&mut self, id: u64, voter: &Address) {
        delete(self, keys::vote(id, voter));
    }

    fn put_sweep_cursor(&mut self, cursor: SweepCursor) -> Result<()> {
        put(self, keys::SWEEP_CURSOR.to_string(), cursor)
    }

    fn clear_sweep_cursor(&mut self) {
        delete(self, keys::SWEEP_CURSOR.to_string());
    }

    fn put_dependency_mapping(
        &mut self,
        message_key: &str,
        access_ops: Vec<AccessOperation>,
    ) -> Result<()> {
        put(
            self,
            keys::dependency_mapping(message_key),
            storage::DependencyMapping(access_ops),
        )
    }

    fn insert_inactive_proposal_queue(&mut self, deposit_end_time: u64, id: u64) -> Result<()> {
        put(self, keys::inactive_queue(deposit_end_time, id), ())
    }

    fn delete_inactive_proposal_queue(&mut self, deposit_end_time: u64, id: u64) {
        delete(self, keys::inactive_queue(deposit_end_time, id));
    }

    fn insert_active_proposal_queue(&mut self, voting_end_time: u64, id: u64) -> Result<()> {
        put(self, keys::active_queue(voting_end_time, id), ())
    }

    fn delete_active_proposal_queue(&mut self, voting_end_time: u64, id: u64) {
        delete(self, keys::active_queue(voting_end_time, id));
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}

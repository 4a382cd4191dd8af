//! Settles proposals whose deposit or voting period has ended.
//!
//! Expired proposals can carry any number of votes and deposits, so the work of one
//! block is capped by [`SweepLimits`]. A proposal that cannot be finished within the
//! remaining budget is parked in a [`SweepCursor`] and resumed in the next block
//! before any other proposal is picked up. Processed votes and deposits are deleted,
//! which is what lets the cursor resume without remembering a position.

use eyre::{
    OptionExt as _,
    Result,
};
use occ_storage::StateWrite;
use tracing::{
    debug,
    info,
    warn,
};

use super::{
    GovParams,
    ProposalContent,
    ProposalStatus,
    StateReadExt as _,
    StateWriteExt as _,
    SweepCursor,
    SweepLimits,
    SweepPhase,
    TallyResult,
};
use crate::{
    accounts::{
        ModuleAccount,
        StateReadExt as _,
        StateWriteExt as _,
        BOND_DENOM,
    },
    address::Address,
    staking::{
        BondStatus,
        StateReadExt as _,
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SweepStats {
    pub(crate) proposals_started: u32,
    pub(crate) entries_processed: u32,
    pub(crate) finished: u32,
    pub(crate) deferred: bool,
}

pub(super) fn sweep<S: StateWrite>(
    state: &mut S,
    time: u64,
    limits: SweepLimits,
) -> Result<SweepStats> {
    let mut stats = SweepStats::default();
    let mut entries_left = limits.max_entries;
    let mut pending = state.get_sweep_cursor()?;
    let parked = loop {
        let cursor = match pending.take() {
            Some(cursor) => cursor,
            None => {
                if stats.proposals_started >= limits.max_proposals {
                    break None;
                }
                let Some(cursor) = next_expired(state, time)? else {
                    break None;
                };
                stats.proposals_started = stats.proposals_started.saturating_add(1);
                cursor
            }
        };
        let before = entries_left;
        let unfinished = process(state, cursor, &mut entries_left)?;
        stats.entries_processed = stats
            .entries_processed
            .saturating_add(before.saturating_sub(entries_left));
        match unfinished {
            Some(cursor) => break Some(cursor),
            None => stats.finished = stats.finished.saturating_add(1),
        }
    };
    if let Some(cursor) = parked {
        debug!(proposal_id = cursor.proposal_id, "deferring rest of proposal to next block");
        stats.deferred = true;
        state.put_sweep_cursor(cursor)?;
    } else {
        state.clear_sweep_cursor();
    }
    Ok(stats)
}

/// Takes the next expired proposal off its queue.
///
/// Ended deposit periods are settled before ended voting periods.
fn next_expired<S: StateWrite>(state: &mut S, time: u64) -> Result<Option<SweepCursor>> {
    while let Some((end, id)) = state.get_expired_deposit_periods(time, 1)?.pop() {
        state.delete_inactive_proposal_queue(end, id);
        let Some(mut proposal) = state.get_proposal(id)? else {
            warn!(id, "inactive queue references a missing proposal; dropping entry");
            continue;
        };
        proposal.status = ProposalStatus::Failed;
        state.put_proposal(proposal)?;
        info!(id, "deposit period ended below the minimum deposit; burning deposits");
        return Ok(Some(SweepCursor {
            proposal_id: id,
            phase: SweepPhase::SettleDeposits {
                burn: true,
            },
        }));
    }
    while let Some((end, id)) = state.get_expired_voting_periods(time, 1)?.pop() {
        state.delete_active_proposal_queue(end, id);
        if state.get_proposal(id)?.is_none() {
            warn!(id, "active queue references a missing proposal; dropping entry");
            continue;
        }
        return Ok(Some(SweepCursor {
            proposal_id: id,
            phase: SweepPhase::Tally(TallyResult::default()),
        }));
    }
    Ok(None)
}

/// Advances `cursor` within the entry budget. Returns the cursor if entries remain.
fn process<S: StateWrite>(
    state: &mut S,
    cursor: SweepCursor,
    entries_left: &mut u32,
) -> Result<Option<SweepCursor>> {
    let SweepCursor {
        proposal_id,
        mut phase,
    } = cursor;
    loop {
        match phase {
            SweepPhase::Tally(mut tally) => {
                for (voter, options) in state.get_votes(proposal_id, budget(*entries_left))? {
                    if *entries_left == 0 {
                        break;
                    }
                    let (power, delegations) = voting_power(state, &voter)?;
                    tally.add(&options, power)?;
                    state.delete_vote(proposal_id, &voter);
                    // The vote itself plus every delegation read to weigh it. The last
                    // vote of a block may overdraw the budget by its own delegations.
                    let cost = u32::try_from(delegations)
                        .unwrap_or(u32::MAX)
                        .saturating_add(1);
                    *entries_left = entries_left.saturating_sub(cost);
                }
                if !state.get_votes(proposal_id, 1)?.is_empty() {
                    return Ok(Some(SweepCursor {
                        proposal_id,
                        phase: SweepPhase::Tally(tally),
                    }));
                }
                let burn = finish_tally(state, proposal_id, tally)?;
                phase = SweepPhase::SettleDeposits {
                    burn,
                };
            }
            SweepPhase::SettleDeposits {
                burn,
            } => {
                let gov = ModuleAccount::Gov.address();
                for (depositor, amount) in state.get_deposits(proposal_id, budget(*entries_left))? {
                    if burn {
                        state.burn(&gov, BOND_DENOM, amount)?;
                    } else {
                        state.transfer(&gov, &depositor, BOND_DENOM, amount)?;
                    }
                    state.delete_deposit(proposal_id, &depositor);
                    *entries_left = entries_left.saturating_sub(1);
                }
                if !state.get_deposits(proposal_id, 1)?.is_empty() {
                    return Ok(Some(SweepCursor {
                        proposal_id,
                        phase,
                    }));
                }
                debug!(proposal_id, burn, "settled all deposits of proposal");
                return Ok(None);
            }
        }
    }
}

fn budget(entries_left: u32) -> usize {
    usize::try_from(entries_left).unwrap_or(usize::MAX)
}

/// The tokens `voter` has delegated to bonded validators, and the number of
/// delegations read to find them.
fn voting_power<S: StateWrite>(state: &S, voter: &Address) -> Result<(u128, usize)> {
    let delegations = state.get_delegations_of(voter)?;
    let read = delegations.len();
    let mut power: u128 = 0;
    for (operator, shares) in delegations {
        let Some(validator) = state.get_validator(&operator)? else {
            warn!(%voter, %operator, "delegation references a missing validator; ignoring");
            continue;
        };
        if validator.status != BondStatus::Bonded {
            continue;
        }
        power = power
            .checked_add(validator.tokens_from_shares(shares)?)
            .ok_or_eyre("voting power overflows")?;
    }
    Ok((power, read))
}

/// Records the outcome of a fully tallied proposal. Returns whether its deposits burn.
fn finish_tally<S: StateWrite>(state: &mut S, proposal_id: u64, tally: TallyResult) -> Result<bool> {
    let mut proposal = state
        .get_proposal(proposal_id)?
        .ok_or_else(|| eyre::eyre!("proposal {proposal_id} vanished during its tally"))?;
    let params = state.get_gov_params()?;
    let bonded = state.get_account_balance(&ModuleAccount::BondedPool.address(), BOND_DENOM)?;
    let (status, burn) = decide(&params, &tally, bonded);

    if status == ProposalStatus::Passed {
        if let ProposalContent::UpdateResourceDependencyMapping {
            message_key,
            access_ops,
            ..
        } = &proposal.content
        {
            state.put_dependency_mapping(message_key, access_ops.clone())?;
            info!(proposal_id, %message_key, "updated resource dependency mapping");
        }
    }
    proposal.status = status;
    proposal.final_tally = Some(tally);
    state.put_proposal(proposal)?;
    info!(
        proposal_id,
        ?status,
        yes = tally.yes,
        no = tally.no,
        abstain = tally.abstain,
        no_with_veto = tally.no_with_veto,
        "tallied proposal"
    );
    Ok(burn)
}

/// Decides a proposal from its tally and the bonded token supply.
///
/// All comparisons are done on cross-multiplied integers.
fn decide(params: &GovParams, tally: &TallyResult, bonded: u128) -> (ProposalStatus, bool) {
    let scaled = |amount: u128, bps: u64| amount.saturating_mul(u128::from(bps));
    let total = tally.total();
    if bonded == 0 || scaled(total, 10_000) < scaled(bonded, params.quorum_bps) {
        return (ProposalStatus::Rejected, false);
    }
    if scaled(tally.no_with_veto, 10_000) > scaled(total, params.veto_threshold_bps) {
        return (ProposalStatus::Rejected, true);
    }
    let decisive = total.saturating_sub(tally.abstain);
    if decisive == 0 {
        return (ProposalStatus::Rejected, false);
    }
    if scaled(tally.yes, 10_000) > scaled(decisive, params.threshold_bps) {
        (ProposalStatus::Passed, false)
    } else {
        (ProposalStatus::Rejected, false)
    }
}

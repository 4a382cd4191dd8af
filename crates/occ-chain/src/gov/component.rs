use eyre::{
    Result,
    WrapErr as _,
};
use occ_storage::StateWrite;
use tracing::{
    debug,
    instrument,
};

use super::{
    sweep,
    StateWriteExt as _,
};
use crate::{
    component::{
        BlockContext,
        Component,
    },
    genesis::GenesisAppState,
};

#[derive(Default)]
pub(crate) struct GovComponent;

impl Component for GovComponent {
    type AppState = GenesisAppState;

    #[instrument(name = "GovComponent::init_chain", skip_all, err)]
    fn init_chain<S: StateWrite>(mut state: S, app_state: &Self::AppState) -> Result<()> {
        let params = &app_state.gov.params;
        params.validate().wrap_err("invalid gov params")?;
        state.put_gov_params(params.clone())
    }

    #[instrument(name = "GovComponent::end_block", skip_all, err)]
    fn end_block<S: StateWrite>(state: &mut S, block: &BlockContext<'_>) -> Result<()> {
        let stats = sweep::sweep(state, block.time, block.gov_sweep)
            .wrap_err("failed sweeping expired proposals")?;
        if stats.proposals_started > 0 || stats.deferred {
            debug!(
                proposals_started = stats.proposals_started,
                entries_processed = stats.entries_processed,
                finished = stats.finished,
                deferred = stats.deferred,
                "swept expired proposals"
            );
        }
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
        gov::{
            GovParams,
            Proposal,
            ProposalContent,
            ProposalStatus,
            StateReadExt as _,
            SweepLimits,
            SweepPhase,
            VoteOption,
            WeightedVoteOption,
        },
        staking::{
            StateWriteExt as _,
            StakingParams,
            POWER_REDUCTION,
        },
        test_utils::{
            address,
            block_context,
            validator,
        },
    };

    const DEPOSIT_END: u64 = 100;

    fn expired_proposal(state: &mut StateDelta<occ_storage::Snapshot>, id: u64, depositors: u8) {
        state
            .put_proposal(Proposal {
                id,
                proposer: address(1),
                content: ProposalContent::Text {
                    title: format!("proposal {id}"),
                    description: String::new(),
                },
                status: ProposalStatus::DepositPeriod,
                submit_time: 0,
                deposit_end_time: DEPOSIT_END,
                voting_start_time: None,
                voting_end_time: None,
                total_deposit: u128::from(depositors),
                final_tally: None,
            })
            .unwrap();
        state.insert_inactive_proposal_queue(DEPOSIT_END, id).unwrap();
        for n in 0..depositors {
            state.put_deposit(id, &address(n), 1).unwrap();
        }
        state
            .mint(&ModuleAccount::Gov.address(), BOND_DENOM, u128::from(depositors))
            .unwrap();
    }

    #[test]
    fn sweep_work_per_block_is_capped() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.put_gov_params(GovParams::default()).unwrap();
        for id in 1..=20 {
            expired_proposal(&mut state, id, 30);
        }
        let limits = SweepLimits {
            max_proposals: 5,
            max_entries: 50,
        };

        let stats = sweep::sweep(&mut state, DEPOSIT_END, limits).unwrap();
        assert!(stats.proposals_started <= 5);
        assert_eq!(50, stats.entries_processed);
        assert!(stats.deferred);
        assert_eq!(
            600 - 50,
            state
                .get_account_balance(&ModuleAccount::Gov.address(), BOND_DENOM)
                .unwrap()
        );
        let cursor = state.get_sweep_cursor().unwrap().unwrap();
        assert_eq!(2, cursor.proposal_id);
        assert_eq!(
            SweepPhase::SettleDeposits {
                burn: true
            },
            cursor.phase
        );

        let mut blocks = 1;
        while state.get_sweep_cursor().unwrap().is_some()
            || !state
                .get_expired_deposit_periods(DEPOSIT_END, 1)
                .unwrap()
                .is_empty()
        {
            let stats = sweep::sweep(&mut state, DEPOSIT_END, limits).unwrap();
            assert!(stats.entries_processed <= 50);
            blocks += 1;
        }
        assert_eq!(12, blocks);
        assert_eq!(
            0,
            state
                .get_account_balance(&ModuleAccount::Gov.address(), BOND_DENOM)
                .unwrap()
        );
        for id in 1..=20 {
            assert_eq!(
                ProposalStatus::Failed,
                state.get_proposal(id).unwrap().unwrap().status
            );
        }
    }

    #[test]
    fn delegation_reads_count_against_the_sweep_budget() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.put_gov_params(GovParams::default()).unwrap();
        state.put_staking_params(StakingParams::default()).unwrap();
        for n in 10..=13 {
            let bonded = validator(n, 10 * POWER_REDUCTION);
            state.put_validator(&bonded).unwrap();
            state
                .mint(&ModuleAccount::BondedPool.address(), BOND_DENOM, bonded.tokens)
                .unwrap();
        }

        let voting_end = 500;
        state
            .put_proposal(Proposal {
                id: 1,
                proposer: address(1),
                content: ProposalContent::Text {
                    title: "text".to_string(),
                    description: String::new(),
                },
                status: ProposalStatus::VotingPeriod,
                submit_time: 0,
                deposit_end_time: 100,
                voting_start_time: Some(0),
                voting_end_time: Some(voting_end),
                total_deposit: 0,
                final_tally: None,
            })
            .unwrap();
        state.insert_active_proposal_queue(voting_end, 1).unwrap();
        for voter in 1..=3 {
            for operator in 10..=13 {
                state
                    .put_delegation(&address(voter), &address(operator), POWER_REDUCTION)
                    .unwrap();
            }
            state
                .put_vote(
                    1,
                    &address(voter),
                    vec![WeightedVoteOption {
                        option: VoteOption::Yes,
                        weight_bps: 10_000,
                    }],
                )
                .unwrap();
        }
        let limits = SweepLimits {
            max_proposals: 1,
            max_entries: 10,
        };

        // Each vote costs itself plus its four delegations.
        let stats = sweep::sweep(&mut state, voting_end, limits).unwrap();
        assert_eq!(10, stats.entries_processed);
        assert!(stats.deferred);
        assert_eq!(1, state.get_votes(1, 10).unwrap().len());
        assert!(matches!(
            state.get_sweep_cursor().unwrap().unwrap().phase,
            SweepPhase::Tally(_)
        ));

        let stats = sweep::sweep(&mut state, voting_end, limits).unwrap();
        assert_eq!(5, stats.entries_processed);
        assert!(!stats.deferred);
        assert!(state.get_votes(1, 10).unwrap().is_empty());
        assert_eq!(
            12 * POWER_REDUCTION,
            state.get_proposal(1).unwrap().unwrap().final_tally.unwrap().yes
        );
    }

    #[test]
    fn proposals_not_yet_expired_are_left_alone() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.put_gov_params(GovParams::default()).unwrap();
        expired_proposal(&mut state, 1, 2);
        let stats = sweep::sweep(&mut state, DEPOSIT_END - 1, SweepLimits::default()).unwrap();
        assert_eq!(0, stats.proposals_started);
        assert_eq!(
            ProposalStatus::DepositPeriod,
            state.get_proposal(1).unwrap().unwrap().status
        );
    }

    #[test]
    fn passed_proposal_refunds_deposits() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.put_gov_params(GovParams::default()).unwrap();
        state.put_staking_params(StakingParams::default()).unwrap();
        let bonded = validator(9, 10 * POWER_REDUCTION);
        state.put_validator(&bonded).unwrap();
        state
            .mint(&ModuleAccount::BondedPool.address(), BOND_DENOM, bonded.tokens)
            .unwrap();
        state
            .put_delegation(&address(9), &address(9), bonded.delegator_shares)
            .unwrap();

        let voting_end = 500;
        state
            .put_proposal(Proposal {
                id: 1,
                proposer: address(1),
                content: ProposalContent::Text {
                    title: "text".to_string(),
                    description: String::new(),
                },
                status: ProposalStatus::VotingPeriod,
                submit_time: 0,
                deposit_end_time: 100,
                voting_start_time: Some(0),
                voting_end_time: Some(voting_end),
                total_deposit: 7,
                final_tally: None,
            })
            .unwrap();
        state.insert_active_proposal_queue(voting_end, 1).unwrap();
        state.put_deposit(1, &address(1), 7).unwrap();
        state
            .mint(&ModuleAccount::Gov.address(), BOND_DENOM, 7)
            .unwrap();
        state
            .put_vote(
                1,
                &address(9),
                vec![WeightedVoteOption {
                    option: VoteOption::Yes,
                    weight_bps: 10_000,
                }],
            )
            .unwrap();

        let block = block_context(2, voting_end);
        GovComponent::end_block(&mut state, &block).unwrap();

        let proposal = state.get_proposal(1).unwrap().unwrap();
        assert_eq!(ProposalStatus::Passed, proposal.status);
        assert_eq!(10 * POWER_REDUCTION, proposal.final_tally.unwrap().yes);
        assert_eq!(7, state.get_account_balance(&address(1), BOND_DENOM).unwrap());
        assert!(state.get_votes(1, 10).unwrap().is_empty());
        assert!(state.get_sweep_cursor().unwrap().is_none());
    }
}

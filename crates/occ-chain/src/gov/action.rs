use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    bail,
    ensure,
    OptionExt as _,
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
    validate_weighted_options,
    GovParams,
    Proposal,
    ProposalContent,
    ProposalStatus,
    StateReadExt as _,
    StateWriteExt as _,
    VoteOption,
    WeightedVoteOption,
    TOTAL_WEIGHT_BPS,
};
use crate::{
    accounts::{
        ModuleAccount,
        StateWriteExt as _,
        BOND_DENOM,
    },
    address::Address,
    app::ActionHandler,
    transaction::{
        parse_address,
        MessageError,
        TxContext,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgSubmitProposal {
    pub proposer: String,
    pub content: ProposalContent,
    pub initial_deposit: u128,
}

impl ActionHandler for MsgSubmitProposal {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("proposer", &self.proposer)?;
        self.content.validate()
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, context: &TxContext) -> Result<()> {
        let proposer = parse_address("proposer", &self.proposer)?;
        let params = state.get_gov_params()?;
        let id = state.get_next_proposal_id()?;
        state.put_next_proposal_id(id.checked_add(1).ok_or_eyre("proposal id overflows")?)?;

        let deposit_end_time = context
            .time
            .checked_add(params.max_deposit_period_secs)
            .ok_or_eyre("deposit end time overflows")?;
        let mut proposal = Proposal {
            id,
            proposer,
            content: self.content.clone(),
            status: ProposalStatus::DepositPeriod,
            submit_time: context.time,
            deposit_end_time,
            voting_start_time: None,
            voting_end_time: None,
            total_deposit: 0,
            final_tally: None,
        };
        state.insert_inactive_proposal_queue(deposit_end_time, id)?;
        if self.initial_deposit > 0 {
            add_deposit(
                &mut state,
                &params,
                &mut proposal,
                &proposer,
                self.initial_deposit,
                context.time,
            )?;
        }
        info!(id, title = proposal.content.title(), "submitted proposal");
        state.put_proposal(proposal)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgDeposit {
    pub depositor: String,
    pub proposal_id: u64,
    pub amount: u128,
}

impl ActionHandler for MsgDeposit {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("depositor", &self.depositor)?;
        if self.amount == 0 {
            return Err(MessageError::zero_amount("amount"));
        }
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, context: &TxContext) -> Result<()> {
        let depositor = parse_address("depositor", &self.depositor)?;
        let params = state.get_gov_params()?;
        let mut proposal = state
            .get_proposal(self.proposal_id)?
            .ok_or_else(|| eyre::eyre!("proposal {} does not exist", self.proposal_id))?;
        match proposal.status {
            ProposalStatus::DepositPeriod => ensure!(
                context.time < proposal.deposit_end_time,
                "deposit period of proposal {} has ended",
                proposal.id
            ),
            ProposalStatus::VotingPeriod => ensure!(
                proposal
                    .voting_end_time
                    .is_some_and(|end| context.time < end),
                "voting period of proposal {} has ended",
                proposal.id
            ),
            status => bail!("proposal {} no longer accepts deposits: {status:?}", proposal.id),
        }
        add_deposit(
            &mut state,
            &params,
            &mut proposal,
            &depositor,
            self.amount,
            context.time,
        )?;
        state.put_proposal(proposal)
    }
}

/// Escrows `amount` in the gov account and moves the proposal into its voting period
/// once the minimum deposit is reached.
fn add_deposit<S: StateWrite>(
    state: &mut S,
    params: &GovParams,
    proposal: &mut Proposal,
    depositor: &Address,
    amount: u128,
    time: u64,
) -> Result<()> {
    state
        .transfer(depositor, &ModuleAccount::Gov.address(), BOND_DENOM, amount)
        .wrap_err("failed escrowing deposit")?;
    let deposit = state
        .get_deposit(proposal.id, depositor)?
        .checked_add(amount)
        .ok_or_eyre("deposit overflows")?;
    state.put_deposit(proposal.id, depositor, deposit)?;
    proposal.total_deposit = proposal
        .total_deposit
        .checked_add(amount)
        .ok_or_eyre("total deposit overflows")?;

    if proposal.status == ProposalStatus::DepositPeriod
        && proposal.total_deposit >= params.min_deposit
    {
        let voting_end_time = time
            .checked_add(params.voting_period_secs)
            .ok_or_eyre("voting end time overflows")?;
        state.delete_inactive_proposal_queue(proposal.deposit_end_time, proposal.id);
        state.insert_active_proposal_queue(voting_end_time, proposal.id)?;
        proposal.status = ProposalStatus::VotingPeriod;
        proposal.voting_start_time = Some(time);
        proposal.voting_end_time = Some(voting_end_time);
        info!(id = proposal.id, voting_end_time, "proposal entered its voting period");
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgVote {
    pub voter: String,
    pub proposal_id: u64,
    pub option: VoteOption,
}

impl ActionHandler for MsgVote {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("voter", &self.voter)?;
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, state: S, context: &TxContext) -> Result<()> {
        let voter = parse_address("voter", &self.voter)?;
        cast_vote(
            state,
            self.proposal_id,
            &voter,
            vec![WeightedVoteOption {
                option: self.option,
                weight_bps: TOTAL_WEIGHT_BPS,
            }],
            context.time,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgVoteWeighted {
    pub voter: String,
    pub proposal_id: u64,
    pub options: Vec<WeightedVoteOption>,
}

impl ActionHandler for MsgVoteWeighted {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("voter", &self.voter)?;
        validate_weighted_options(&self.options)
    }

    fn check_and_execute<S: StateWrite>(&self, state: S, context: &TxContext) -> Result<()> {
        let voter = parse_address("voter", &self.voter)?;
        cast_vote(state, self.proposal_id, &voter, self.options.clone(), context.time)
    }
}

fn cast_vote<S: StateWrite>(
    mut state: S,
    proposal_id: u64,
    voter: &Address,
    options: Vec<WeightedVoteOption>,
    time: u64,
) -> Result<()> {
    let proposal = state
        .get_proposal(proposal_id)?
        .ok_or_else(|| eyre::eyre!("proposal {proposal_id} does not exist"))?;
    ensure!(
        proposal.status == ProposalStatus::VotingPeriod,
        "proposal {proposal_id} is not in its voting period"
    );
    ensure!(
        proposal.voting_end_time.is_some_and(|end| time < end),
        "voting period of proposal {proposal_id} has ended"
    );
    state.put_vote(proposal_id, voter, options)
}

#[cfg(test)]
mod tests {
    use occ_storage::{
        StateDelta,
        Storage,
    };

    use super::*;
    use crate::{
        accounts::StateReadExt as _,
        gov::{
            AccessOperation,
            AccessType,
        },
        test_utils::{
            address,
            assert_error_contains,
            tx_context,
        },
    };

    fn text() -> ProposalContent {
        ProposalContent::Text {
            title: "raise the block size".to_string(),
            description: String::new(),
        }
    }

    fn state(storage: &Storage) -> StateDelta<occ_storage::Snapshot> {
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.put_gov_params(GovParams::default()).unwrap();
        state.mint(&address(1), BOND_DENOM, 100_000_000).unwrap();
        state
    }

    fn submit(initial_deposit: u128) -> MsgSubmitProposal {
        MsgSubmitProposal {
            proposer: address(1).to_string(),
            content: text(),
            initial_deposit,
        }
    }

    #[test]
    fn empty_access_ops_are_rejected_at_submission() {
        let msg = MsgSubmitProposal {
            proposer: address(1).to_string(),
            content: ProposalContent::UpdateResourceDependencyMapping {
                title: "mapping".to_string(),
                description: String::new(),
                message_key: "bank/send".to_string(),
                access_ops: vec![],
            },
            initial_deposit: 0,
        };
        let error = msg.check_stateless().unwrap_err();
        assert!(error.to_string().contains("access_ops"), "{error}");

        let mut valid = msg;
        if let ProposalContent::UpdateResourceDependencyMapping {
            access_ops, ..
        } = &mut valid.content
        {
            access_ops.push(AccessOperation {
                access_type: AccessType::Commit,
                resource_type: String::new(),
                identifier_template: String::new(),
            });
        }
        assert!(valid.check_stateless().is_ok());
    }

    #[test]
    fn small_initial_deposit_keeps_proposal_in_deposit_period() {
        let storage = Storage::new();
        let mut state = state(&storage);
        submit(1).check_and_execute(&mut state, &tx_context()).unwrap();
        let proposal = state.get_proposal(1).unwrap().unwrap();
        assert_eq!(ProposalStatus::DepositPeriod, proposal.status);
        assert_eq!(1, proposal.total_deposit);
        assert_eq!(
            1,
            state
                .get_account_balance(&ModuleAccount::Gov.address(), BOND_DENOM)
                .unwrap()
        );
        assert_eq!(2, state.get_next_proposal_id().unwrap());
    }

    #[test]
    fn reaching_min_deposit_starts_voting() {
        let storage = Storage::new();
        let mut state = state(&storage);
        let context = tx_context();
        submit(1).check_and_execute(&mut state, &context).unwrap();
        MsgDeposit {
            depositor: address(1).to_string(),
            proposal_id: 1,
            amount: GovParams::default().min_deposit,
        }
        .check_and_execute(&mut state, &context)
        .unwrap();

        let proposal = state.get_proposal(1).unwrap().unwrap();
        assert_eq!(ProposalStatus::VotingPeriod, proposal.status);
        assert_eq!(Some(context.time), proposal.voting_start_time);
        assert!(state
            .get_expired_deposit_periods(u64::MAX, 10)
            .unwrap()
            .is_empty());
        assert_eq!(
            vec![(context.time + GovParams::default().voting_period_secs, 1)],
            state.get_expired_voting_periods(u64::MAX, 10).unwrap()
        );
        assert_eq!(
            GovParams::default().min_deposit + 1,
            state.get_deposit(1, &address(1)).unwrap()
        );
    }

    #[test]
    fn voting_requires_an_open_voting_period() {
        let storage = Storage::new();
        let mut state = state(&storage);
        submit(1).check_and_execute(&mut state, &tx_context()).unwrap();
        let vote = MsgVote {
            voter: address(1).to_string(),
            proposal_id: 1,
            option: VoteOption::Yes,
        };
        let error = vote
            .check_and_execute(&mut state, &tx_context())
            .unwrap_err();
        assert_error_contains(&error, "not in its voting period");
    }

    #[test]
    fn weighted_vote_over_one_whole_vote_is_rejected() {
        let msg = MsgVoteWeighted {
            voter: address(1).to_string(),
            proposal_id: 1,
            options: vec![
                WeightedVoteOption {
                    option: VoteOption::Yes,
                    weight_bps: 10_000,
                },
                WeightedVoteOption {
                    option: VoteOption::No,
                    weight_bps: 5_000,
                },
            ],
        };
        assert!(msg.check_stateless().is_err());
    }
}

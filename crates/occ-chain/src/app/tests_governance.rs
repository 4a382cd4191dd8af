use occ_storage::StateDelta;

use super::*;
use crate::{
    accounts::{
        StateReadExt as _,
        StateWriteExt as _,
    },
    gov::{
        AccessOperation,
        AccessType,
        GovParams,
        MsgSubmitProposal,
        MsgVote,
        Proposal,
        ProposalContent,
        ProposalStatus,
        StateReadExt as _,
        StateWriteExt as _,
        VoteOption,
    },
    staking::POWER_REDUCTION,
    test_utils::{
        address,
        block,
        genesis,
        initialized_app,
        signed_tx,
        GENESIS_TIME,
    },
    transaction::{
        Message,
        TxCode,
    },
};

fn gov_balance(app: &App) -> u128 {
    app.storage()
        .latest_snapshot()
        .get_account_balance(&ModuleAccount::Gov.address(), BOND_DENOM)
        .unwrap()
}

fn mapping_proposal(access_ops: Vec<AccessOperation>, initial_deposit: u128) -> Message {
    Message::SubmitProposal(MsgSubmitProposal {
        proposer: address(1).to_string(),
        content: ProposalContent::UpdateResourceDependencyMapping {
            title: "declare bank sends".to_string(),
            description: "reads and writes of a transfer".to_string(),
            message_key: "/cosmos.bank.v1beta1.MsgSend".to_string(),
            access_ops,
        },
        initial_deposit,
    })
}

fn op(access_type: AccessType) -> AccessOperation {
    AccessOperation {
        access_type,
        resource_type: "balance".to_string(),
        identifier_template: "*".to_string(),
    }
}

// Two hundred proposals with two hundred deposits each expire at once. No block may
// settle more than the per block entry budget, and every deposit is burned in the end.
#[test]
fn expired_deposits_are_burned_over_many_blocks() {
    const PROPOSALS: u64 = 200;
    const DEPOSITORS: u8 = 200;

    let mut app = initialized_app(&genesis(), AppConfig::default());
    let mut state = StateDelta::new(app.storage().latest_snapshot());
    for id in 1..=PROPOSALS {
        state
            .put_proposal(Proposal {
                id,
                proposer: address(1),
                content: ProposalContent::Text {
                    title: format!("proposal {id}"),
                    description: String::new(),
                },
                status: ProposalStatus::DepositPeriod,
                submit_time: GENESIS_TIME,
                deposit_end_time: GENESIS_TIME,
                voting_start_time: None,
                voting_end_time: None,
                total_deposit: u128::from(DEPOSITORS),
                final_tally: None,
            })
            .unwrap();
        state.insert_inactive_proposal_queue(GENESIS_TIME, id).unwrap();
        for n in 0..DEPOSITORS {
            state.put_deposit(id, &address(n), 1).unwrap();
        }
    }
    let escrowed = u128::from(PROPOSALS) * u128::from(DEPOSITORS);
    state
        .mint(&ModuleAccount::Gov.address(), BOND_DENOM, escrowed)
        .unwrap();
    state.put_next_proposal_id(PROPOSALS + 1).unwrap();
    app.storage().commit(state.into_changeset());
    assert_eq!(escrowed, gov_balance(&app));

    let max_entries = u128::from(AppConfig::default().gov_sweep.max_entries);
    let mut height = 0;
    while gov_balance(&app) > 0 {
        height += 1;
        assert!(height <= 40, "sweep did not finish within 40 blocks");
        let before = gov_balance(&app);
        app.process_block(&block(height, Vec::new())).unwrap();
        let burned = before - gov_balance(&app);
        assert!(burned <= max_entries, "block {height} burned {burned} deposits");
    }
    assert_eq!(40, height);

    let snapshot = app.storage().latest_snapshot();
    assert!(snapshot.get_sweep_cursor().unwrap().is_none());
    for id in 1..=PROPOSALS {
        assert_eq!(
            ProposalStatus::Failed,
            snapshot.get_proposal(id).unwrap().unwrap().status
        );
        assert!(snapshot.get_deposits(id, 1).unwrap().is_empty());
    }
}

#[test]
fn dependency_mapping_without_access_ops_is_rejected() {
    let mut app = initialized_app(&genesis(), AppConfig::default());
    let tx = signed_tx(1, 0, vec![mapping_proposal(Vec::new(), 0)]);
    let (response, _) = app.process_block(&block(1, vec![tx])).unwrap();

    let result = &response.tx_results[0];
    assert_eq!(TxCode::InvalidMessage, result.code);
    assert!(result.log.contains("access_ops"), "{}", result.log);
    assert!(result.log.contains("must not be empty"), "{}", result.log);
    let snapshot = app.storage().latest_snapshot();
    assert!(snapshot.get_proposal(1).unwrap().is_none());
    assert_eq!(1, snapshot.get_next_proposal_id().unwrap());
}

#[test]
fn passed_mapping_proposal_is_applied_and_refunded() {
    let genesis = genesis();
    let params = GovParams::default();
    let mut app = initialized_app(&genesis, AppConfig::default());
    let proposer_balance = 1_000 * POWER_REDUCTION;

    let submit = signed_tx(
        1,
        0,
        vec![mapping_proposal(
            vec![op(AccessType::Read), op(AccessType::Write), op(AccessType::Commit)],
            params.min_deposit,
        )],
    );
    let (response, _) = app.process_block(&block(1, vec![submit])).unwrap();
    assert_eq!(TxCode::Ok, response.tx_results[0].code, "{}", response.tx_results[0].log);
    let proposal = app.storage().latest_snapshot().get_proposal(1).unwrap().unwrap();
    assert_eq!(ProposalStatus::VotingPeriod, proposal.status);
    assert_eq!(params.min_deposit, gov_balance(&app));

    let votes = (1..=2)
        .map(|n| {
            signed_tx(
                n,
                u64::from(n == 1),
                vec![Message::Vote(MsgVote {
                    voter: address(n).to_string(),
                    proposal_id: 1,
                    option: VoteOption::Yes,
                })],
            )
        })
        .collect();
    let (response, _) = app.process_block(&block(2, votes)).unwrap();
    assert!(response.tx_results.iter().all(|result| result.code.is_ok()));

    let voting_end_time = proposal.voting_end_time.unwrap();
    app.process_block(&BlockData {
        time: voting_end_time,
        ..block(3, Vec::new())
    })
    .unwrap();

    let snapshot = app.storage().latest_snapshot();
    let proposal = snapshot.get_proposal(1).unwrap().unwrap();
    assert_eq!(ProposalStatus::Passed, proposal.status);
    assert_eq!(20 * POWER_REDUCTION, proposal.final_tally.unwrap().yes);
    assert_eq!(
        3,
        snapshot
            .get_dependency_mapping("/cosmos.bank.v1beta1.MsgSend")
            .unwrap()
            .unwrap()
            .len()
    );
    assert_eq!(0, gov_balance(&app));
    assert_eq!(
        proposer_balance,
        snapshot.get_account_balance(&address(1), BOND_DENOM).unwrap()
    );
}

use super::*;
use crate::{
    accounts::StateReadExt as _,
    address::consensus_address,
    slashing::{
        SlashingParams,
        StateReadExt as _,
    },
    staking::{
        MsgUndelegate,
        StateReadExt as _,
        POWER_REDUCTION,
    },
    test_utils::{
        address,
        assert_error_contains,
        block,
        consensus_key,
        genesis,
        initialized_app,
        signed_tx,
        vote,
    },
    transaction::{
        Message,
        TxCode,
    },
};

// A window of four blocks in which at most two may be missed.
fn short_window_genesis() -> GenesisAppState {
    let mut genesis = genesis();
    genesis.slashing.params = SlashingParams {
        signed_blocks_window: 4,
        min_signed_per_window_bps: 5_000,
        downtime_jail_duration_secs: 60,
        slash_fraction_downtime_bps: 100,
    };
    genesis
}

fn offline_block(height: u64) -> BlockData {
    BlockData {
        decided_last_commit: (1..=3).map(|n| vote(n, 10, false)).collect(),
        ..block(height, Vec::new())
    }
}

fn is_jailed(app: &App, n: u8) -> bool {
    app.storage()
        .latest_snapshot()
        .get_validator(&address(n))
        .unwrap()
        .unwrap()
        .jailed
}

#[test]
fn jailing_every_offline_validator_spares_one() {
    let mut app = initialized_app(&short_window_genesis(), AppConfig::default());
    for height in 1..=4 {
        let (response, _) = app.process_block(&offline_block(height)).unwrap();
        assert!(response.validator_updates.is_empty());
    }
    let (response, _) = app.process_block(&offline_block(5)).unwrap();

    assert!(!is_jailed(&app, 1));
    assert!(is_jailed(&app, 2));
    assert!(is_jailed(&app, 3));
    assert_eq!(2, response.validator_updates.len());
    assert!(response
        .validator_updates
        .iter()
        .all(|update| update.power.value() == 0));

    let snapshot = app.storage().latest_snapshot();
    assert_eq!(10, snapshot.get_last_total_power().unwrap());
    let jailed = snapshot
        .get_signing_info(&consensus_address(&consensus_key(2)))
        .unwrap()
        .unwrap();
    assert_eq!(offline_block(5).time + 60, jailed.jailed_until);
}

#[test]
fn halt_policy_refuses_a_block_that_would_empty_the_set() {
    let config = AppConfig {
        jail_policy: JailPolicy::Halt,
        ..AppConfig::default()
    };
    let mut app = initialized_app(&short_window_genesis(), config);
    for height in 1..=4 {
        app.process_block(&offline_block(height)).unwrap();
    }
    let error = app.finalize_block(&offline_block(5)).unwrap_err();
    assert_error_contains(&error, "no voting power");
    assert!(!is_jailed(&app, 1));
}

#[test]
fn some_validators_offline_are_all_jailed() {
    let mut app = initialized_app(&short_window_genesis(), AppConfig::default());
    let partly_offline = |height| BlockData {
        decided_last_commit: vec![vote(1, 10, true), vote(2, 10, false), vote(3, 10, false)],
        ..block(height, Vec::new())
    };
    for height in 1..=5 {
        app.process_block(&partly_offline(height)).unwrap();
    }
    assert!(!is_jailed(&app, 1));
    assert!(is_jailed(&app, 2));
    assert!(is_jailed(&app, 3));
}

#[test]
fn repeated_votes_in_a_commit_are_counted_once() {
    let mut app = initialized_app(&short_window_genesis(), AppConfig::default());
    let repeated = |height| BlockData {
        decided_last_commit: vec![
            vote(1, 10, true),
            vote(2, 10, false),
            vote(2, 10, false),
            vote(3, 10, true),
        ],
        ..block(height, Vec::new())
    };
    for height in 1..=2 {
        app.process_block(&repeated(height)).unwrap();
    }
    let info = app
        .storage()
        .latest_snapshot()
        .get_signing_info(&consensus_address(&consensus_key(2)))
        .unwrap()
        .unwrap();
    assert_eq!(2, info.missed_blocks_counter);
    assert_eq!(2, info.index_offset);

    for height in 3..=5 {
        app.process_block(&repeated(height)).unwrap();
    }
    assert!(!is_jailed(&app, 1));
    assert!(is_jailed(&app, 2));
    assert!(!is_jailed(&app, 3));
}

// The removal of a validator only reaches consensus after the update delay, so its
// votes keep showing up in the commits of the following blocks.
#[test]
fn votes_of_a_removed_validator_are_skipped() {
    let mut genesis = genesis();
    genesis.staking.params.unbonding_time_secs = 0;
    let mut app = initialized_app(&genesis, AppConfig::default());
    let removed = consensus_address(&consensus_key(3));

    let undelegate = Message::Undelegate(MsgUndelegate {
        delegator: address(3).to_string(),
        validator: address(3).to_string(),
        amount: 10 * POWER_REDUCTION,
    });
    let (response, _) = app
        .process_block(&BlockData {
            decided_last_commit: (1..=3).map(|n| vote(n, 10, true)).collect(),
            ..block(1, vec![signed_tx(3, 0, vec![undelegate])])
        })
        .unwrap();
    assert_eq!(TxCode::Ok, response.tx_results[0].code, "{}", response.tx_results[0].log);
    assert_eq!(1, response.validator_updates.len());
    assert_eq!(0, response.validator_updates[0].power.value());
    assert!(app
        .storage()
        .latest_snapshot()
        .get_validator(&address(3))
        .unwrap()
        .is_none());

    for height in 2..=3 {
        app.process_block(&BlockData {
            decided_last_commit: (1..=3).map(|n| vote(n, 10, height == 2)).collect(),
            ..block(height, Vec::new())
        })
        .unwrap();
        let info = app
            .storage()
            .latest_snapshot()
            .get_signing_info(&removed)
            .unwrap();
        assert_eq!(height == 2, info.is_some(), "height {height}");
    }
    assert_eq!(
        1_000 * POWER_REDUCTION + 10 * POWER_REDUCTION,
        app.storage()
            .latest_snapshot()
            .get_account_balance(&address(3), BOND_DENOM)
            .unwrap()
    );
}

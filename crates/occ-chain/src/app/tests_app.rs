use occ_scheduler::SchedulerConfig;

use super::*;
use crate::{
    accounts::{
        GenesisAccount,
        StateReadExt as _,
    },
    staking::POWER_REDUCTION,
    test_utils::{
        address,
        assert_error_contains,
        block,
        genesis,
        initialized_app,
        send,
        signed_tx,
        GAS_LIMIT,
    },
    transaction::{
        Transaction,
        TxCode,
    },
};

fn funded_genesis(signers: std::ops::RangeInclusive<u8>) -> GenesisAppState {
    let mut genesis = genesis();
    genesis
        .accounts
        .extend(signers.map(|n| GenesisAccount {
            address: address(n),
            balance: 100 * POWER_REDUCTION,
        }));
    genesis
}

fn balance(app: &App, n: u8) -> u128 {
    app.storage()
        .latest_snapshot()
        .get_account_balance(&address(n), BOND_DENOM)
        .unwrap()
}

#[test]
fn init_chain_bonds_genesis_validators() {
    let storage = Storage::new();
    let mut app = App::new(storage, AppConfig::default()).unwrap();
    let response = app.init_chain(&genesis()).unwrap();

    assert_eq!(3, response.validators.len());
    assert!(response
        .validators
        .iter()
        .all(|update| update.power.value() == 10));
    assert_eq!(app.storage().root_hash(), response.app_hash);
    assert_eq!(3, app.validator_set_updates().unwrap().len());
    assert_eq!(
        30 * POWER_REDUCTION,
        app.storage()
            .latest_snapshot()
            .get_account_balance(&ModuleAccount::BondedPool.address(), BOND_DENOM)
            .unwrap()
    );

    let error = app.init_chain(&genesis()).unwrap_err();
    assert_error_contains(&error, "already initialized");
}

#[test]
fn invalid_genesis_is_rejected() {
    let mut genesis = genesis();
    genesis.staking.validators.clear();
    let mut app = App::new(Storage::new(), AppConfig::default()).unwrap();
    let error = app.init_chain(&genesis).unwrap_err();
    assert_error_contains(&error, "at least one validator");
}

#[test]
fn blocks_must_follow_the_last_committed_height() {
    let mut app = initialized_app(&genesis(), AppConfig::default());
    let error = app.finalize_block(&block(2, Vec::new())).unwrap_err();
    assert_error_contains(&error, "expected block 1, got block 2");

    app.finalize_block(&block(1, Vec::new())).unwrap();
    let error = app.finalize_block(&block(2, Vec::new())).unwrap_err();
    assert_error_contains(&error, "never committed");

    app.commit().unwrap();
    let error = app.commit().unwrap_err();
    assert_error_contains(&error, "no finalized block");
    app.process_block(&block(2, Vec::new())).unwrap();
}

#[test]
fn block_time_must_not_go_backwards() {
    let mut app = initialized_app(&genesis(), AppConfig::default());
    let mut first = block(1, Vec::new());
    first.time = crate::test_utils::GENESIS_TIME - 1;
    let error = app.finalize_block(&first).unwrap_err();
    assert_error_contains(&error, "before the last block time");
}

#[test]
fn uncommitted_block_leaves_storage_untouched() {
    let mut app = initialized_app(&genesis(), AppConfig::default());
    let before = app.storage().root_hash();
    let response = app
        .finalize_block(&block(1, vec![signed_tx(1, 0, vec![send(1, 2, 7)])]))
        .unwrap();
    assert_eq!(TxCode::Ok, response.tx_results[0].code);
    assert_eq!(before, app.storage().root_hash());

    let after = app.commit().unwrap();
    assert_ne!(before, after);
    assert_eq!(1_000 * POWER_REDUCTION + 7, balance(&app, 2));
}

#[test]
fn failed_transactions_are_reported_and_do_not_stop_the_block() {
    let mut app = initialized_app(&genesis(), AppConfig::default());
    let txs = vec![
        signed_tx(1, 0, vec![send(1, 2, 1)]),
        signed_tx(1, 5, vec![send(1, 2, 1)]),
        signed_tx(2, 0, vec![send(2, 3, u128::MAX)]),
        vec![0xde, 0xad],
        signed_tx(3, 0, vec![send(1, 3, 1)]),
    ];
    let (response, _) = app.process_block(&block(1, txs)).unwrap();
    let codes: Vec<_> = response
        .tx_results
        .iter()
        .map(|result| result.code)
        .collect();
    assert_eq!(
        vec![
            TxCode::Ok,
            TxCode::InvalidNonce,
            TxCode::ExecutionFailed,
            TxCode::Decode,
            TxCode::Unauthorized,
        ],
        codes
    );
    assert!(response.tx_results[2].log.contains("insufficient funds"));
}

// Every signer pays into a shared recipient and into its neighbour, so nearly every
// pair of transactions conflicts. The parallel run must land on the same state as a
// run that executes everything sequentially.
#[test]
fn parallel_block_matches_sequential_execution() {
    let genesis = funded_genesis(10..=40);
    let mut txs = Vec::new();
    for n in 10..=40 {
        txs.push(signed_tx(n, 0, vec![send(n, 99, 1), send(n, n + 1, 5)]));
    }
    for n in 10..=20 {
        txs.push(signed_tx(n, 1, vec![send(n, 99, 2)]));
    }
    txs.push(signed_tx(10, 7, vec![send(10, 99, 1)]));

    let parallel = AppConfig {
        scheduler: SchedulerConfig {
            workers: 4,
            max_rounds: 10,
        },
        ..AppConfig::default()
    };
    let sequential = AppConfig {
        scheduler: SchedulerConfig {
            workers: 1,
            max_rounds: 0,
        },
        ..AppConfig::default()
    };
    let mut parallel = initialized_app(&genesis, parallel);
    let mut sequential = initialized_app(&genesis, sequential);

    let (parallel_response, parallel_hash) =
        parallel.process_block(&block(1, txs.clone())).unwrap();
    let (sequential_response, sequential_hash) =
        sequential.process_block(&block(1, txs)).unwrap();

    assert_eq!(sequential_response.tx_results, parallel_response.tx_results);
    assert_eq!(sequential_hash, parallel_hash);
    assert_eq!(31 + 2 * 11, balance(&parallel, 99));
}

#[test]
fn fees_are_conserved_across_blocks() {
    let mut genesis = funded_genesis(10..=19);
    genesis.min_gas_price = 1;
    let fee = u128::from(GAS_LIMIT);
    let tx = |signer: u8, amount: u128| {
        Transaction {
            signer: address(signer),
            nonce: 0,
            gas_limit: GAS_LIMIT,
            fee,
            msgs: vec![send(signer, 99, amount)],
        }
        .to_bytes()
        .unwrap()
    };
    let mut app = initialized_app(&genesis, AppConfig::default());
    let supply_before = app
        .storage()
        .latest_snapshot()
        .get_supply(BOND_DENOM)
        .unwrap();

    // The last transaction cannot pay its transfer but still pays its fee.
    let mut txs: Vec<_> = (10..=18).map(|n| tx(n, 3)).collect();
    txs.push(tx(19, 1_000 * POWER_REDUCTION));
    let (response, _) = app.process_block(&block(1, txs)).unwrap();
    assert_eq!(TxCode::ExecutionFailed, response.tx_results[9].code);

    let snapshot = app.storage().latest_snapshot();
    let collected = snapshot
        .get_account_balance(&ModuleAccount::FeeCollector.address(), BOND_DENOM)
        .unwrap();
    assert_eq!(10 * fee, collected);
    let paid: u128 = (10..=19)
        .map(|n| 100 * POWER_REDUCTION - balance(&app, n))
        .sum();
    assert_eq!(collected + 9 * 3, paid);
    assert_eq!(9 * 3, balance(&app, 99));
    assert_eq!(supply_before, snapshot.get_supply(BOND_DENOM).unwrap());

    app.process_block(&block(2, Vec::new())).unwrap();
    let snapshot = app.storage().latest_snapshot();
    assert_eq!(
        0,
        snapshot
            .get_account_balance(&ModuleAccount::FeeCollector.address(), BOND_DENOM)
            .unwrap()
    );
    assert_eq!(
        collected,
        snapshot
            .get_account_balance(&ModuleAccount::Distribution.address(), BOND_DENOM)
            .unwrap()
    );
    assert_eq!(supply_before, snapshot.get_supply(BOND_DENOM).unwrap());
}

#[test]
fn fee_below_the_minimum_is_rejected() {
    let mut genesis = genesis();
    genesis.min_gas_price = 2;
    let mut app = initialized_app(&genesis, AppConfig::default());
    let tx = Transaction {
        signer: address(1),
        nonce: 0,
        gas_limit: GAS_LIMIT,
        fee: u128::from(GAS_LIMIT),
        msgs: vec![send(1, 2, 1)],
    }
    .to_bytes()
    .unwrap();
    let (response, _) = app.process_block(&block(1, vec![tx])).unwrap();
    assert_eq!(TxCode::InsufficientFee, response.tx_results[0].code);
    assert_eq!(1_000 * POWER_REDUCTION, balance(&app, 1));
}

// An envelope costs nine bytes on the wire, so a transaction at the size limit can
// nest tens of thousands of them. Decoding must give up at the nesting limit.
#[test]
fn deeply_nested_envelopes_fail_to_decode() {
    let mut bytes = Transaction {
        signer: address(1),
        nonce: 0,
        gas_limit: GAS_LIMIT,
        fee: 0,
        msgs: Vec::new(),
    }
    .to_bytes()
    .unwrap();
    bytes.truncate(bytes.len() - 4);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    let envelope = [11, 0, 0, 0, 0, 1, 0, 0, 0];
    while bytes.len() + envelope.len() <= DEFAULT_MAX_TX_BYTES {
        bytes.extend_from_slice(&envelope);
    }

    let mut app = initialized_app(&genesis(), AppConfig::default());
    let (response, _) = app.process_block(&block(1, vec![bytes])).unwrap();
    let result = &response.tx_results[0];
    assert_eq!(TxCode::Decode, result.code);
    assert!(result.log.contains("nested more than"), "{}", result.log);
}

fn fee_output(fee_credit: u128) -> TxOutput {
    TxOutput {
        result: TxResult {
            code: TxCode::Ok,
            log: String::new(),
            gas_wanted: 0,
            gas_used: 0,
        },
        fee_credit,
    }
}

#[test]
fn failed_fee_settlement_leaves_no_credits_behind() {
    let storage = Storage::new();
    let mut state = StateDelta::new(storage.latest_snapshot());
    let fee_collector = ModuleAccount::FeeCollector.address();

    let error = settle_fees(&mut state, vec![fee_output(u128::MAX), fee_output(1)]).unwrap_err();
    assert_error_contains(&error, "overflows");
    assert_eq!(0, state.get_account_balance(&fee_collector, BOND_DENOM).unwrap());

    let results = settle_fees(&mut state, vec![fee_output(3), fee_output(4)]).unwrap();
    assert_eq!(2, results.len());
    assert_eq!(7, state.get_account_balance(&fee_collector, BOND_DENOM).unwrap());
}

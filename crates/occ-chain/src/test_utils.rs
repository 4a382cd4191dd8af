use occ_storage::Storage;

use crate::{
    accounts::{
        GenesisAccount,
        MsgSend,
        BOND_DENOM,
    },
    address::{
        consensus_address,
        Address,
    },
    app::{
        App,
        AppConfig,
        BlockData,
        VoteInfo,
        DEFAULT_MAX_MSGS_PER_TX,
        DEFAULT_MAX_TX_BYTES,
    },
    component::BlockContext,
    genesis::GenesisAppState,
    gov::SweepLimits,
    slashing::JailPolicy,
    staking::{
        BondStatus,
        GenesisStaking,
        GenesisValidator,
        StakingParams,
        Validator,
        POWER_REDUCTION,
    },
    transaction::{
        Message,
        Transaction,
        TxContext,
    },
};

pub(crate) const CHAIN_ID: &str = "occ-test-1";
pub(crate) const GENESIS_TIME: u64 = 1_700_000_000;
pub(crate) const BLOCK_INTERVAL_SECS: u64 = 5;
pub(crate) const GAS_LIMIT: u64 = 1_000_000;

pub(crate) fn address(n: u8) -> Address {
    Address::from_array([n; 20])
}

pub(crate) fn consensus_key(n: u8) -> [u8; 32] {
    [n; 32]
}

/// A bonded validator operated by `address(n)` whose shares equal its tokens.
pub(crate) fn validator(n: u8, tokens: u128) -> Validator {
    Validator {
        operator: address(n),
        consensus_key: consensus_key(n),
        tokens,
        delegator_shares: tokens,
        jailed: false,
        status: BondStatus::Bonded,
        commission_rate_bps: 0,
        min_self_delegation: 1,
        unbonding_height: 0,
        unbonding_completion_time: 0,
    }
}

pub(crate) fn tx_context() -> TxContext {
    TxContext {
        height: 1,
        time: GENESIS_TIME,
        min_gas_price: 0,
        max_tx_bytes: DEFAULT_MAX_TX_BYTES,
        max_msgs_per_tx: DEFAULT_MAX_MSGS_PER_TX,
    }
}

pub(crate) fn block_context(height: u64, time: u64) -> BlockContext<'static> {
    BlockContext {
        height,
        time,
        proposer_address: tendermint::account::Id::new([0; 20]),
        votes: &[],
        jail_policy: JailPolicy::default(),
        gov_sweep: SweepLimits::default(),
    }
}

pub(crate) fn genesis_validator(n: u8, self_delegation: u128) -> GenesisValidator {
    GenesisValidator {
        operator: address(n),
        consensus_key: consensus_key(n),
        self_delegation,
        commission_rate_bps: 500,
        min_self_delegation: 1,
    }
}

/// Three validators with ten units of power each, funded from genesis accounts that
/// keep a thousand units on top.
pub(crate) fn genesis() -> GenesisAppState {
    let accounts = (1..=3)
        .map(|n| GenesisAccount {
            address: address(n),
            balance: 1_010 * POWER_REDUCTION,
        })
        .collect();
    GenesisAppState {
        chain_id: CHAIN_ID.to_string(),
        genesis_time: GENESIS_TIME,
        min_gas_price: 0,
        accounts,
        staking: GenesisStaking {
            params: StakingParams::default(),
            validators: (1..=3)
                .map(|n| genesis_validator(n, 10 * POWER_REDUCTION))
                .collect(),
        },
        slashing: Default::default(),
        distribution: Default::default(),
        gov: Default::default(),
        authz: Default::default(),
    }
}

pub(crate) fn initialized_app(genesis: &GenesisAppState, config: AppConfig) -> App {
    let mut app = App::new(Storage::new(), config).unwrap();
    app.init_chain(genesis).unwrap();
    app
}

/// A block at `height` proposed by the first genesis validator, without a last commit.
pub(crate) fn block(height: u64, txs: Vec<Vec<u8>>) -> BlockData {
    BlockData {
        height,
        time: GENESIS_TIME + height * BLOCK_INTERVAL_SECS,
        proposer_address: consensus_address(&consensus_key(1)),
        decided_last_commit: Vec::new(),
        txs,
    }
}

pub(crate) fn vote(n: u8, power: u64, signed: bool) -> VoteInfo {
    VoteInfo {
        validator_address: consensus_address(&consensus_key(n)),
        power,
        signed,
    }
}

pub(crate) fn send(from: u8, to: u8, amount: u128) -> Message {
    Message::Send(MsgSend {
        from: address(from).to_string(),
        to: address(to).to_string(),
        denom: BOND_DENOM.to_string(),
        amount,
    })
}

/// An encoded transaction of `address(signer)` paying no fee.
pub(crate) fn signed_tx(signer: u8, nonce: u64, msgs: Vec<Message>) -> Vec<u8> {
    Transaction {
        signer: address(signer),
        nonce,
        gas_limit: GAS_LIMIT,
        fee: 0,
        msgs,
    }
    .to_bytes()
    .unwrap()
}

#[track_caller]
pub(crate) fn assert_error_contains(error: &eyre::Report, expected: &str) {
    let message = format!("{error:#}");
    assert!(
        message.contains(expected),
        "expected error to contain `{expected}`, got `{message}`"
    );
}

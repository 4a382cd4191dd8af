mod action_handler;
mod state_ext;
pub(crate) mod storage;
#[cfg(test)]
mod tests_app;
#[cfg(test)]
mod tests_governance;
#[cfg(test)]
mod tests_validator_lifecycle;

use eyre::{
    ensure,
    OptionExt as _,
    Result,
    WrapErr as _,
};
use occ_scheduler::{
    Scheduler,
    SchedulerConfig,
};
use occ_storage::{
    Changeset,
    MultiVersionStore,
    RootHash,
    Snapshot,
    StateDelta,
    StateWrite,
    Storage,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    instrument,
};

pub(crate) use self::action_handler::ActionHandler;
use self::state_ext::{
    StateReadExt as _,
    StateWriteExt as _,
};
use crate::{
    accounts::{
        component::AccountsComponent,
        DeferredCredits,
        ModuleAccount,
        BOND_DENOM,
    },
    authz::component::AuthzComponent,
    component::{
        BlockContext,
        Component as _,
    },
    distribution::component::DistributionComponent,
    genesis::GenesisAppState,
    gov::{
        component::GovComponent,
        SweepLimits,
    },
    slashing::{
        component::SlashingComponent,
        JailPolicy,
    },
    staking::{
        component::StakingComponent,
        StateReadExt as _,
        StateWriteExt as _,
        ValidatorUpdate,
    },
    transaction::{
        deliver_tx,
        TxContext,
        TxOutput,
        TxResult,
    },
};

/// The default cap on the encoded size of one transaction.
pub const DEFAULT_MAX_TX_BYTES: usize = 256 * 1024;
/// The default cap on the number of messages of one transaction, nested ones included.
pub const DEFAULT_MAX_MSGS_PER_TX: usize = 64;

/// One validator's entry in the commit of the previous block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub validator_address: tendermint::account::Id,
    pub power: u64,
    pub signed: bool,
}

/// A block decided by consensus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    pub height: u64,
    /// Unix seconds.
    pub time: u64,
    pub proposer_address: tendermint::account::Id,
    #[serde(default)]
    pub decided_last_commit: Vec<VoteInfo>,
    #[serde(default)]
    pub txs: Vec<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct InitChainResponse {
    pub validators: Vec<tendermint::validator::Update>,
    pub app_hash: RootHash,
}

#[derive(Clone, Debug)]
pub struct FinalizeBlockResponse {
    pub tx_results: Vec<TxResult>,
    pub validator_updates: Vec<tendermint::validator::Update>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub max_tx_bytes: usize,
    pub max_msgs_per_tx: usize,
    pub gov_sweep: SweepLimits,
    pub jail_policy: JailPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            max_tx_bytes: DEFAULT_MAX_TX_BYTES,
            max_msgs_per_tx: DEFAULT_MAX_MSGS_PER_TX,
            gov_sweep: SweepLimits::default(),
            jail_policy: JailPolicy::default(),
        }
    }
}

/// The application: executes decided blocks against [`Storage`].
///
/// A block is first finalized, which stages its changes, and then committed. Only one
/// block can be staged at a time.
pub struct App {
    storage: Storage,
    config: AppConfig,
    scheduler: Scheduler,
    // Changes of the finalized but not yet committed block.
    pending: Option<Changeset>,
    validator_updates: Vec<ValidatorUpdate>,
}

impl App {
    /// Builds the app on top of `storage`.
    ///
    /// # Errors
    /// Returns an error if the scheduler's worker pool could not be built.
    #[instrument(name = "App::new", skip_all, err)]
    pub fn new(storage: Storage, config: AppConfig) -> Result<Self> {
        let scheduler =
            Scheduler::new(config.scheduler.clone()).wrap_err("failed to build the scheduler")?;
        Ok(Self {
            storage,
            config,
            scheduler,
            pending: None,
            validator_updates: Vec::new(),
        })
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Writes the genesis state and commits it as the first version.
    ///
    /// # Errors
    /// Returns an error if the chain was already initialized or the genesis is invalid.
    #[instrument(name = "App::init_chain", skip_all, err)]
    pub fn init_chain(&mut self, genesis: &GenesisAppState) -> Result<InitChainResponse> {
        ensure!(
            self.storage.latest_version() == 0 && self.pending.is_none(),
            "chain was already initialized"
        );
        genesis.validate().wrap_err("invalid genesis")?;

        let mut state = StateDelta::new(self.storage.latest_snapshot());
        state.put_chain_id(genesis.chain_id.clone())?;
        state.put_min_gas_price(genesis.min_gas_price)?;
        state.put_block_height(0)?;
        state.put_block_time(genesis.genesis_time)?;

        AccountsComponent::init_chain(&mut state, genesis)
            .wrap_err("init_chain failed on AccountsComponent")?;
        StakingComponent::init_chain(&mut state, genesis)
            .wrap_err("init_chain failed on StakingComponent")?;
        SlashingComponent::init_chain(&mut state, genesis)
            .wrap_err("init_chain failed on SlashingComponent")?;
        DistributionComponent::init_chain(&mut state, genesis)
            .wrap_err("init_chain failed on DistributionComponent")?;
        GovComponent::init_chain(&mut state, genesis)
            .wrap_err("init_chain failed on GovComponent")?;
        AuthzComponent::init_chain(&mut state, genesis)
            .wrap_err("init_chain failed on AuthzComponent")?;

        let updates = state.get_block_validator_updates()?;
        state.clear_block_validator_updates();
        let validators = to_tendermint(&updates)?;
        self.validator_updates = updates;

        let app_hash = self.storage.commit(state.into_changeset());
        info!(
            chain_id = %genesis.chain_id,
            validators = validators.len(),
            %app_hash,
            "initialized chain"
        );
        Ok(InitChainResponse {
            validators,
            app_hash,
        })
    }

    /// Executes `block` and stages its changes for [`App::commit`].
    ///
    /// # Errors
    /// Returns an error if the block does not follow the last committed one, if a
    /// block is already staged, or if any begin or end block step fails. Failing
    /// transactions are reported in the response, not as an error.
    #[instrument(name = "App::finalize_block", skip_all, fields(height = block.height), err)]
    pub fn finalize_block(&mut self, block: &BlockData) -> Result<FinalizeBlockResponse> {
        ensure!(
            self.pending.is_none(),
            "the previous block was finalized but never committed"
        );
        let mut state = StateDelta::new(self.storage.latest_snapshot());
        state
            .get_chain_id()
            .wrap_err("chain was not initialized")?;
        let last_height = state.get_block_height()?;
        ensure!(
            Some(block.height) == last_height.checked_add(1),
            "expected block {}, got block {}",
            last_height.saturating_add(1),
            block.height,
        );
        let last_time = state.get_block_time()?;
        ensure!(
            block.time >= last_time,
            "block time {} is before the last block time {last_time}",
            block.time,
        );
        state.put_block_height(block.height)?;
        state.put_block_time(block.time)?;

        let context = BlockContext {
            height: block.height,
            time: block.time,
            proposer_address: block.proposer_address,
            votes: &block.decided_last_commit,
            jail_policy: self.config.jail_policy,
            gov_sweep: self.config.gov_sweep,
        };
        SlashingComponent::begin_block(&mut state, &context)
            .wrap_err("begin_block failed on SlashingComponent")?;
        DistributionComponent::begin_block(&mut state, &context)
            .wrap_err("begin_block failed on DistributionComponent")?;

        let tx_context = TxContext {
            height: block.height,
            time: block.time,
            min_gas_price: state.get_min_gas_price()?,
            max_tx_bytes: self.config.max_tx_bytes,
            max_msgs_per_tx: self.config.max_msgs_per_tx,
        };
        let outputs = self
            .execute_transactions(&mut state, &block.txs, &tx_context)
            .wrap_err("failed executing the block's transactions")?;

        let tx_results = settle_fees(&mut state, outputs)?;

        GovComponent::end_block(&mut state, &context)
            .wrap_err("end_block failed on GovComponent")?;
        StakingComponent::end_block(&mut state, &context)
            .wrap_err("end_block failed on StakingComponent")?;

        let updates = state.get_block_validator_updates()?;
        state.clear_block_validator_updates();
        let validator_updates = to_tendermint(&updates)?;
        self.validator_updates = updates;
        self.pending = Some(state.into_changeset());

        Ok(FinalizeBlockResponse {
            tx_results,
            validator_updates,
        })
    }

    /// Writes the staged block to storage and returns the new app hash.
    ///
    /// # Errors
    /// Returns an error if no block was finalized since the last commit.
    #[instrument(name = "App::commit", skip_all, err)]
    pub fn commit(&mut self) -> Result<RootHash> {
        let changes = self
            .pending
            .take()
            .ok_or_eyre("no finalized block to commit")?;
        let app_hash = self.storage.commit(changes);
        debug!(
            version = self.storage.latest_version(),
            %app_hash,
            "committed block"
        );
        Ok(app_hash)
    }

    /// Finalizes and commits `block` in one go.
    ///
    /// # Errors
    /// See [`App::finalize_block`] and [`App::commit`].
    pub fn process_block(&mut self, block: &BlockData) -> Result<(FinalizeBlockResponse, RootHash)> {
        let response = self.finalize_block(block)?;
        let app_hash = self.commit()?;
        Ok((response, app_hash))
    }

    /// The validator set changes of the most recent block or of genesis.
    ///
    /// # Errors
    /// Returns an error if an update cannot be expressed as a consensus update.
    pub fn validator_set_updates(&self) -> Result<Vec<tendermint::validator::Update>> {
        to_tendermint(&self.validator_updates)
    }

    /// Runs the block's transactions through the scheduler on top of `state` and
    /// writes their combined effect into it.
    #[instrument(name = "App::execute_transactions", skip_all, fields(txs = txs.len()), err)]
    fn execute_transactions(
        &self,
        state: &mut StateDelta<Snapshot>,
        txs: &[Vec<u8>],
        context: &TxContext,
    ) -> Result<Vec<TxOutput>> {
        if txs.is_empty() {
            return Ok(Vec::new());
        }
        let (outcome, changes) = {
            let store = MultiVersionStore::new(&*state);
            let outcome = self
                .scheduler
                .process_all(&store, txs.len(), |view| {
                    let index = view.index();
                    txs.get(index)
                        .map(|bytes| deliver_tx(view, bytes, context))
                })
                .wrap_err("scheduler failed")?;
            let changes = store
                .write_latest_to_store()
                .wrap_err("failed flushing the latest transaction writes")?;
            (outcome, changes)
        };
        changes.apply_to(state);

        let stats = &outcome.stats;
        info!(
            rounds = stats.rounds,
            executions = stats.executions,
            aborts = stats.aborts,
            invalidations = stats.invalidations,
            sequential_from = ?stats.sequential_from,
            "executed transactions"
        );
        outcome
            .outputs
            .into_iter()
            .map(|output| output.ok_or_eyre("scheduler executed an index outside the block"))
            .collect()
    }
}

/// Pays the fees of `outputs` into the fee collector in one write per denomination
/// and returns the transaction results.
///
/// The credits live only for this call, so a failure leaves nothing behind for the
/// next block.
fn settle_fees<S: StateWrite>(state: &mut S, outputs: Vec<TxOutput>) -> Result<Vec<TxResult>> {
    let fee_collector = ModuleAccount::FeeCollector.address();
    let mut credits = DeferredCredits::default();
    let mut tx_results = Vec::with_capacity(outputs.len());
    for output in outputs {
        credits.add(fee_collector, BOND_DENOM, output.fee_credit)?;
        tx_results.push(output.result);
    }
    credits
        .flush(state)
        .wrap_err("failed flushing deferred fee credits")?;
    Ok(tx_results)
}

fn to_tendermint(updates: &[ValidatorUpdate]) -> Result<Vec<tendermint::validator::Update>> {
    updates
        .iter()
        .map(ValidatorUpdate::to_tendermint)
        .collect::<Result<_>>()
        .wrap_err("failed converting validator updates")
}

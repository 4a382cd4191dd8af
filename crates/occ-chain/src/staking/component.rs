use eyre::{
    ensure,
    Result,
    WrapErr as _,
};
use occ_storage::StateWrite;
use tracing::instrument;

use super::{
    keeper,
    BondStatus,
    StateReadExt as _,
    StateWriteExt as _,
    Validator,
};
use crate::{
    component::{
        BlockContext,
        Component,
    },
    genesis::GenesisAppState,
    slashing::SlashingHooks,
};

#[derive(Default)]
pub(crate) struct StakingComponent;

impl Component for StakingComponent {
    type AppState = GenesisAppState;

    #[instrument(name = "StakingComponent::init_chain", skip_all, err)]
    fn init_chain<S: StateWrite>(mut state: S, app_state: &Self::AppState) -> Result<()> {
        let staking = &app_state.staking;
        staking.params.validate().wrap_err("invalid staking params")?;
        state.put_staking_params(staking.params.clone())?;
        for genesis in &staking.validators {
            ensure!(
                state.get_validator(&genesis.operator)?.is_none(),
                "duplicate genesis validator {}",
                genesis.operator
            );
            state.put_validator(&Validator {
                operator: genesis.operator,
                consensus_key: genesis.consensus_key,
                tokens: 0,
                delegator_shares: 0,
                jailed: false,
                status: BondStatus::Unbonded,
                commission_rate_bps: genesis.commission_rate_bps,
                min_self_delegation: genesis.min_self_delegation,
                unbonding_height: 0,
                unbonding_completion_time: 0,
            })?;
            keeper::delegate(
                &mut state,
                &genesis.operator,
                &genesis.operator,
                genesis.self_delegation,
            )
            .wrap_err_with(|| format!("failed self delegating genesis validator {}", genesis.operator))?;
        }
        let updates = keeper::apply_and_return_validator_set_updates(
            &mut state,
            &SlashingHooks,
            0,
            app_state.genesis_time,
        )
        .wrap_err("failed bonding genesis validators")?;
        state.put_block_validator_updates(updates)
    }

    #[instrument(name = "StakingComponent::end_block", skip_all, err)]
    fn end_block<S: StateWrite>(state: &mut S, block: &BlockContext<'_>) -> Result<()> {
        let updates = keeper::apply_and_return_validator_set_updates(
            state,
            &SlashingHooks,
            block.height,
            block.time,
        )?;
        keeper::unbond_all_mature_validators(state, &SlashingHooks, block.height, block.time)?;
        keeper::complete_mature_unbonding_delegations(state, block.time)?;
        state.put_block_validator_updates(updates)
    }
}

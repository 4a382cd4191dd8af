use eyre::{
    OptionExt as _,
    Result,
    WrapErr as _,
};
use occ_storage::StateWrite;
use tracing::{
    debug,
    instrument,
    warn,
};

use super::{
    DistributionParams,
    StateReadExt as _,
    StateWriteExt as _,
};
use crate::{
    accounts::{
        ModuleAccount,
        StateReadExt as _,
        StateWriteExt as _,
        BOND_DENOM,
    },
    app::VoteInfo,
    component::{
        BlockContext,
        Component,
    },
    genesis::GenesisAppState,
    staking::{
        StateReadExt as _,
        Validator,
    },
};

#[derive(Default)]
pub(crate) struct DistributionComponent;

impl Component for DistributionComponent {
    type AppState = GenesisAppState;

    #[instrument(name = "DistributionComponent::init_chain", skip_all, err)]
    fn init_chain<S: StateWrite>(mut state: S, app_state: &Self::AppState) -> Result<()> {
        let params = &app_state.distribution.params;
        params.validate().wrap_err("invalid distribution params")?;
        state.put_distribution_params(params.clone())
    }

    /// Hands the fees collected in the previous block to its proposer, the validators
    /// that voted on it, and the community pool.
    #[instrument(name = "DistributionComponent::begin_block", skip_all, err)]
    fn begin_block<S: StateWrite>(state: &mut S, block: &BlockContext<'_>) -> Result<()> {
        let previous_proposer = state.get_previous_proposer()?;
        state.put_previous_proposer(&block.proposer_address)?;

        let fee_collector = ModuleAccount::FeeCollector.address();
        let fees = state.get_account_balance(&fee_collector, BOND_DENOM)?;
        if fees == 0 {
            return Ok(());
        }
        state
            .transfer(
                &fee_collector,
                &ModuleAccount::Distribution.address(),
                BOND_DENOM,
                fees,
            )
            .wrap_err("failed moving collected fees to distribution")?;
        let params = state.get_distribution_params()?;
        allocate_fees(state, &params, fees, previous_proposer, block.votes)
    }
}

fn allocate_fees<S: StateWrite>(
    state: &mut S,
    params: &DistributionParams,
    fees: u128,
    previous_proposer: Option<tendermint::account::Id>,
    votes: &[VoteInfo],
) -> Result<()> {
    let total_power: u128 = votes.iter().map(|vote| u128::from(vote.power)).sum();
    if total_power == 0 {
        return state.add_to_community_pool(fees);
    }
    let signed_power: u128 = votes
        .iter()
        .filter(|vote| vote.signed)
        .map(|vote| u128::from(vote.power))
        .sum();

    let proposer_multiplier_bps = u128::from(params.base_proposer_reward_bps)
        + u128::from(params.bonus_proposer_reward_bps) * signed_power / total_power;
    let proposer_reward = share(fees, proposer_multiplier_bps)?;
    let mut remaining = fees;

    let proposer = match previous_proposer {
        Some(address) => validator_for(state, &address)?,
        None => None,
    };
    if let Some(proposer) = proposer {
        state.allocate_tokens_to_validator(
            &proposer.operator,
            proposer.commission_rate_bps,
            proposer_reward,
        )?;
        remaining = remaining
            .checked_sub(proposer_reward)
            .ok_or_eyre("proposer reward exceeds the collected fees")?;
    } else if proposer_reward > 0 {
        warn!(
            proposer = ?previous_proposer,
            proposer_reward,
            "previous proposer is unknown; its reward goes to the community pool"
        );
    }

    let voter_multiplier_bps = 10_000u128
        .saturating_sub(proposer_multiplier_bps)
        .saturating_sub(u128::from(params.community_tax_bps));
    let voter_pool = share(fees, voter_multiplier_bps)?;
    for vote in votes {
        let reward = voter_pool
            .checked_mul(u128::from(vote.power))
            .map(|product| product / total_power)
            .ok_or_eyre("voter reward overflows")?;
        let Some(validator) = validator_for(state, &vote.validator_address)? else {
            warn!(
                address = %vote.validator_address,
                reward,
                "voter is not a known validator; its reward goes to the community pool"
            );
            continue;
        };
        state.allocate_tokens_to_validator(
            &validator.operator,
            validator.commission_rate_bps,
            reward,
        )?;
        remaining = remaining
            .checked_sub(reward)
            .ok_or_eyre("allocated more than the collected fees")?;
    }

    debug!(fees, community_pool = remaining, "allocated fees");
    state.add_to_community_pool(remaining)
}

fn share(amount: u128, bps: u128) -> Result<u128> {
    amount
        .checked_mul(bps)
        .map(|product| product / 10_000)
        .ok_or_eyre("fee share overflows")
}

fn validator_for<S: StateWrite>(
    state: &S,
    address: &tendermint::account::Id,
) -> Result<Option<Validator>> {
    let Some(operator) = state.get_validator_by_consensus_address(address)? else {
        return Ok(None);
    };
    state.get_validator(&operator)
}

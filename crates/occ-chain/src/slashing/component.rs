use std::collections::{
    BTreeMap,
    BTreeSet,
};

use eyre::{
    bail,
    OptionExt as _,
    Result,
    WrapErr as _,
};
use itertools::Itertools as _;
use occ_storage::StateWrite;
use tracing::{
    debug,
    error,
    info,
    instrument,
    warn,
};

use super::{
    storage::keys,
    JailPolicy,
    SlashingParams,
    StateReadExt as _,
    StateWriteExt as _,
    ValidatorSigningInfo,
};
use crate::{
    address::Address,
    app::VoteInfo,
    component::{
        BlockContext,
        Component,
    },
    genesis::GenesisAppState,
    staking::{
        self,
        StateReadExt as _,
    },
    storage::{
        due_queue_keys,
        keys::parse_consensus_hex,
    },
};

#[derive(Default)]
pub(crate) struct SlashingComponent;

impl Component for SlashingComponent {
    type AppState = GenesisAppState;

    #[instrument(name = "SlashingComponent::init_chain", skip_all, err)]
    fn init_chain<S: StateWrite>(mut state: S, app_state: &Self::AppState) -> Result<()> {
        let slashing = &app_state.slashing;
        slashing.params.validate().wrap_err("invalid slashing params")?;
        state.put_slashing_params(slashing.params.clone())?;
        for genesis in &slashing.signing_infos {
            let mut info = ValidatorSigningInfo::new(&genesis.address, genesis.start_height);
            info.index_offset = genesis.index_offset;
            info.jailed_until = genesis.jailed_until;
            info.tombstoned = genesis.tombstoned;
            info.missed_blocks_counter = genesis.missed_blocks_counter;
            state.put_signing_info(info)?;
        }
        for missed in &slashing.missed_blocks {
            state
                .get_signing_info(&missed.address)?
                .ok_or_else(|| {
                    eyre::eyre!("missed blocks of {} have no signing info", missed.address)
                })?;
            for index in &missed.missed_indices {
                state.set_missed_block(&missed.address, *index, true)?;
            }
        }
        Ok(())
    }

    /// Tracks the liveness of every validator in the previous commit and jails those
    /// that missed too many blocks.
    ///
    /// The jail set is collected first and checked against the remaining voting power
    /// once, before anyone is jailed.
    #[instrument(name = "SlashingComponent::begin_block", skip_all, err)]
    fn begin_block<S: StateWrite>(state: &mut S, block: &BlockContext<'_>) -> Result<()> {
        let params = state.get_slashing_params()?;
        let mut seen = BTreeSet::new();
        let mut tentative = BTreeMap::new();
        for vote in block.votes {
            if !seen.insert(vote.validator_address) {
                warn!(
                    address = %vote.validator_address,
                    "consensus address voted more than once in the last commit; skipping repeat"
                );
                continue;
            }
            if let Some(candidate) = handle_signature(state, &params, vote, block.height)? {
                tentative.insert(candidate.operator, candidate);
            }
        }
        let tentative: Vec<_> = tentative.into_values().collect();
        for candidate in apply_jail_policy(state, tentative, block.jail_policy)? {
            jail_for_downtime(state, &params, &candidate, block.time)?;
        }
        purge_removed_signing_infos(state, block.height)
    }
}

#[derive(Debug)]
struct JailCandidate {
    operator: Address,
    consensus_address: tendermint::account::Id,
    power: u64,
}

fn handle_signature<S: StateWrite>(
    state: &mut S,
    params: &SlashingParams,
    vote: &VoteInfo,
    height: u64,
) -> Result<Option<JailCandidate>> {
    let address = vote.validator_address;
    let Some(operator) = state.get_validator_by_consensus_address(&address)? else {
        warn!(%address, "vote from unknown consensus address; skipping liveness tracking");
        return Ok(None);
    };
    let Some(validator) = state.get_validator(&operator)? else {
        warn!(%address, %operator, "consensus address maps to a missing validator; skipping");
        return Ok(None);
    };
    let mut info = if let Some(info) = state.get_signing_info(&address)? {
        info
    } else {
        warn!(%address, %operator, "validator has no signing info; starting one now");
        ValidatorSigningInfo::new(&address, height)
    };

    let index = info.index_offset % params.signed_blocks_window;
    info.index_offset = info
        .index_offset
        .checked_add(1)
        .ok_or_eyre("signing index overflows")?;
    let missed = !vote.signed;
    match (state.get_missed_block(&address, index)?, missed) {
        (false, true) => {
            state.set_missed_block(&address, index, true)?;
            info.missed_blocks_counter = info.missed_blocks_counter.saturating_add(1);
        }
        (true, false) => {
            state.set_missed_block(&address, index, false)?;
            info.missed_blocks_counter = info.missed_blocks_counter.saturating_sub(1);
        }
        _ => {}
    }
    if missed {
        debug!(
            %address,
            missed_blocks = info.missed_blocks_counter,
            "validator missed a block"
        );
    }

    let min_height = info.start_height.saturating_add(params.signed_blocks_window);
    let jail = missed
        && height > min_height
        && info.missed_blocks_counter > params.max_missed_blocks()
        && !validator.jailed
        && !info.tombstoned;
    state.put_signing_info(info)?;
    Ok(jail.then(|| JailCandidate {
        operator,
        consensus_address: address,
        power: validator.consensus_power(),
    }))
}

/// Decides which candidates are jailed so that the next validator set keeps power.
fn apply_jail_policy<S: StateWrite>(
    state: &S,
    candidates: Vec<JailCandidate>,
    policy: JailPolicy,
) -> Result<Vec<JailCandidate>> {
    if candidates.is_empty() || remaining_power(state, &candidates)? > 0 {
        return Ok(candidates);
    }
    match policy {
        JailPolicy::Halt => {
            error!(
                candidates = candidates.len(),
                "jailing every offline validator would leave no voting power"
            );
            bail!("jailing every offline validator would leave no voting power");
        }
        JailPolicy::KeepMarginal => {
            let mut spared_power: u64 = 0;
            let mut jailed = Vec::with_capacity(candidates.len());
            let strongest_first = candidates.into_iter().sorted_by(|a, b| {
                b.power
                    .cmp(&a.power)
                    .then_with(|| a.operator.cmp(&b.operator))
            });
            for candidate in strongest_first {
                if spared_power == 0 {
                    spared_power = spared_power.saturating_add(candidate.power);
                    warn!(
                        operator = %candidate.operator,
                        power = candidate.power,
                        "sparing offline validator from jail to keep the validator set powered"
                    );
                    continue;
                }
                jailed.push(candidate);
            }
            Ok(jailed)
        }
    }
}

/// The power of the next validator set if every candidate were jailed.
fn remaining_power<S: StateWrite>(state: &S, candidates: &[JailCandidate]) -> Result<u64> {
    let max_validators = usize::try_from(state.get_staking_params()?.max_validators)?;
    let mut remaining: u64 = 0;
    let mut counted = 0;
    for operator in state.get_power_index(max_validators.saturating_add(candidates.len()))? {
        if counted == max_validators {
            break;
        }
        if candidates.iter().any(|candidate| candidate.operator == operator) {
            continue;
        }
        let validator = state
            .get_validator(&operator)?
            .ok_or_else(|| eyre::eyre!("power index references missing validator {operator}"))?;
        remaining = remaining.saturating_add(validator.consensus_power());
        counted += 1;
    }
    Ok(remaining)
}

fn jail_for_downtime<S: StateWrite>(
    state: &mut S,
    params: &SlashingParams,
    candidate: &JailCandidate,
    time: u64,
) -> Result<()> {
    let slashed = staking::slash(state, &candidate.operator, params.slash_fraction_downtime_bps)?;
    staking::jail(state, &candidate.operator)?;

    let mut info = state
        .get_signing_info(&candidate.consensus_address)?
        .ok_or_eyre("signing info of jailed validator vanished")?;
    info.jailed_until = time.saturating_add(params.downtime_jail_duration_secs);
    info.missed_blocks_counter = 0;
    info.index_offset = 0;
    let jailed_until = info.jailed_until;
    state.put_signing_info(info)?;
    state.clear_missed_blocks(&candidate.consensus_address)?;
    info!(
        operator = %candidate.operator,
        slashed,
        jailed_until,
        "jailed validator for downtime"
    );
    Ok(())
}

fn purge_removed_signing_infos<S: StateWrite>(state: &mut S, height: u64) -> Result<()> {
    for (purge_height, address) in
        due_queue_keys(state, keys::PURGE_QUEUE_PREFIX, height, usize::MAX)?
    {
        let address = parse_consensus_hex(&address)?;
        state.delete_signing_info(&address)?;
        state.delete_signing_info_purge(purge_height, &address);
        debug!(%address, "purged signing info of removed validator");
    }
    Ok(())
}

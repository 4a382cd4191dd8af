//! Operations that touch several staking records at once.

use std::collections::BTreeSet;

use eyre::{
    bail,
    ensure,
    eyre,
    OptionExt as _,
    Result,
    WrapErr as _,
};
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
    BondStatus,
    StakingHooks,
    StateReadExt as _,
    StateWriteExt as _,
    UnbondingDelegation,
    UnbondingEntry,
    Validator,
    ValidatorUpdate,
};
use crate::{
    accounts::{
        ModuleAccount,
        StateWriteExt as _,
        BOND_DENOM,
    },
    address::Address,
    storage::{
        due_queue_keys,
        keys::parse_address_hex,
    },
};

/// Delegates `amount` tokens of `delegator` to `operator`, returning the issued shares.
#[instrument(skip_all, fields(%delegator, %operator, amount = amount), err)]
pub(crate) fn delegate<S: StateWrite>(
    state: &mut S,
    delegator: &Address,
    operator: &Address,
    amount: u128,
) -> Result<u128> {
    let mut validator = state
        .get_validator(operator)?
        .ok_or_else(|| eyre!("validator {operator} does not exist"))?;
    let shares = validator.shares_from_tokens(amount)?;
    ensure!(shares > 0, "delegation of {amount} would issue no shares");

    state
        .transfer(delegator, &validator.pool().address(), BOND_DENOM, amount)
        .wrap_err("failed moving delegated tokens into the pool")?;

    validator.tokens = validator
        .tokens
        .checked_add(amount)
        .ok_or_eyre("validator tokens overflow")?;
    validator.delegator_shares = validator
        .delegator_shares
        .checked_add(shares)
        .ok_or_eyre("validator shares overflow")?;
    state.put_validator(&validator)?;

    let total = state
        .get_delegation(delegator, operator)?
        .checked_add(shares)
        .ok_or_eyre("delegation shares overflow")?;
    state.put_delegation(delegator, operator, total)?;
    Ok(shares)
}

/// Starts unbonding `amount` tokens of `delegator` from `operator`.
///
/// Returns the time at which the tokens are paid out.
#[instrument(skip_all, fields(%delegator, %operator, amount = amount), err)]
pub(crate) fn undelegate<S: StateWrite, H: StakingHooks>(
    state: &mut S,
    hooks: &H,
    delegator: &Address,
    operator: &Address,
    amount: u128,
    height: u64,
    time: u64,
) -> Result<u64> {
    let params = state.get_staking_params()?;
    let mut validator = state
        .get_validator(operator)?
        .ok_or_else(|| eyre!("validator {operator} does not exist"))?;
    let delegated = state.get_delegation(delegator, operator)?;
    let shares = validator.shares_from_tokens(amount)?;
    ensure!(shares > 0, "undelegation of {amount} would remove no shares");
    ensure!(
        shares <= delegated,
        "undelegation of {shares} shares exceeds the delegation of {delegated} shares"
    );
    let tokens = validator.tokens_from_shares(shares)?;

    let remaining = delegated - shares;
    if remaining == 0 {
        hooks.before_delegation_removed(state, delegator, operator)?;
    }
    state.put_delegation(delegator, operator, remaining)?;

    let pool = validator.pool();
    validator.tokens = validator
        .tokens
        .checked_sub(tokens)
        .ok_or_eyre("validator tokens underflow")?;
    validator.delegator_shares = validator
        .delegator_shares
        .checked_sub(shares)
        .ok_or_eyre("validator shares underflow")?;
    if pool == ModuleAccount::BondedPool {
        state
            .transfer(
                &ModuleAccount::BondedPool.address(),
                &ModuleAccount::NotBondedPool.address(),
                BOND_DENOM,
                tokens,
            )
            .wrap_err("failed moving unbonded tokens out of the bonded pool")?;
    }
    if delegator == operator
        && !validator.jailed
        && validator.tokens_from_shares(remaining)? < validator.min_self_delegation
    {
        warn!(%operator, "self delegation fell below the minimum; jailing validator");
        validator.jailed = true;
    }
    state.put_validator(&validator)?;

    let completion_time = if validator.status == BondStatus::Unbonded {
        time
    } else {
        time.checked_add(params.unbonding_time_secs)
            .ok_or_eyre("unbonding completion time overflows")?
    };
    if tokens > 0 {
        let mut unbonding = state
            .get_unbonding_delegation(delegator, operator)?
            .unwrap_or_else(|| UnbondingDelegation {
                delegator: *delegator,
                validator: *operator,
                entries: Vec::new(),
            });
        unbonding.entries.push(UnbondingEntry {
            creation_height: height,
            completion_time,
            balance: tokens,
        });
        state.put_unbonding_delegation(unbonding)?;
        state.insert_unbonding_delegation_queue(completion_time, delegator, operator)?;
    }

    if validator.delegator_shares == 0 && validator.status == BondStatus::Unbonded {
        remove_validator(state, hooks, &validator, height)?;
    }
    Ok(completion_time)
}

pub(crate) fn jail<S: StateWrite>(state: &mut S, operator: &Address) -> Result<()> {
    let mut validator = state
        .get_validator(operator)?
        .ok_or_else(|| eyre!("validator {operator} does not exist"))?;
    ensure!(!validator.jailed, "validator {operator} is already jailed");
    validator.jailed = true;
    state.put_validator(&validator)
}

pub(crate) fn unjail<S: StateWrite>(state: &mut S, operator: &Address) -> Result<()> {
    let mut validator = state
        .get_validator(operator)?
        .ok_or_else(|| eyre!("validator {operator} does not exist"))?;
    ensure!(validator.jailed, "validator {operator} is not jailed");
    validator.jailed = false;
    state.put_validator(&validator)
}

/// Burns `fraction_bps` of the validator's tokens. Returns the burned amount.
pub(crate) fn slash<S: StateWrite>(
    state: &mut S,
    operator: &Address,
    fraction_bps: u64,
) -> Result<u128> {
    let mut validator = state
        .get_validator(operator)?
        .ok_or_else(|| eyre!("validator {operator} does not exist"))?;
    let amount = validator
        .tokens
        .checked_mul(u128::from(fraction_bps))
        .map(|product| product / 10_000)
        .ok_or_eyre("slash amount overflows")?;
    if amount == 0 {
        return Ok(0);
    }
    state
        .burn(&validator.pool().address(), BOND_DENOM, amount)
        .wrap_err("failed burning slashed tokens")?;
    validator.tokens = validator
        .tokens
        .checked_sub(amount)
        .ok_or_eyre("slash exceeds validator tokens")?;
    state.put_validator(&validator)?;
    Ok(amount)
}

/// Moves the top validators of the power index into the bonded set and diffs the
/// result against the last set.
///
/// # Errors
/// Refuses the transition if the new set would carry no voting power.
#[instrument(skip_all, err)]
pub(crate) fn apply_and_return_validator_set_updates<S: StateWrite, H: StakingHooks>(
    state: &mut S,
    hooks: &H,
    height: u64,
    time: u64,
) -> Result<Vec<ValidatorUpdate>> {
    let params = state.get_staking_params()?;
    let last = state.get_last_validator_powers()?;
    let candidates = state.get_power_index(usize::try_from(params.max_validators)?)?;

    let mut next = Vec::with_capacity(candidates.len());
    let mut total_power: u64 = 0;
    for operator in candidates {
        let validator = state
            .get_validator(&operator)?
            .ok_or_else(|| eyre!("power index references missing validator {operator}"))?;
        ensure!(
            validator.is_eligible(),
            "power index references ineligible validator {operator}"
        );
        let power = validator.consensus_power();
        total_power = total_power
            .checked_add(power)
            .ok_or_eyre("total validator power overflows")?;
        next.push((validator, power));
    }
    if total_power == 0 {
        error!(
            previous_set_size = last.len(),
            "validator set update would leave no voting power; refusing transition"
        );
        bail!("validator set update would leave no voting power");
    }

    let mut updates = Vec::new();
    let mut bonded = BTreeSet::new();
    for (mut validator, power) in next {
        if validator.status != BondStatus::Bonded {
            bond_validator(state, &mut validator)?;
            hooks.after_validator_bonded(
                state,
                &validator.consensus_address(),
                &validator.operator,
                height,
            )?;
        }
        if last.get(&validator.operator) != Some(&power) {
            updates.push(ValidatorUpdate {
                consensus_key: validator.consensus_key,
                power,
            });
            state.put_last_validator_power(&validator.operator, power)?;
        }
        bonded.insert(validator.operator);
    }

    for operator in last.keys().filter(|operator| !bonded.contains(*operator)) {
        let mut validator = state
            .get_validator(operator)?
            .ok_or_else(|| eyre!("last validator set references missing validator {operator}"))?;
        if validator.status == BondStatus::Bonded {
            begin_unbonding(state, &mut validator, height, time, params.unbonding_time_secs)?;
            hooks.after_validator_begin_unbonding(
                state,
                &validator.consensus_address(),
                operator,
                height,
            )?;
        }
        updates.push(ValidatorUpdate {
            consensus_key: validator.consensus_key,
            power: 0,
        });
        state.delete_last_validator_power(operator);
    }

    state.put_last_total_power(total_power)?;
    info!(
        bonded = bonded.len(),
        total_power,
        updates = updates.len(),
        "applied validator set updates"
    );
    Ok(updates)
}

fn bond_validator<S: StateWrite>(state: &mut S, validator: &mut Validator) -> Result<()> {
    if validator.status == BondStatus::Unbonding {
        state.delete_unbonding_validator_queue(validator);
    }
    state
        .transfer(
            &ModuleAccount::NotBondedPool.address(),
            &ModuleAccount::BondedPool.address(),
            BOND_DENOM,
            validator.tokens,
        )
        .wrap_err("failed moving validator tokens into the bonded pool")?;
    validator.status = BondStatus::Bonded;
    validator.unbonding_height = 0;
    validator.unbonding_completion_time = 0;
    state.put_validator(validator)?;
    debug!(
        operator = %validator.operator,
        consensus_key = %telemetry::display::base64(&validator.consensus_key),
        "bonded validator"
    );
    Ok(())
}

fn begin_unbonding<S: StateWrite>(
    state: &mut S,
    validator: &mut Validator,
    height: u64,
    time: u64,
    unbonding_time_secs: u64,
) -> Result<()> {
    state
        .transfer(
            &ModuleAccount::BondedPool.address(),
            &ModuleAccount::NotBondedPool.address(),
            BOND_DENOM,
            validator.tokens,
        )
        .wrap_err("failed moving validator tokens out of the bonded pool")?;
    validator.status = BondStatus::Unbonding;
    validator.unbonding_height = height;
    validator.unbonding_completion_time = time
        .checked_add(unbonding_time_secs)
        .ok_or_eyre("unbonding completion time overflows")?;
    state.put_validator(validator)?;
    state.insert_unbonding_validator_queue(validator)?;
    debug!(operator = %validator.operator, "validator began unbonding");
    Ok(())
}

fn remove_validator<S: StateWrite, H: StakingHooks>(
    state: &mut S,
    hooks: &H,
    validator: &Validator,
    height: u64,
) -> Result<()> {
    ensure!(
        validator.status == BondStatus::Unbonded,
        "cannot remove validator {} that is not unbonded",
        validator.operator
    );
    state.remove_validator(validator);
    hooks.after_validator_removed(
        state,
        &validator.consensus_address(),
        &validator.operator,
        height,
    )?;
    info!(operator = %validator.operator, height, "removed validator");
    Ok(())
}

/// Completes unbonding of every validator whose unbonding period ended.
#[instrument(skip_all, err)]
pub(crate) fn unbond_all_mature_validators<S: StateWrite, H: StakingHooks>(
    state: &mut S,
    hooks: &H,
    height: u64,
    time: u64,
) -> Result<()> {
    for (completion_time, operator) in
        due_queue_keys(state, keys::UNBONDING_QUEUE_PREFIX, time, usize::MAX)?
    {
        let operator = parse_address_hex(&operator)?;
        let Some(mut validator) = state.get_validator(&operator)? else {
            warn!(%operator, "unbonding queue references missing validator; dropping entry");
            state.delete(keys::unbonding_queue(completion_time, &operator).into_bytes());
            continue;
        };
        state.delete_unbonding_validator_queue(&validator);
        if validator.status != BondStatus::Unbonding {
            warn!(%operator, status = ?validator.status, "queued validator is not unbonding");
            continue;
        }
        validator.status = BondStatus::Unbonded;
        if validator.delegator_shares == 0 {
            remove_validator(state, hooks, &validator, height)?;
        } else {
            state.put_validator(&validator)?;
        }
    }
    Ok(())
}

/// Pays out every unbonding delegation entry that matured by `time`.
#[instrument(skip_all, err)]
pub(crate) fn complete_mature_unbonding_delegations<S: StateWrite>(
    state: &mut S,
    time: u64,
) -> Result<()> {
    for (completion_time, pair) in due_queue_keys(
        state,
        keys::UNBONDING_DELEGATION_QUEUE_PREFIX,
        time,
        usize::MAX,
    )? {
        let (delegator, validator) = pair
            .split_once('/')
            .ok_or_eyre("malformed unbonding delegation queue key")?;
        let delegator = parse_address_hex(delegator)?;
        let validator = parse_address_hex(validator)?;
        state.delete_unbonding_delegation_queue(completion_time, &delegator, &validator);

        let Some(mut unbonding) = state.get_unbonding_delegation(&delegator, &validator)? else {
            continue;
        };
        let (matured, pending): (Vec<_>, Vec<_>) = unbonding
            .entries
            .into_iter()
            .partition(|entry| entry.completion_time <= time);
        let payout = matured.iter().try_fold(0u128, |sum, entry| {
            sum.checked_add(entry.balance)
                .ok_or_eyre("unbonding payout overflows")
        })?;
        state
            .transfer(
                &ModuleAccount::NotBondedPool.address(),
                &delegator,
                BOND_DENOM,
                payout,
            )
            .wrap_err("failed paying out matured unbonding delegation")?;
        unbonding.entries = pending;
        state.put_unbonding_delegation(unbonding)?;
        debug!(%delegator, %validator, payout, "completed unbonding delegation");
    }
    Ok(())
}

use std::collections::BTreeMap;

use eyre::{
    eyre,
    Result,
    WrapErr as _,
};
use occ_storage::StateWrite;
use tracing::debug;

use super::StateWriteExt as _;
use crate::address::Address;

/// Credits to hot accounts that are summed outside of transaction execution.
///
/// Every transaction pays its fee into the fee collector. Writing that balance from
/// inside each transaction would make every pair of transactions conflict, so the
/// credits are collected from the final transaction outputs and written once per block.
#[derive(Debug, Default)]
pub(crate) struct DeferredCredits {
    credits: BTreeMap<(Address, String), u128>,
}

impl DeferredCredits {
    pub(crate) fn add(&mut self, to: Address, denom: &str, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.credits.entry((to, denom.to_string())).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| eyre!("deferred credit to {to} in {denom} overflows"))?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn total(&self, to: &Address, denom: &str) -> u128 {
        self.credits
            .get(&(*to, denom.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Writes every pending credit into `state`, leaving `self` empty.
    pub(crate) fn flush<S: StateWrite + ?Sized>(&mut self, state: &mut S) -> Result<()> {
        for ((to, denom), amount) in std::mem::take(&mut self.credits) {
            state
                .increase_balance(&to, &denom, amount)
                .wrap_err_with(|| format!("failed flushing deferred credit to {to}"))?;
            debug!(%to, %denom, amount, "flushed deferred credit");
        }
        Ok(())
    }
}

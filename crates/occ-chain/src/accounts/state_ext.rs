use eyre::{
    eyre,
    Result,
    WrapErr as _,
};
use occ_storage::{
    StateRead,
    StateWrite,
};
use tracing::instrument;

use super::storage::{
    self,
    keys,
};
use crate::{
    address::Address,
    storage::{
        delete,
        get,
        prefix_values,
        put,
    },
};

pub(crate) trait StateReadExt: StateRead {
    #[instrument(skip_all, fields(%address, denom = denom), err)]
    fn get_account_balance(&self, address: &Address, denom: &str) -> Result<u128> {
        get::<_, storage::Balance>(self, &keys::balance(address, denom))
            .map(|balance| balance.map_or(0, u128::from))
            .wrap_err("failed reading account balance from state")
    }

    /// All non-zero balances of `address`, ordered by denom.
    fn get_account_balances(&self, address: &Address) -> Result<Vec<(String, u128)>> {
        prefix_values::<_, storage::Balance>(self, &keys::balance_prefix(address), usize::MAX)
            .map(|balances| {
                balances
                    .into_iter()
                    .map(|(denom, balance)| (denom, u128::from(balance)))
                    .collect()
            })
            .wrap_err("failed reading account balances from state")
    }

    #[instrument(skip_all, fields(%address), err)]
    fn get_account_nonce(&self, address: &Address) -> Result<u64> {
        get::<_, storage::Nonce>(self, &keys::nonce(address))
            .map(|nonce| nonce.map_or(0, u64::from))
            .wrap_err("failed reading account nonce from state")
    }

    fn get_supply(&self, denom: &str) -> Result<u128> {
        get::<_, storage::Balance>(self, &keys::supply(denom))
            .map(|supply| supply.map_or(0, u128::from))
            .wrap_err("failed reading supply from state")
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

pub(crate) trait StateWriteExt: StateWrite {
    fn put_account_balance(&mut self, address: &Address, denom: &str, balance: u128) -> Result<()> {
        let key = keys::balance(address, denom);
        if balance == 0 {
            delete(self, key);
            return Ok(());
        }
        put(self, key, storage::Balance::from(balance))
    }

    fn increase_balance(&mut self, address: &Address, denom: &str, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self
            .get_account_balance(address, denom)?
            .checked_add(amount)
            .ok_or_else(|| eyre!("balance of {address} in {denom} overflows"))?;
        self.put_account_balance(address, denom, balance)
    }

    fn decrease_balance(&mut self, address: &Address, denom: &str, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.get_account_balance(address, denom)?;
        let remaining = balance.checked_sub(amount).ok_or_else(|| {
            eyre!("insufficient funds: {address} holds {balance}{denom}, needs {amount}{denom}")
        })?;
        self.put_account_balance(address, denom, remaining)
    }

    #[instrument(skip_all, fields(%from, %to, denom = denom, amount = amount), err)]
    fn transfer(&mut self, from: &Address, to: &Address, denom: &str, amount: u128) -> Result<()> {
        self.decrease_balance(from, denom, amount)
            .wrap_err("failed debiting sender")?;
        self.increase_balance(to, denom, amount)
            .wrap_err("failed crediting recipient")
    }

    fn put_account_nonce(&mut self, address: &Address, nonce: u64) -> Result<()> {
        put(self, keys::nonce(address), storage::Nonce::from(nonce))
    }

    /// Creates `amount` new tokens in the account of `to`.
    fn mint(&mut self, to: &Address, denom: &str, amount: u128) -> Result<()> {
        let supply = self
            .get_supply(denom)?
            .checked_add(amount)
            .ok_or_else(|| eyre!("supply of {denom} overflows"))?;
        self.increase_balance(to, denom, amount)?;
        put(self, keys::supply(denom), storage::Balance::from(supply))
    }

    /// Destroys `amount` tokens held by `from`.
    fn burn(&mut self, from: &Address, denom: &str, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.decrease_balance(from, denom, amount)
            .wrap_err("failed burning tokens")?;
        let supply = self
            .get_supply(denom)?
            .checked_sub(amount)
            .ok_or_else(|| eyre!("burning {amount}{denom} exceeds the supply"))?;
        put(self, keys::supply(denom), storage::Balance::from(supply))
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}

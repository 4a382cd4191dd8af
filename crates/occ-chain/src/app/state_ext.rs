use eyre::{
    OptionExt as _,
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
use crate::storage::{
    get,
    put,
};

pub(crate) trait StateReadExt: StateRead {
    #[instrument(skip_all, err)]
    fn get_chain_id(&self) -> Result<String> {
        get::<_, storage::ChainId>(self, keys::CHAIN_ID)
            .wrap_err("failed reading chain id from state")?
            .map(|chain_id| chain_id.0)
            .ok_or_eyre("chain id not found in state")
    }

    /// The height of the last finalized block, `0` before the first one.
    fn get_block_height(&self) -> Result<u64> {
        get::<_, storage::BlockHeight>(self, keys::BLOCK_HEIGHT)
            .map(|height| height.map_or(0, |height| height.0))
            .wrap_err("failed reading block height from state")
    }

    fn get_block_time(&self) -> Result<u64> {
        get::<_, storage::BlockTime>(self, keys::BLOCK_TIME)
            .map(|time| time.map_or(0, |time| time.0))
            .wrap_err("failed reading block time from state")
    }

    fn get_min_gas_price(&self) -> Result<u128> {
        get::<_, storage::MinGasPrice>(self, keys::MIN_GAS_PRICE)
            .wrap_err("failed reading min gas price from state")?
            .map(|price| price.0)
            .ok_or_eyre("min gas price not found in state")
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

pub(crate) trait StateWriteExt: StateWrite {
    fn put_chain_id(&mut self, chain_id: String) -> Result<()> {
        put(self, keys::CHAIN_ID.to_string(), storage::ChainId(chain_id))
    }

    fn put_block_height(&mut self, height: u64) -> Result<()> {
        put(self, keys::BLOCK_HEIGHT.to_string(), storage::BlockHeight(height))
    }

    fn put_block_time(&mut self, time: u64) -> Result<()> {
        put(self, keys::BLOCK_TIME.to_string(), storage::BlockTime(time))
    }

    fn put_min_gas_price(&mut self, price: u128) -> Result<()> {
        put(self, keys::MIN_GAS_PRICE.to_string(), storage::MinGasPrice(price))
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}

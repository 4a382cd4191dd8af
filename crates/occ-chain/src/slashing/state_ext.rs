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

use super::{
    storage::keys,
    SlashingParams,
    ValidatorSigningInfo,
};
use crate::storage::{
    delete,
    get,
    keys::Sortable,
    prefix_keys,
    put,
};

pub(crate) trait StateReadExt: StateRead {
    #[instrument(skip_all, err)]
    fn get_slashing_params(&self) -> Result<SlashingParams> {
        get::<_, SlashingParams>(self, keys::PARAMS)
            .wrap_err("failed reading slashing params from state")?
            .ok_or_eyre("slashing params not found in state")
    }

    #[instrument(skip_all, fields(%address), err)]
    fn get_signing_info(
        &self,
        address: &tendermint::account::Id,
    ) -> Result<Option<ValidatorSigningInfo>> {
        get(self, &keys::signing_info(address)).wrap_err("failed reading signing info from state")
    }

    fn get_missed_block(&self, address: &tendermint::account::Id, index: u64) -> Result<bool> {
        get::<_, ()>(self, &keys::missed_block(address, index))
            .map(|bit| bit.is_some())
            .wrap_err("failed reading missed block bit from state")
    }

    /// The window indices at which `address` missed a block, ascending.
    fn get_missed_block_indices(&self, address: &tendermint::account::Id) -> Result<Vec<u64>> {
        prefix_keys(self, &keys::missed_blocks_prefix(address), usize::MAX)
            .wrap_err("failed reading missed blocks from state")?
            .iter()
            .map(|index| Sortable::parse(index))
            .collect()
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

pub(crate) trait StateWriteExt: StateWrite {
    fn put_slashing_params(&mut self, params: SlashingParams) -> Result<()> {
        put(self, keys::PARAMS.to_string(), params)
    }

    fn put_signing_info(&mut self, info: ValidatorSigningInfo) -> Result<()> {
        put(self, keys::signing_info(&info.consensus_address()), info)
    }

    fn set_missed_block(
        &mut self,
        address: &tendermint::account::Id,
        index: u64,
        missed: bool,
    ) -> Result<()> {
        let key = keys::missed_block(address, index);
        if missed {
            put(self, key, ())
        } else {
            delete(self, key);
            Ok(())
        }
    }

    fn clear_missed_blocks(&mut self, address: &tendermint::account::Id) -> Result<()> {
        for index in self.get_missed_block_indices(address)? {
            delete(self, keys::missed_block(address, index));
        }
        Ok(())
    }

    /// Deletes the signing info of `address` and its missed-block history.
    fn delete_signing_info(&mut self, address: &tendermint::account::Id) -> Result<()> {
        self.clear_missed_blocks(address)?;
        delete(self, keys::signing_info(address));
        Ok(())
    }

    fn schedule_signing_info_purge(
        &mut self,
        height: u64,
        address: &tendermint::account::Id,
    ) -> Result<()> {
        put(self, keys::purge_queue(height, address), ())
    }

    fn delete_signing_info_purge(&mut self, height: u64, address: &tendermint::account::Id) {
        delete(self, keys::purge_queue(height, address));
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}

#[cfg(test)]
mod tests {
    use occ_storage::{
        StateDelta,
        Storage,
    };

    use super::*;

    fn address() -> tendermint::account::Id {
        tendermint::account::Id::new([7; 20])
    }

    #[test]
    fn missed_bits_are_set_and_cleared() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.set_missed_block(&address(), 3, true).unwrap();
        state.set_missed_block(&address(), 1, true).unwrap();
        assert!(state.get_missed_block(&address(), 3).unwrap());
        assert!(!state.get_missed_block(&address(), 2).unwrap());
        assert_eq!(vec![1, 3], state.get_missed_block_indices(&address()).unwrap());

        state.set_missed_block(&address(), 3, false).unwrap();
        assert_eq!(vec![1], state.get_missed_block_indices(&address()).unwrap());
    }

    #[test]
    fn deleting_signing_info_drops_history() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state
            .put_signing_info(ValidatorSigningInfo::new(&address(), 4))
            .unwrap();
        state.set_missed_block(&address(), 0, true).unwrap();
        state.delete_signing_info(&address()).unwrap();
        assert!(state.get_signing_info(&address()).unwrap().is_none());
        assert!(state.get_missed_block_indices(&address()).unwrap().is_empty());
    }
}

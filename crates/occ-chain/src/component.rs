use eyre::Result;
use occ_storage::StateWrite;

use crate::{
    app::VoteInfo,
    gov::SweepLimits,
    slashing::JailPolicy,
};

/// What a component learns about the block being finalized.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BlockContext<'a> {
    pub(crate) height: u64,
    /// Unix seconds.
    pub(crate) time: u64,
    pub(crate) proposer_address: tendermint::account::Id,
    /// The votes of the previous block's commit.
    pub(crate) votes: &'a [VoteInfo],
    pub(crate) jail_policy: JailPolicy,
    pub(crate) gov_sweep: SweepLimits,
}

/// A piece of the application that hooks into the block lifecycle.
pub(crate) trait Component {
    type AppState;

    /// Writes the component's part of the genesis state.
    fn init_chain<S: StateWrite>(state: S, app_state: &Self::AppState) -> Result<()>;

    /// Runs before any transaction of the block.
    fn begin_block<S: StateWrite>(_state: &mut S, _block: &BlockContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Runs after every transaction of the block, once deferred credits were flushed.
    fn end_block<S: StateWrite>(_state: &mut S, _block: &BlockContext<'_>) -> Result<()> {
        Ok(())
    }
}

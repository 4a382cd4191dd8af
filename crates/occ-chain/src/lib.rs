//! A Cosmos-style chain whose block transactions execute in parallel with optimistic
//! concurrency control.
//!
//! [`App`] drives the block lifecycle: downtime tracking and fee distribution run at
//! the start of a block, the transactions run through [`occ_scheduler::Scheduler`] on
//! top of a [`occ_storage::MultiVersionStore`], and governance and staking close the
//! block.

pub mod accounts;
pub mod address;
mod app;
pub mod authz;
pub(crate) mod component;
pub mod config;
pub mod distribution;
pub mod genesis;
pub mod gov;
pub mod slashing;
pub mod staking;
pub(crate) mod storage;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod transaction;

pub use app::{
    App,
    AppConfig,
    BlockData,
    FinalizeBlockResponse,
    InitChainResponse,
    VoteInfo,
    DEFAULT_MAX_MSGS_PER_TX,
    DEFAULT_MAX_TX_BYTES,
};
pub use config::Config;
pub use genesis::GenesisAppState;
pub use transaction::{
    Message,
    Transaction,
    TxCode,
    TxResult,
};

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};

use crate::storage::impl_stored_value;

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    ChainId(ChainId),
    BlockHeight(BlockHeight),
    BlockTime(BlockTime),
    MinGasPrice(MinGasPrice),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::app) struct ChainId(pub(in crate::app) String);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::app) struct BlockHeight(pub(in crate::app) u64);

/// Unix seconds.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::app) struct BlockTime(pub(in crate::app) u64);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::app) struct MinGasPrice(pub(in crate::app) u128);

impl_stored_value!(App, Value, ValueImpl {
    ChainId(ChainId) => "chain id",
    BlockHeight(BlockHeight) => "block height",
    BlockTime(BlockTime) => "block time",
    MinGasPrice(MinGasPrice) => "min gas price",
});

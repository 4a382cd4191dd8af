pub(in crate::app) const CHAIN_ID: &str = "app/chain_id";
pub(in crate::app) const BLOCK_HEIGHT: &str = "app/block_height";
pub(in crate::app) const BLOCK_TIME: &str = "app/block_time";
pub(in crate::app) const MIN_GAS_PRICE: &str = "app/min_gas_price";

use crate::{
    address::Address,
    storage::keys::AccountPrefixer,
};

const COMPONENT_PREFIX: &str = "accounts/";
const BALANCE_PREFIX: &str = "balance/";
const NONCE: &str = "nonce";
const SUPPLY_PREFIX: &str = "accounts/supply/";

/// Example: `accounts/0101....0101/balance/usei`.
///                   |40 hex chars|
pub(in crate::accounts) fn balance(address: &Address, denom: &str) -> String {
    format!(
        "{}/{BALANCE_PREFIX}{denom}",
        AccountPrefixer::new(COMPONENT_PREFIX, address)
    )
}

/// Example: `accounts/0101....0101/balance/`.
pub(in crate::accounts) fn balance_prefix(address: &Address) -> String {
    format!(
        "{}/{BALANCE_PREFIX}",
        AccountPrefixer::new(COMPONENT_PREFIX, address)
    )
}

/// Example: `accounts/0101....0101/nonce`.
pub(in crate::accounts) fn nonce(address: &Address) -> String {
    format!(
        "{}/{NONCE}",
        AccountPrefixer::new(COMPONENT_PREFIX, address)
    )
}

pub(in crate::accounts) fn supply(denom: &str) -> String {
    format!("{SUPPLY_PREFIX}{denom}")
}

//! Balances, nonces, module accounts and transfers.

pub(crate) mod action;
pub(crate) mod component;
mod deferred;
mod state_ext;
pub(crate) mod storage;

use serde::{
    Deserialize,
    Serialize,
};

pub use self::action::MsgSend;
pub(crate) use self::{
    deferred::DeferredCredits,
    state_ext::{
        StateReadExt,
        StateWriteExt,
    },
};
use crate::address::Address;

/// The staking and fee denomination.
pub const BOND_DENOM: &str = "usei";

/// Accounts owned by the chain itself rather than by a key holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleAccount {
    FeeCollector,
    BondedPool,
    NotBondedPool,
    Distribution,
    Gov,
}

impl ModuleAccount {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FeeCollector => "fee_collector",
            Self::BondedPool => "bonded_pool",
            Self::NotBondedPool => "not_bonded_pool",
            Self::Distribution => "distribution",
            Self::Gov => "gov",
        }
    }

    #[must_use]
    pub fn address(self) -> Address {
        Address::module(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisAccount {
    pub address: Address,
    pub balance: u128,
}

pub(crate) fn validate_denom(denom: &str) -> Result<(), String> {
    if denom.is_empty() || denom.len() > 64 {
        return Err(format!("denom must be 1 to 64 characters, got {}", denom.len()));
    }
    if !denom
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '/')
    {
        return Err(format!("denom `{denom}` contains invalid characters"));
    }
    Ok(())
}

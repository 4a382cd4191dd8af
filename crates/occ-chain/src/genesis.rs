//! The initial state of a chain, read from JSON.

use std::collections::BTreeSet;

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    accounts::GenesisAccount,
    address::Address,
    authz::GenesisAuthz,
    distribution::GenesisDistribution,
    gov::GenesisGov,
    slashing::GenesisSlashing,
    staking::GenesisStaking,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisAppState {
    pub chain_id: String,
    /// Unix seconds.
    pub genesis_time: u64,
    #[serde(default)]
    pub min_gas_price: u128,
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    pub staking: GenesisStaking,
    #[serde(default)]
    pub slashing: GenesisSlashing,
    #[serde(default)]
    pub distribution: GenesisDistribution,
    #[serde(default)]
    pub gov: GenesisGov,
    #[serde(default)]
    pub authz: GenesisAuthz,
}

impl GenesisAppState {
    /// Checks the parts of the genesis that can be checked without building state.
    ///
    /// # Errors
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), GenesisError> {
        if self.chain_id.trim().is_empty() {
            return Err(GenesisError::EmptyChainId);
        }
        let mut accounts = BTreeSet::new();
        for account in &self.accounts {
            if !accounts.insert(account.address) {
                return Err(GenesisError::DuplicateAccount(account.address));
            }
        }
        if self.staking.validators.is_empty() {
            return Err(GenesisError::NoValidators);
        }
        let signing_infos: BTreeSet<_> = self
            .slashing
            .signing_infos
            .iter()
            .map(|info| info.address)
            .collect();
        if let Some(missed) = self
            .slashing
            .missed_blocks
            .iter()
            .find(|missed| !signing_infos.contains(&missed.address))
        {
            return Err(GenesisError::MissedBlocksWithoutSigningInfo(missed.address));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("chain id must not be empty")]
    EmptyChainId,
    #[error("account {0} is listed more than once")]
    DuplicateAccount(Address),
    #[error("genesis must contain at least one validator")]
    NoValidators,
    #[error("validator {0} has missed blocks but no signing info")]
    MissedBlocksWithoutSigningInfo(tendermint::account::Id),
}

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    Result,
    WrapErr as _,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) enum StoredValue {
    Unit,
    Accounts(crate::accounts::storage::Value),
    Staking(crate::staking::storage::Value),
    Slashing(crate::slashing::storage::Value),
    Distribution(crate::distribution::storage::Value),
    Gov(crate::gov::storage::Value),
    Authz(crate::authz::storage::Value),
    App(crate::app::storage::Value),
}

impl StoredValue {
    pub(crate) fn serialize(&self) -> Result<Vec<u8>> {
        borsh::to_vec(&self).wrap_err("failed to serialize stored value")
    }

    pub(crate) fn deserialize(bytes: &[u8]) -> Result<Self> {
        borsh::from_slice(bytes).wrap_err("failed to deserialize stored value")
    }
}

impl TryFrom<StoredValue> for () {
    type Error = eyre::Report;

    fn try_from(value: StoredValue) -> Result<Self> {
        let StoredValue::Unit = value else {
            eyre::bail!("stored value type mismatch: expected unit, found {value:?}");
        };
        Ok(())
    }
}

impl From<()> for StoredValue {
    fn from((): ()) -> Self {
        StoredValue::Unit
    }
}

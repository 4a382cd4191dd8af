use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::bail;

use crate::storage::StoredValue;

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Balance(Balance),
    Nonce(Nonce),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::accounts) struct Balance(u128);

impl From<u128> for Balance {
    fn from(balance: u128) -> Self {
        Balance(balance)
    }
}

impl From<Balance> for u128 {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl From<Balance> for StoredValue {
    fn from(balance: Balance) -> Self {
        StoredValue::Accounts(Value(ValueImpl::Balance(balance)))
    }
}

impl TryFrom<StoredValue> for Balance {
    type Error = eyre::Report;

    fn try_from(value: StoredValue) -> Result<Self, Self::Error> {
        let StoredValue::Accounts(Value(ValueImpl::Balance(balance))) = value else {
            bail!("accounts stored value type mismatch: expected balance, found {value:?}");
        };
        Ok(balance)
    }
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::accounts) struct Nonce(u64);

impl From<u64> for Nonce {
    fn from(nonce: u64) -> Self {
        Nonce(nonce)
    }
}

impl From<Nonce> for u64 {
    fn from(nonce: Nonce) -> Self {
        nonce.0
    }
}

impl From<Nonce> for StoredValue {
    fn from(nonce: Nonce) -> Self {
        StoredValue::Accounts(Value(ValueImpl::Nonce(nonce)))
    }
}

impl TryFrom<StoredValue> for Nonce {
    type Error = eyre::Report;

    fn try_from(value: StoredValue) -> Result<Self, Self::Error> {
        let StoredValue::Accounts(Value(ValueImpl::Nonce(nonce))) = value else {
            bail!("accounts stored value type mismatch: expected nonce, found {value:?}");
        };
        Ok(nonce)
    }
}

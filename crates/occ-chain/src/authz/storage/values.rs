use borsh::{
    BorshDeserialize,
    BorshSerialize,
};

use crate::{
    authz::Grant,
    storage::impl_stored_value,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Grant(Grant),
}

impl_stored_value!(Authz, Value, ValueImpl {
    Grant(Grant) => "grant",
});

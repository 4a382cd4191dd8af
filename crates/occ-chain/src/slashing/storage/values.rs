use borsh::{
    BorshDeserialize,
    BorshSerialize,
};

use crate::{
    slashing::{
        SlashingParams,
        ValidatorSigningInfo,
    },
    storage::impl_stored_value,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Params(SlashingParams),
    SigningInfo(ValidatorSigningInfo),
}

impl_stored_value!(Slashing, Value, ValueImpl {
    Params(SlashingParams) => "params",
    SigningInfo(ValidatorSigningInfo) => "signing info",
});

//! Letting one account act on behalf of another.

pub(crate) mod action;
pub(crate) mod component;
mod state_ext;
pub(crate) mod storage;

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::address::Address;

pub use self::action::{
    MsgExec,
    MsgGrant,
    MsgRevoke,
};
pub(crate) use self::state_ext::{
    StateReadExt,
    StateWriteExt,
};

/// How many envelopes may be nested inside each other.
pub const MAX_EXEC_DEPTH: usize = 2;

/// Permission for a grantee to execute one message type on behalf of a granter.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Grant {
    /// Unix seconds after which the grant no longer applies. `None` never expires.
    pub expiration: Option<u64>,
}

impl Grant {
    #[must_use]
    pub fn is_expired(&self, time: u64) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= time)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisGrant {
    pub granter: Address,
    pub grantee: Address,
    pub msg_type_url: String,
    #[serde(default)]
    pub expiration: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisAuthz {
    #[serde(default)]
    pub grants: Vec<GenesisGrant>,
}

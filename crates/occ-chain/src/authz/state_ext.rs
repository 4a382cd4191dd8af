use eyre::{
    Result,
    WrapErr as _,
};
use occ_storage::{
    StateRead,
    StateWrite,
};

use super::{
    storage::keys,
    Grant,
};
use crate::{
    address::Address,
    storage::{
        delete,
        get,
        put,
    },
};

pub(crate) trait StateReadExt: StateRead {
    fn get_grant(
        &self,
        granter: &Address,
        grantee: &Address,
        type_url: &str,
    ) -> Result<Option<Grant>> {
        get(self, &keys::grant(granter, grantee, type_url))
            .wrap_err("failed reading grant from state")
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

pub(crate) trait StateWriteExt: StateWrite {
    fn put_grant(
        &mut self,
        granter: &Address,
        grantee: &Address,
        type_url: &str,
        grant: Grant,
    ) -> Result<()> {
        put(self, keys::grant(granter, grantee, type_url), grant)
    }

    fn delete_grant(&mut self, granter: &Address, grantee: &Address, type_url: &str) {
        delete(self, keys::grant(granter, grantee, type_url));
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}

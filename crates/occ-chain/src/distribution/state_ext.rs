use eyre::{
    eyre,
    OptionExt as _,
    Result,
    WrapErr as _,
};
use occ_storage::{
    StateRead,
    StateWrite,
};
use tracing::instrument;

use super::{
    storage::{
        self,
        keys,
    },
    DistributionParams,
};
use crate::{
    address::Address,
    storage::{
        get,
        put,
    },
};

pub(crate) trait StateReadExt: StateRead {
    #[instrument(skip_all, err)]
    fn get_distribution_params(&self) -> Result<DistributionParams> {
        get::<_, DistributionParams>(self, keys::PARAMS)
            .wrap_err("failed reading distribution params from state")?
            .ok_or_eyre("distribution params not found in state")
    }

    fn get_community_pool(&self) -> Result<u128> {
        get::<_, storage::Amount>(self, keys::COMMUNITY_POOL)
            .map(|amount| amount.map_or(0, |amount| amount.0))
            .wrap_err("failed reading community pool from state")
    }

    fn get_outstanding_rewards(&self, operator: &Address) -> Result<u128> {
        get::<_, storage::Amount>(self, &keys::outstanding_rewards(operator))
            .map(|amount| amount.map_or(0, |amount| amount.0))
            .wrap_err("failed reading outstanding rewards from state")
    }

    fn get_commission(&self, operator: &Address) -> Result<u128> {
        get::<_, storage::Amount>(self, &keys::commission(operator))
            .map(|amount| amount.map_or(0, |amount| amount.0))
            .wrap_err("failed reading commission from state")
    }

    fn get_previous_proposer(&self) -> Result<Option<tendermint::account::Id>> {
        get::<_, storage::Proposer>(self, keys::PREVIOUS_PROPOSER)
            .map(|proposer| proposer.map(|proposer| tendermint::account::Id::new(proposer.0)))
            .wrap_err("failed reading previous proposer from state")
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

pub(crate) trait StateWriteExt: StateWrite {
    fn put_distribution_params(&mut self, params: DistributionParams) -> Result<()> {
        put(self, keys::PARAMS.to_string(), params)
    }

    fn add_to_community_pool(&mut self, amount: u128) -> Result<()> {
        let pool = self
            .get_community_pool()?
            .checked_add(amount)
            .ok_or_eyre("community pool overflows")?;
        put(self, keys::COMMUNITY_POOL.to_string(), storage::Amount(pool))
    }

    /// Credits `amount` to `operator`, of which `commission_rate_bps` is its commission.
    fn allocate_tokens_to_validator(
        &mut self,
        operator: &Address,
        commission_rate_bps: u16,
        amount: u128,
    ) -> Result<()> {
        let commission = amount
            .checked_mul(u128::from(commission_rate_bps))
            .map(|product| product / 10_000)
            .ok_or_eyre("commission overflows")?;
        let total_commission = self
            .get_commission(operator)?
            .checked_add(commission)
            .ok_or_else(|| eyre!("commission of {operator} overflows"))?;
        put(
            self,
            keys::commission(operator),
            storage::Amount(total_commission),
        )?;
        let outstanding = self
            .get_outstanding_rewards(operator)?
            .checked_add(amount)
            .ok_or_else(|| eyre!("outstanding rewards of {operator} overflow"))?;
        put(
            self,
            keys::outstanding_rewards(operator),
            storage::Amount(outstanding),
        )
    }

    fn put_previous_proposer(&mut self, proposer: &tendermint::account::Id) -> Result<()> {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(proposer.as_bytes());
        put(
            self,
            keys::PREVIOUS_PROPOSER.to_string(),
            storage::Proposer(bytes),
        )
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}

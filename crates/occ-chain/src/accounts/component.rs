use eyre::{
    Result,
    WrapErr as _,
};
use occ_storage::StateWrite;
use tracing::instrument;

use crate::{
    accounts::{
        StateWriteExt as _,
        BOND_DENOM,
    },
    component::Component,
    genesis::GenesisAppState,
};

#[derive(Default)]
pub(crate) struct AccountsComponent;

impl Component for AccountsComponent {
    type AppState = GenesisAppState;

    #[instrument(name = "AccountsComponent::init_chain", skip_all, err)]
    fn init_chain<S: StateWrite>(mut state: S, app_state: &Self::AppState) -> Result<()> {
        for account in &app_state.accounts {
            state
                .mint(&account.address, BOND_DENOM, account.balance)
                .wrap_err("failed writing genesis account balance to state")?;
        }
        Ok(())
    }
}

use eyre::{
    ensure,
    Result,
};
use occ_storage::StateWrite;
use tracing::instrument;

use super::{
    Grant,
    StateWriteExt as _,
};
use crate::{
    component::Component,
    genesis::GenesisAppState,
    transaction::Message,
};

#[derive(Default)]
pub(crate) struct AuthzComponent;

impl Component for AuthzComponent {
    type AppState = GenesisAppState;

    #[instrument(name = "AuthzComponent::init_chain", skip_all, err)]
    fn init_chain<S: StateWrite>(mut state: S, app_state: &Self::AppState) -> Result<()> {
        for grant in &app_state.authz.grants {
            ensure!(
                Message::is_known_type_url(&grant.msg_type_url),
                "genesis grant for unknown message type `{}`",
                grant.msg_type_url
            );
            ensure!(
                grant.granter != grant.grantee,
                "genesis grant from {} to itself",
                grant.granter
            );
            state.put_grant(
                &grant.granter,
                &grant.grantee,
                &grant.msg_type_url,
                Grant {
                    expiration: grant.expiration,
                },
            )?;
        }
        Ok(())
    }
}

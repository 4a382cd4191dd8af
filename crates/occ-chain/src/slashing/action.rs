use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    ensure,
    eyre,
    OptionExt as _,
    Result,
};
use occ_storage::StateWrite;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

use super::StateReadExt as _;
use crate::{
    app::ActionHandler,
    staking::{
        self,
        StateReadExt as _,
    },
    transaction::{
        parse_address,
        MessageError,
        TxContext,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgUnjail {
    pub operator: String,
}

impl ActionHandler for MsgUnjail {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("operator", &self.operator)?;
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, context: &TxContext) -> Result<()> {
        let operator = parse_address("operator", &self.operator)?;
        let validator = state
            .get_validator(&operator)?
            .ok_or_else(|| eyre!("validator {operator} does not exist"))?;
        ensure!(validator.jailed, "validator {operator} is not jailed");

        let info = state
            .get_signing_info(&validator.consensus_address())?
            .ok_or_eyre("validator has no signing info")?;
        ensure!(!info.tombstoned, "validator {operator} is tombstoned");
        ensure!(
            info.jailed_until <= context.time,
            "validator {operator} is jailed until {}",
            info.jailed_until
        );

        let self_delegation =
            validator.tokens_from_shares(state.get_delegation(&operator, &operator)?)?;
        ensure!(
            self_delegation >= validator.min_self_delegation,
            "self delegation of {self_delegation} is below the minimum of {}",
            validator.min_self_delegation
        );
        staking::unjail(&mut state, &operator)?;
        info!(%operator, "unjailed validator");
        Ok(())
    }
}

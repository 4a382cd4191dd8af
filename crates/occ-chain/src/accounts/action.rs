use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    Result,
    WrapErr as _,
};
use occ_storage::StateWrite;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    accounts::StateWriteExt as _,
    app::ActionHandler,
    transaction::{
        parse_address,
        MessageError,
        TxContext,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgSend {
    pub from: String,
    pub to: String,
    pub denom: String,
    pub amount: u128,
}

impl ActionHandler for MsgSend {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("from", &self.from)?;
        parse_address("to", &self.to)?;
        super::validate_denom(&self.denom).map_err(|reason| MessageError::invalid("denom", reason))?;
        if self.amount == 0 {
            return Err(MessageError::zero_amount("amount"));
        }
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, _context: &TxContext) -> Result<()> {
        let from = parse_address("from", &self.from)?;
        let to = parse_address("to", &self.to)?;
        state
            .transfer(&from, &to, &self.denom, self.amount)
            .wrap_err("failed executing transfer")
    }
}

#[cfg(test)]
mod tests {
    use occ_storage::{
        StateDelta,
        Storage,
    };

    use super::*;
    use crate::{
        accounts::StateReadExt as _,
        test_utils::{
            address,
            assert_error_contains,
            tx_context,
        },
    };

    fn send(amount: u128) -> MsgSend {
        MsgSend {
            from: address(1).to_string(),
            to: address(2).to_string(),
            denom: "usei".to_string(),
            amount,
        }
    }

    #[test]
    fn zero_amount_is_rejected_statelessly() {
        let error = send(0).check_stateless().unwrap_err();
        assert!(error.to_string().contains("amount"), "{error}");
    }

    #[test]
    fn malformed_recipient_is_rejected_statelessly() {
        let mut msg = send(1);
        msg.to = "sei1notanaddress".to_string();
        assert!(msg.check_stateless().is_err());
    }

    #[test]
    fn transfer_is_executed() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state.mint(&address(1), "usei", 10).unwrap();
        send(4).check_and_execute(&mut state, &tx_context()).unwrap();
        assert_eq!(4, state.get_account_balance(&address(2), "usei").unwrap());
    }

    #[test]
    fn transfer_beyond_balance_fails() {
        let storage = Storage::new();
        let mut state = StateDelta::new(storage.latest_snapshot());
        let error = send(4)
            .check_and_execute(&mut state, &tx_context())
            .unwrap_err();
        assert_error_contains(&error, "insufficient funds");
    }
}

use occ_storage::StateWrite;

use crate::transaction::{
    MessageError,
    TxContext,
};

/// Validation and execution of one message kind.
pub(crate) trait ActionHandler {
    /// Checks everything that can be checked without reading state.
    fn check_stateless(&self) -> Result<(), MessageError>;

    /// Checks the message against `state` and applies it.
    ///
    /// Implementations may leave partial writes behind on error; the caller discards
    /// them.
    fn check_and_execute<S: StateWrite>(&self, state: S, context: &TxContext) -> eyre::Result<()>;
}

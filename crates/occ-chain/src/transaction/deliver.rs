use occ_storage::{
    StateDelta,
    StateWrite,
};
use tracing::{
    debug,
    instrument,
};

use super::{
    gas::{
        GasMeter,
        GAS_PER_BYTE,
        GAS_PER_MESSAGE_CHECK,
        GAS_PER_MESSAGE_EXECUTION,
        TX_BASE_GAS,
    },
    Transaction,
    TxContext,
    TxError,
    TxOutput,
    TxResult,
};
use crate::accounts::{
    StateReadExt as _,
    StateWriteExt as _,
    BOND_DENOM,
};

#[derive(Default)]
struct Receipt {
    gas: GasMeter,
    fee_credit: u128,
}

/// Delivers one encoded transaction against `state`.
///
/// Never fails: every rejection is reported in the returned result. Writes are only
/// left in `state` once the fee was paid; message effects are only kept if every
/// message executed.
#[instrument(skip_all, fields(bytes = bytes.len()))]
pub(crate) fn deliver_tx<S: StateWrite>(
    state: &mut S,
    bytes: &[u8],
    context: &TxContext,
) -> TxOutput {
    let mut receipt = Receipt::default();
    let (code, log) = match check_and_execute(state, bytes, context, &mut receipt) {
        Ok(()) => (super::TxCode::Ok, String::new()),
        Err(error) => {
            let code = error.code();
            let log = format!("{:#}", eyre::Report::new(error));
            debug!(%log, "transaction failed");
            (code, log)
        }
    };
    TxOutput {
        result: TxResult {
            code,
            log,
            gas_wanted: receipt.gas.limit(),
            gas_used: receipt.gas.consumed(),
        },
        fee_credit: receipt.fee_credit,
    }
}

fn check_and_execute<S: StateWrite>(
    state: &mut S,
    bytes: &[u8],
    context: &TxContext,
    receipt: &mut Receipt,
) -> Result<(), TxError> {
    if bytes.len() > context.max_tx_bytes {
        return Err(TxError::TooLarge {
            size: bytes.len(),
            max: context.max_tx_bytes,
        });
    }
    let tx: Transaction = borsh::from_slice(bytes).map_err(TxError::Decode)?;
    let count = tx.message_count();
    if count == 0 {
        return Err(TxError::NoMessages);
    }
    if count > context.max_msgs_per_tx {
        return Err(TxError::TooManyMessages {
            count,
            max: context.max_msgs_per_tx,
        });
    }

    receipt.gas = GasMeter::new(tx.gas_limit);
    let byte_gas = u64::try_from(bytes.len())
        .unwrap_or(u64::MAX)
        .saturating_mul(GAS_PER_BYTE);
    receipt.gas.consume(TX_BASE_GAS.saturating_add(byte_gas))?;

    for (index, msg) in tx.msgs.iter().enumerate() {
        receipt
            .gas
            .consume(per_message(GAS_PER_MESSAGE_CHECK, msg.message_count()))?;
        msg.check_stateless()
            .map_err(|source| TxError::InvalidMessage {
                index,
                source,
            })?;
        let signer = msg.signer().map_err(|source| TxError::InvalidMessage {
            index,
            source,
        })?;
        if signer != tx.signer {
            return Err(TxError::SignerMismatch {
                index,
                signer,
            });
        }
    }

    pay_fee(state, &tx, context)?;
    receipt.fee_credit = tx.fee;

    receipt
        .gas
        .consume(per_message(GAS_PER_MESSAGE_EXECUTION, count))?;
    let changes = {
        let mut delta = StateDelta::new(&*state);
        for msg in &tx.msgs {
            msg.execute(&mut delta, context)
                .map_err(|error| TxError::execution(error.wrap_err(msg.type_url())))?;
        }
        delta.into_changeset()
    };
    changes.apply_to(state);
    Ok(())
}

fn per_message(cost: u64, count: usize) -> u64 {
    cost.saturating_mul(u64::try_from(count).unwrap_or(u64::MAX))
}

/// Checks and increments the signer's nonce and debits the fee.
///
/// The fee is not credited to the fee collector here; the caller reports it so that
/// the credits of a block can be applied once, after all transactions.
fn pay_fee<S: StateWrite>(state: &mut S, tx: &Transaction, context: &TxContext) -> Result<(), TxError> {
    let expected = state
        .get_account_nonce(&tx.signer)
        .map_err(TxError::ExecutionFailed)?;
    if tx.nonce != expected {
        return Err(TxError::InvalidNonce {
            expected,
            got: tx.nonce,
        });
    }
    let required = u128::from(tx.gas_limit).saturating_mul(context.min_gas_price);
    if tx.fee < required {
        return Err(TxError::FeeTooLow {
            fee: tx.fee,
            required,
        });
    }
    if tx.fee > 0 {
        state
            .decrease_balance(&tx.signer, BOND_DENOM, tx.fee)
            .map_err(|reason| TxError::FeePayment {
                fee: tx.fee,
                reason,
            })?;
    }
    state
        .put_account_nonce(&tx.signer, expected.saturating_add(1))
        .map_err(TxError::ExecutionFailed)
}

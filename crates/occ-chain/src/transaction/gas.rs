use super::GasError;

/// Charged once per transaction.
pub const TX_BASE_GAS: u64 = 10_000;
/// Charged per byte of the encoded transaction.
pub const GAS_PER_BYTE: u64 = 10;
/// Charged per message for its stateless checks, envelopes and inner messages alike.
pub const GAS_PER_MESSAGE_CHECK: u64 = 1_000;
/// Charged per message before execution.
pub const GAS_PER_MESSAGE_EXECUTION: u64 = 10_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct GasMeter {
    limit: u64,
    consumed: u64,
}

impl GasMeter {
    pub(crate) fn new(limit: u64) -> Self {
        Self {
            limit,
            consumed: 0,
        }
    }

    pub(crate) fn limit(&self) -> u64 {
        self.limit
    }

    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Consumes `amount` gas. On error the meter is left exhausted.
    pub(crate) fn consume(&mut self, amount: u64) -> Result<(), GasError> {
        let wanted = self.consumed.saturating_add(amount);
        if wanted > self.limit {
            self.consumed = self.limit;
            return Err(GasError {
                limit: self.limit,
                wanted,
            });
        }
        self.consumed = wanted;
        Ok(())
    }
}

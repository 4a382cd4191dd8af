use crate::address::{
    Address,
    AddressError,
};

/// Why a message failed its stateless checks.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("`{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("`{field}` must not be zero")]
    ZeroAmount { field: &'static str },
    #[error("`{field}` is not a valid address")]
    Address {
        field: &'static str,
        source: AddressError,
    },
    #[error("inner message {index} (`{type_url}`) is invalid")]
    Inner {
        index: usize,
        type_url: &'static str,
        source: Box<MessageError>,
    },
}

impl MessageError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn zero_amount(field: &'static str) -> Self {
        Self::ZeroAmount {
            field,
        }
    }

    pub(crate) fn inner(index: usize, type_url: &'static str, source: MessageError) -> Self {
        Self::Inner {
            index,
            type_url,
            source: Box::new(source),
        }
    }
}

pub(crate) fn parse_address(field: &'static str, input: &str) -> Result<Address, MessageError> {
    input.parse().map_err(|source| MessageError::Address {
        field,
        source,
    })
}

/// A message acted on behalf of an account that did not authorize it.
#[derive(Debug, thiserror::Error)]
#[error("{grantee} is not authorized to execute `{type_url}` on behalf of {granter}")]
pub(crate) struct Unauthorized {
    pub(crate) granter: Address,
    pub(crate) grantee: Address,
    pub(crate) type_url: &'static str,
}

#[derive(Debug, thiserror::Error)]
#[error("out of gas: limit {limit}, wanted {wanted}")]
pub struct GasError {
    pub limit: u64,
    pub wanted: u64,
}

/// Why a transaction was rejected or failed.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TxError {
    #[error("transaction of {size} bytes exceeds the limit of {max} bytes")]
    TooLarge { size: usize, max: usize },
    #[error("failed decoding transaction")]
    Decode(#[source] std::io::Error),
    #[error("transaction carries no messages")]
    NoMessages,
    #[error("transaction carries {count} messages, more than the limit of {max}")]
    TooManyMessages { count: usize, max: usize },
    #[error(transparent)]
    OutOfGas(#[from] GasError),
    #[error("message {index} is invalid")]
    InvalidMessage {
        index: usize,
        #[source]
        source: MessageError,
    },
    #[error("message {index} is signed by {signer}, not by the transaction signer")]
    SignerMismatch { index: usize, signer: Address },
    #[error("expected nonce {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },
    #[error("fee {fee} is below the required {required}")]
    FeeTooLow { fee: u128, required: u128 },
    #[error("failed paying fee of {fee}: {reason:#}")]
    FeePayment { fee: u128, reason: eyre::Report },
    #[error("{0:#}")]
    Unauthorized(eyre::Report),
    #[error("{0:#}")]
    ExecutionFailed(eyre::Report),
}

impl TxError {
    pub(crate) fn execution(report: eyre::Report) -> Self {
        if report.downcast_ref::<Unauthorized>().is_some() {
            Self::Unauthorized(report)
        } else {
            Self::ExecutionFailed(report)
        }
    }

    pub(crate) fn code(&self) -> super::TxCode {
        use super::TxCode;
        match self {
            Self::TooLarge {
                ..
            } => TxCode::TxTooLarge,
            Self::Decode(_) => TxCode::Decode,
            Self::TooManyMessages {
                ..
            } => TxCode::TooManyMessages,
            Self::OutOfGas(_) => TxCode::OutOfGas,
            Self::NoMessages
            | Self::InvalidMessage {
                ..
            } => TxCode::InvalidMessage,
            Self::InvalidNonce {
                ..
            } => TxCode::InvalidNonce,
            Self::FeeTooLow {
                ..
            }
            | Self::FeePayment {
                ..
            } => TxCode::InsufficientFee,
            Self::SignerMismatch {
                ..
            }
            | Self::Unauthorized(_) => TxCode::Unauthorized,
            Self::ExecutionFailed(_) => TxCode::ExecutionFailed,
        }
    }
}

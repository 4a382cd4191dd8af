use crate::TxIndex;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The reader observed an estimate left behind by an invalidated transaction and
    /// must abort its current incarnation.
    #[error("read an estimate written by transaction {writer}")]
    EstimateAbort { writer: TxIndex },
    #[error("key `{key}` still holds an estimate of transaction {writer} when flushing")]
    EstimateAtFlush { key: String, writer: TxIndex },
}

impl Error {
    pub(crate) fn estimate_at_flush(key: &[u8], writer: TxIndex) -> Self {
        Self::EstimateAtFlush {
            key: hex::encode(key),
            writer,
        }
    }

    /// The index of the transaction whose estimate caused this error, if any.
    #[must_use]
    pub fn estimate_writer(&self) -> Option<TxIndex> {
        match self {
            Self::EstimateAbort {
                writer,
            }
            | Self::EstimateAtFlush {
                writer, ..
            } => Some(*writer),
        }
    }
}

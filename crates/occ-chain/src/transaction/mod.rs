//! Transactions, their messages, and the pipeline that delivers them.

mod deliver;
mod error;
pub(crate) mod gas;

use std::io;

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use serde::{
    Deserialize,
    Serialize,
};

pub(crate) use self::{
    deliver::deliver_tx,
    error::{
        parse_address,
        TxError,
        Unauthorized,
    },
};
pub use self::error::{
    GasError,
    MessageError,
};
use crate::{
    accounts::MsgSend,
    address::Address,
    app::ActionHandler as _,
    authz::{
        MsgExec,
        MsgGrant,
        MsgRevoke,
    },
    gov::{
        MsgDeposit,
        MsgSubmitProposal,
        MsgVote,
        MsgVoteWeighted,
    },
    slashing::MsgUnjail,
    staking::{
        MsgCreateValidator,
        MsgDelegate,
        MsgUndelegate,
    },
};

/// A signed batch of messages.
///
/// Signatures are checked before transactions reach the application, so `signer` is
/// trusted here.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub signer: Address,
    pub nonce: u64,
    pub gas_limit: u64,
    pub fee: u128,
    pub msgs: Vec<Message>,
}

impl Transaction {
    /// The number of messages, counting envelopes and everything they wrap.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.msgs.iter().map(Message::message_count).sum()
    }

    /// Encodes the transaction as it is submitted to the chain.
    ///
    /// # Errors
    /// Returns an error if borsh fails to serialize the transaction.
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }
}

/// A message of a transaction.
///
/// Encoded by borsh as a one byte variant tag, in declaration order, followed by the
/// message. Decoding rejects envelopes nested deeper than [`crate::authz::MAX_EXEC_DEPTH`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Send(MsgSend),
    CreateValidator(MsgCreateValidator),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
    Unjail(MsgUnjail),
    SubmitProposal(MsgSubmitProposal),
    Deposit(MsgDeposit),
    Vote(MsgVote),
    VoteWeighted(MsgVoteWeighted),
    Grant(MsgGrant),
    Revoke(MsgRevoke),
    Exec(MsgExec),
}

impl Message {
    #[must_use]
    pub fn type_url(&self) -> &'static str {
        match self {
            Self::Send(_) => "/cosmos.bank.v1beta1.MsgSend",
            Self::CreateValidator(_) => "/cosmos.staking.v1beta1.MsgCreateValidator",
            Self::Delegate(_) => "/cosmos.staking.v1beta1.MsgDelegate",
            Self::Undelegate(_) => "/cosmos.staking.v1beta1.MsgUndelegate",
            Self::Unjail(_) => "/cosmos.slashing.v1beta1.MsgUnjail",
            Self::SubmitProposal(_) => "/cosmos.gov.v1beta1.MsgSubmitProposal",
            Self::Deposit(_) => "/cosmos.gov.v1beta1.MsgDeposit",
            Self::Vote(_) => "/cosmos.gov.v1beta1.MsgVote",
            Self::VoteWeighted(_) => "/cosmos.gov.v1beta1.MsgVoteWeighted",
            Self::Grant(_) => "/cosmos.authz.v1beta1.MsgGrant",
            Self::Revoke(_) => "/cosmos.authz.v1beta1.MsgRevoke",
            Self::Exec(_) => "/cosmos.authz.v1beta1.MsgExec",
        }
    }

    /// Whether `type_url` names a message this chain understands.
    #[must_use]
    pub fn is_known_type_url(type_url: &str) -> bool {
        KNOWN_TYPE_URLS.contains(&type_url)
    }

    /// The account that must authorize this message.
    ///
    /// # Errors
    /// Returns an error if the signer field is not a valid address.
    pub fn signer(&self) -> Result<Address, MessageError> {
        match self {
            Self::Send(msg) => parse_address("from", &msg.from),
            Self::CreateValidator(msg) => parse_address("operator", &msg.operator),
            Self::Delegate(msg) => parse_address("delegator", &msg.delegator),
            Self::Undelegate(msg) => parse_address("delegator", &msg.delegator),
            Self::Unjail(msg) => parse_address("operator", &msg.operator),
            Self::SubmitProposal(msg) => parse_address("proposer", &msg.proposer),
            Self::Deposit(msg) => parse_address("depositor", &msg.depositor),
            Self::Vote(msg) => parse_address("voter", &msg.voter),
            Self::VoteWeighted(msg) => parse_address("voter", &msg.voter),
            Self::Grant(msg) => parse_address("granter", &msg.granter),
            Self::Revoke(msg) => parse_address("granter", &msg.granter),
            Self::Exec(msg) => parse_address("grantee", &msg.grantee),
        }
    }

    /// Runs the stateless checks of this message, and of every message it wraps.
    ///
    /// # Errors
    /// Returns the first check that failed.
    pub fn check_stateless(&self) -> Result<(), MessageError> {
        match self {
            Self::Send(msg) => msg.check_stateless(),
            Self::CreateValidator(msg) => msg.check_stateless(),
            Self::Delegate(msg) => msg.check_stateless(),
            Self::Undelegate(msg) => msg.check_stateless(),
            Self::Unjail(msg) => msg.check_stateless(),
            Self::SubmitProposal(msg) => msg.check_stateless(),
            Self::Deposit(msg) => msg.check_stateless(),
            Self::Vote(msg) => msg.check_stateless(),
            Self::VoteWeighted(msg) => msg.check_stateless(),
            Self::Grant(msg) => msg.check_stateless(),
            Self::Revoke(msg) => msg.check_stateless(),
            Self::Exec(msg) => msg.check_stateless(),
        }
    }

    // Takes `&mut S` so that envelopes dispatch their inner messages with the same
    // state type instead of instantiating a new `&mut` layer per nesting level.
    pub(crate) fn execute<S: occ_storage::StateWrite>(
        &self,
        state: &mut S,
        context: &TxContext,
    ) -> eyre::Result<()> {
        match self {
            Self::Send(msg) => msg.check_and_execute(state, context),
            Self::CreateValidator(msg) => msg.check_and_execute(state, context),
            Self::Delegate(msg) => msg.check_and_execute(state, context),
            Self::Undelegate(msg) => msg.check_and_execute(state, context),
            Self::Unjail(msg) => msg.check_and_execute(state, context),
            Self::SubmitProposal(msg) => msg.check_and_execute(state, context),
            Self::Deposit(msg) => msg.check_and_execute(state, context),
            Self::Vote(msg) => msg.check_and_execute(state, context),
            Self::VoteWeighted(msg) => msg.check_and_execute(state, context),
            Self::Grant(msg) => msg.check_and_execute(state, context),
            Self::Revoke(msg) => msg.check_and_execute(state, context),
            Self::Exec(msg) => msg.execute_inner(state, context),
        }
    }

    /// Decodes a message found inside `depth` envelopes.
    pub(crate) fn deserialize_at_depth<R: io::Read>(
        reader: &mut R,
        depth: usize,
    ) -> io::Result<Self> {
        let msg = match u8::deserialize_reader(reader)? {
            0 => Self::Send(MsgSend::deserialize_reader(reader)?),
            1 => Self::CreateValidator(MsgCreateValidator::deserialize_reader(reader)?),
            2 => Self::Delegate(MsgDelegate::deserialize_reader(reader)?),
            3 => Self::Undelegate(MsgUndelegate::deserialize_reader(reader)?),
            4 => Self::Unjail(MsgUnjail::deserialize_reader(reader)?),
            5 => Self::SubmitProposal(MsgSubmitProposal::deserialize_reader(reader)?),
            6 => Self::Deposit(MsgDeposit::deserialize_reader(reader)?),
            7 => Self::Vote(MsgVote::deserialize_reader(reader)?),
            8 => Self::VoteWeighted(MsgVoteWeighted::deserialize_reader(reader)?),
            9 => Self::Grant(MsgGrant::deserialize_reader(reader)?),
            10 => Self::Revoke(MsgRevoke::deserialize_reader(reader)?),
            11 => Self::Exec(MsgExec::deserialize_at_depth(reader, depth.saturating_add(1))?),
            tag => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown message variant {tag}"),
                ));
            }
        };
        Ok(msg)
    }

    /// One for a plain message; an envelope counts itself and all it wraps.
    #[must_use]
    pub fn message_count(&self) -> usize {
        match self {
            Self::Exec(msg) => msg.message_count(),
            _ => 1,
        }
    }
}

impl BorshDeserialize for Message {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        Self::deserialize_at_depth(reader, 0)
    }
}

const KNOWN_TYPE_URLS: &[&str] = &[
    "/cosmos.bank.v1beta1.MsgSend",
    "/cosmos.staking.v1beta1.MsgCreateValidator",
    "/cosmos.staking.v1beta1.MsgDelegate",
    "/cosmos.staking.v1beta1.MsgUndelegate",
    "/cosmos.slashing.v1beta1.MsgUnjail",
    "/cosmos.gov.v1beta1.MsgSubmitProposal",
    "/cosmos.gov.v1beta1.MsgDeposit",
    "/cosmos.gov.v1beta1.MsgVote",
    "/cosmos.gov.v1beta1.MsgVoteWeighted",
    "/cosmos.authz.v1beta1.MsgGrant",
    "/cosmos.authz.v1beta1.MsgRevoke",
    "/cosmos.authz.v1beta1.MsgExec",
];

/// What a transaction learns about the block it is executed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TxContext {
    pub(crate) height: u64,
    /// Unix seconds.
    pub(crate) time: u64,
    pub(crate) min_gas_price: u128,
    pub(crate) max_tx_bytes: usize,
    pub(crate) max_msgs_per_tx: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxCode {
    Ok,
    TxTooLarge,
    Decode,
    TooManyMessages,
    OutOfGas,
    InvalidMessage,
    InvalidNonce,
    InsufficientFee,
    ExecutionFailed,
    Unauthorized,
}

impl TxCode {
    #[must_use]
    pub fn value(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::TxTooLarge => 1,
            Self::Decode => 2,
            Self::TooManyMessages => 3,
            Self::OutOfGas => 4,
            Self::InvalidMessage => 5,
            Self::InvalidNonce => 6,
            Self::InsufficientFee => 7,
            Self::ExecutionFailed => 8,
            Self::Unauthorized => 9,
        }
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TxResult {
    pub code: TxCode,
    pub log: String,
    pub gas_wanted: u64,
    pub gas_used: u64,
}

/// The result of delivering one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TxOutput {
    pub(crate) result: TxResult,
    /// The fee debited from the signer, owed to the fee collector.
    pub(crate) fee_credit: u128,
}

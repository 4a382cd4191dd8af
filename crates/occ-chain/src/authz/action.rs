use std::io;

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    ensure,
    Result,
    WrapErr as _,
};
use occ_storage::StateWrite;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

use super::{
    Grant,
    StateReadExt as _,
    StateWriteExt as _,
    MAX_EXEC_DEPTH,
};
use crate::{
    app::ActionHandler,
    transaction::{
        parse_address,
        Message,
        MessageError,
        TxContext,
        Unauthorized,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgGrant {
    pub granter: String,
    pub grantee: String,
    pub msg_type_url: String,
    pub expiration: Option<u64>,
}

impl ActionHandler for MsgGrant {
    fn check_stateless(&self) -> Result<(), MessageError> {
        let granter = parse_address("granter", &self.granter)?;
        let grantee = parse_address("grantee", &self.grantee)?;
        if granter == grantee {
            return Err(MessageError::invalid(
                "grantee",
                "granter and grantee must differ",
            ));
        }
        if !Message::is_known_type_url(&self.msg_type_url) {
            return Err(MessageError::invalid(
                "msg_type_url",
                format!("unknown message type `{}`", self.msg_type_url),
            ));
        }
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, context: &TxContext) -> Result<()> {
        let granter = parse_address("granter", &self.granter)?;
        let grantee = parse_address("grantee", &self.grantee)?;
        let grant = Grant {
            expiration: self.expiration,
        };
        ensure!(!grant.is_expired(context.time), "grant expiration lies in the past");
        state.put_grant(&granter, &grantee, &self.msg_type_url, grant)?;
        info!(%granter, %grantee, msg_type_url = %self.msg_type_url, "granted authorization");
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MsgRevoke {
    pub granter: String,
    pub grantee: String,
    pub msg_type_url: String,
}

impl ActionHandler for MsgRevoke {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("granter", &self.granter)?;
        parse_address("grantee", &self.grantee)?;
        if self.msg_type_url.is_empty() {
            return Err(MessageError::invalid("msg_type_url", "must not be empty"));
        }
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, _context: &TxContext) -> Result<()> {
        let granter = parse_address("granter", &self.granter)?;
        let grantee = parse_address("grantee", &self.grantee)?;
        ensure!(
            state
                .get_grant(&granter, &grantee, &self.msg_type_url)?
                .is_some(),
            "no grant from {granter} to {grantee} for `{}`",
            self.msg_type_url
        );
        state.delete_grant(&granter, &grantee, &self.msg_type_url);
        Ok(())
    }
}

/// Executes `msgs` on behalf of their signers.
///
/// Inner messages signed by the grantee itself need no grant.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, Serialize, Deserialize)]
pub struct MsgExec {
    pub grantee: String,
    pub msgs: Vec<Message>,
}

impl MsgExec {
    /// The number of nested envelopes, this one included.
    #[must_use]
    pub fn depth(&self) -> usize {
        let inner = self
            .msgs
            .iter()
            .map(|msg| match msg {
                Message::Exec(exec) => exec.depth(),
                _ => 0,
            })
            .max()
            .unwrap_or(0);
        inner.saturating_add(1)
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.msgs
            .iter()
            .map(Message::message_count)
            .fold(1, usize::saturating_add)
    }

    /// Decodes an envelope that is itself nested `depth` envelopes deep.
    ///
    /// Nesting is checked before the inner messages are read, so the decoder never
    /// recurses more than [`MAX_EXEC_DEPTH`] levels.
    pub(crate) fn deserialize_at_depth<R: io::Read>(
        reader: &mut R,
        depth: usize,
    ) -> io::Result<Self> {
        if depth > MAX_EXEC_DEPTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("envelopes are nested more than {MAX_EXEC_DEPTH} deep"),
            ));
        }
        let grantee = String::deserialize_reader(reader)?;
        let len = u32::deserialize_reader(reader)?;
        let mut msgs = Vec::new();
        for _ in 0..len {
            msgs.push(Message::deserialize_at_depth(reader, depth)?);
        }
        Ok(Self {
            grantee,
            msgs,
        })
    }

    /// Authorizes and dispatches every inner message against `state`.
    pub(crate) fn execute_inner<S: StateWrite>(
        &self,
        state: &mut S,
        context: &TxContext,
    ) -> Result<()> {
        let grantee = parse_address("grantee", &self.grantee)?;
        for (index, msg) in self.msgs.iter().enumerate() {
            let type_url = msg.type_url();
            msg.check_stateless()
                .wrap_err_with(|| format!("inner message {index} (`{type_url}`) is invalid"))?;
            let granter = msg.signer()?;
            if granter == grantee {
                debug!(%grantee, type_url, "executing self-signed inner message without a grant");
            } else {
                let grant = state.get_grant(&granter, &grantee, type_url)?;
                if !grant.is_some_and(|grant| !grant.is_expired(context.time)) {
                    return Err(Unauthorized {
                        granter,
                        grantee,
                        type_url,
                    }
                    .into());
                }
            }
            msg.execute(state, context)
                .wrap_err_with(|| format!("inner message {index} (`{type_url}`) failed"))?;
        }
        Ok(())
    }
}

impl BorshDeserialize for MsgExec {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        Self::deserialize_at_depth(reader, 1)
    }
}

impl ActionHandler for MsgExec {
    fn check_stateless(&self) -> Result<(), MessageError> {
        parse_address("grantee", &self.grantee)?;
        if self.msgs.is_empty() {
            return Err(MessageError::invalid("msgs", "must not be empty"));
        }
        let depth = self.depth();
        if depth > MAX_EXEC_DEPTH {
            return Err(MessageError::invalid(
                "msgs",
                format!("envelopes are nested {depth} deep, more than {MAX_EXEC_DEPTH}"),
            ));
        }
        for (index, msg) in self.msgs.iter().enumerate() {
            msg.check_stateless()
                .map_err(|source| MessageError::inner(index, msg.type_url(), source))?;
        }
        Ok(())
    }

    fn check_and_execute<S: StateWrite>(&self, mut state: S, context: &TxContext) -> Result<()> {
        self.execute_inner(&mut state, context)
    }
}

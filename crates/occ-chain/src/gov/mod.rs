//! Proposals, deposits, votes and the end-of-block sweep that settles them.

pub(crate) mod action;
pub(crate) mod component;
mod state_ext;
pub(crate) mod storage;
mod sweep;

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    ensure,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

pub use self::action::{
    MsgDeposit,
    MsgSubmitProposal,
    MsgVote,
    MsgVoteWeighted,
};
pub(crate) use self::state_ext::{
    StateReadExt,
    StateWriteExt,
};
use crate::{
    address::Address,
    transaction::MessageError,
};

/// The whole of a vote, in basis points.
pub const TOTAL_WEIGHT_BPS: u64 = 10_000;

const MAX_TITLE_LEN: usize = 140;
const MAX_DESCRIPTION_LEN: usize = 10_000;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VoteOption {
    Yes,
    Abstain,
    No,
    NoWithVeto,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct WeightedVoteOption {
    pub option: VoteOption,
    pub weight_bps: u64,
}

/// Checks that `options` split exactly one whole vote between distinct options.
pub(crate) fn validate_weighted_options(options: &[WeightedVoteOption]) -> Result<(), MessageError> {
    if options.is_empty() {
        return Err(MessageError::invalid("options", "at least one option is required"));
    }
    let mut seen = Vec::with_capacity(options.len());
    let mut total: u64 = 0;
    for option in options {
        if option.weight_bps == 0 {
            return Err(MessageError::invalid(
                "options",
                format!("weight of {:?} must be positive", option.option),
            ));
        }
        if seen.contains(&option.option) {
            return Err(MessageError::invalid(
                "options",
                format!("duplicate option {:?}", option.option),
            ));
        }
        seen.push(option.option);
        total = total.saturating_add(option.weight_bps);
    }
    if total != TOTAL_WEIGHT_BPS {
        return Err(MessageError::invalid(
            "options",
            format!("weights add up to {total} bps instead of {TOTAL_WEIGHT_BPS}"),
        ));
    }
    Ok(())
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Read,
    Write,
    Unknown,
    /// Terminates every dependency mapping.
    Commit,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AccessOperation {
    pub access_type: AccessType,
    pub resource_type: String,
    pub identifier_template: String,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ProposalContent {
    Text {
        title: String,
        description: String,
    },
    /// Replaces the declared state accesses of a message type.
    UpdateResourceDependencyMapping {
        title: String,
        description: String,
        message_key: String,
        access_ops: Vec<AccessOperation>,
    },
}

impl ProposalContent {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Text {
                title, ..
            }
            | Self::UpdateResourceDependencyMapping {
                title, ..
            } => title,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), MessageError> {
        let (title, description) = match self {
            Self::Text {
                title,
                description,
            }
            | Self::UpdateResourceDependencyMapping {
                title,
                description,
                ..
            } => (title, description),
        };
        if title.trim().is_empty() || title.len() > MAX_TITLE_LEN {
            return Err(MessageError::invalid(
                "title",
                format!("must be 1 to {MAX_TITLE_LEN} characters"),
            ));
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(MessageError::invalid(
                "description",
                format!("must not exceed {MAX_DESCRIPTION_LEN} characters"),
            ));
        }
        if let Self::UpdateResourceDependencyMapping {
            message_key,
            access_ops,
            ..
        } = self
        {
            if message_key.is_empty() {
                return Err(MessageError::invalid("message_key", "must not be empty"));
            }
            let Some(last) = access_ops.last() else {
                return Err(MessageError::invalid("access_ops", "must not be empty"));
            };
            if last.access_type != AccessType::Commit {
                return Err(MessageError::invalid(
                    "access_ops",
                    "must end with a commit operation",
                ));
            }
            if access_ops[..access_ops.len() - 1]
                .iter()
                .any(|op| op.access_type == AccessType::Commit)
            {
                return Err(MessageError::invalid(
                    "access_ops",
                    "commit may only appear as the last operation",
                ));
            }
        }
        Ok(())
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    DepositPeriod,
    VotingPeriod,
    Passed,
    Rejected,
    /// The deposit period ended without reaching the minimum deposit.
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TallyResult {
    pub yes: u128,
    pub abstain: u128,
    pub no: u128,
    pub no_with_veto: u128,
}

impl TallyResult {
    pub(crate) fn add(&mut self, options: &[WeightedVoteOption], power: u128) -> Result<()> {
        for option in options {
            let share = power
                .checked_mul(u128::from(option.weight_bps))
                .map(|product| product / u128::from(TOTAL_WEIGHT_BPS))
                .ok_or_else(|| eyre::eyre!("tally share overflows"))?;
            let slot = match option.option {
                VoteOption::Yes => &mut self.yes,
                VoteOption::Abstain => &mut self.abstain,
                VoteOption::No => &mut self.no,
                VoteOption::NoWithVeto => &mut self.no_with_veto,
            };
            *slot = slot
                .checked_add(share)
                .ok_or_else(|| eyre::eyre!("tally overflows"))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn total(&self) -> u128 {
        self.yes
            .saturating_add(self.abstain)
            .saturating_add(self.no)
            .saturating_add(self.no_with_veto)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub content: ProposalContent,
    pub status: ProposalStatus,
    pub submit_time: u64,
    pub deposit_end_time: u64,
    pub voting_start_time: Option<u64>,
    pub voting_end_time: Option<u64>,
    pub total_deposit: u128,
    pub final_tally: Option<TallyResult>,
}

#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct GovParams {
    pub min_deposit: u128,
    pub max_deposit_period_secs: u64,
    pub voting_period_secs: u64,
    pub quorum_bps: u64,
    pub threshold_bps: u64,
    pub veto_threshold_bps: u64,
}

impl GovParams {
    pub(crate) fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("quorum_bps", self.quorum_bps),
            ("threshold_bps", self.threshold_bps),
            ("veto_threshold_bps", self.veto_threshold_bps),
        ] {
            ensure!(value <= 10_000, "{name} must not exceed 10000");
        }
        ensure!(self.min_deposit > 0, "min_deposit must be positive");
        Ok(())
    }
}

impl Default for GovParams {
    fn default() -> Self {
        Self {
            min_deposit: 10_000_000,
            max_deposit_period_secs: 2 * 24 * 60 * 60,
            voting_period_secs: 3 * 24 * 60 * 60,
            quorum_bps: 3_340,
            threshold_bps: 5_000,
            veto_threshold_bps: 3_340,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisGov {
    pub params: GovParams,
}

/// How much work the end-of-block sweep may do in one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepLimits {
    /// Expired proposals picked up per block.
    pub max_proposals: u32,
    /// Votes and deposits processed per block.
    pub max_entries: u32,
}

impl Default for SweepLimits {
    fn default() -> Self {
        Self {
            max_proposals: 50,
            max_entries: 1_000,
        }
    }
}

/// Where the sweep resumes in the next block.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SweepCursor {
    pub proposal_id: u64,
    pub phase: SweepPhase,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum SweepPhase {
    Tally(TallyResult),
    SettleDeposits { burn: bool },
}

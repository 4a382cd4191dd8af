use crate::{
    address::Address,
    storage::keys::{
        AddressHex,
        Sortable,
    },
};

pub(in crate::gov) const PARAMS: &str = "gov/params";
pub(in crate::gov) const NEXT_PROPOSAL_ID: &str = "gov/next_proposal_id";
pub(in crate::gov) const SWEEP_CURSOR: &str = "gov/sweep_cursor";
pub(in crate::gov) const INACTIVE_QUEUE_PREFIX: &str = "gov/inactive_queue/";
pub(in crate::gov) const ACTIVE_QUEUE_PREFIX: &str = "gov/active_queue/";
const PROPOSAL_PREFIX: &str = "gov/proposal/";
const DEPOSIT_PREFIX: &str = "gov/deposit/";
const VOTE_PREFIX: &str = "gov/vote/";
const DEPENDENCY_MAPPING_PREFIX: &str = "gov/dependency_mapping/";

pub(in crate::gov) fn proposal(id: u64) -> String {
    format!("{PROPOSAL_PREFIX}{}", Sortable(id))
}

/// Example: `gov/inactive_queue/0000000065f0a000/0000000000000003`.
///                              |end time      | |proposal id   |
pub(in crate::gov) fn inactive_queue(deposit_end_time: u64, id: u64) -> String {
    format!(
        "{INACTIVE_QUEUE_PREFIX}{}/{}",
        Sortable(deposit_end_time),
        Sortable(id)
    )
}

pub(in crate::gov) fn active_queue(voting_end_time: u64, id: u64) -> String {
    format!(
        "{ACTIVE_QUEUE_PREFIX}{}/{}",
        Sortable(voting_end_time),
        Sortable(id)
    )
}

pub(in crate::gov) fn deposits_prefix(id: u64) -> String {
    format!("{DEPOSIT_PREFIX}{}/", Sortable(id))
}

pub(in crate::gov) fn deposit(id: u64, depositor: &Address) -> String {
    format!("{}{}", deposits_prefix(id), AddressHex(depositor))
}

pub(in crate::gov) fn votes_prefix(id: u64) -> String {
    format!("{VOTE_PREFIX}{}/", Sortable(id))
}

pub(in crate::gov) fn vote(id: u64, voter: &Address) -> String {
    format!("{}{}", votes_prefix(id), AddressHex(voter))
}

pub(in crate::gov) fn dependency_mapping(message_key: &str) -> String {
    format!("{DEPENDENCY_MAPPING_PREFIX}{message_key}")
}

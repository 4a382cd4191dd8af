use crate::{
    address::Address,
    storage::keys::AccountPrefixer,
};

pub(in crate::distribution) const PARAMS: &str = "distribution/params";
pub(in crate::distribution) const COMMUNITY_POOL: &str = "distribution/community_pool";
pub(in crate::distribution) const PREVIOUS_PROPOSER: &str = "distribution/previous_proposer";
const OUTSTANDING_PREFIX: &str = "distribution/outstanding/";
const COMMISSION_PREFIX: &str = "distribution/commission/";

pub(in crate::distribution) fn outstanding_rewards(operator: &Address) -> String {
    AccountPrefixer::new(OUTSTANDING_PREFIX, operator).to_string()
}

pub(in crate::distribution) fn commission(operator: &Address) -> String {
    AccountPrefixer::new(COMMISSION_PREFIX, operator).to_string()
}

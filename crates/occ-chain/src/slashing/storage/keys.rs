use crate::storage::keys::{
    ConsensusHex,
    Sortable,
};

pub(in crate::slashing) const PARAMS: &str = "slashing/params";
pub(in crate::slashing) const PURGE_QUEUE_PREFIX: &str = "slashing/purge_queue/";
const SIGNING_INFO_PREFIX: &str = "slashing/signing_info/";
const MISSED_BLOCKS_PREFIX: &str = "slashing/missed/";

pub(in crate::slashing) fn signing_info(address: &tendermint::account::Id) -> String {
    format!("{SIGNING_INFO_PREFIX}{}", ConsensusHex(address))
}

/// Example: `slashing/missed/0202....0202/0000000000000007`.
///                           |40 hex chars| |window index|
pub(in crate::slashing) fn missed_block(address: &tendermint::account::Id, index: u64) -> String {
    format!("{}{}", missed_blocks_prefix(address), Sortable(index))
}

pub(in crate::slashing) fn missed_blocks_prefix(address: &tendermint::account::Id) -> String {
    format!("{MISSED_BLOCKS_PREFIX}{}/", ConsensusHex(address))
}

pub(in crate::slashing) fn purge_queue(height: u64, address: &tendermint::account::Id) -> String {
    format!(
        "{PURGE_QUEUE_PREFIX}{}/{}",
        Sortable(height),
        ConsensusHex(address)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENT_PREFIX: &str = "slashing/";

    fn address() -> tendermint::account::Id {
        tendermint::account::Id::new([2; 20])
    }

    #[test]
    fn keys_should_not_change() {
        insta::assert_snapshot!(
            signing_info(&address()),
            @"slashing/signing_info/0202020202020202020202020202020202020202"
        );
        insta::assert_snapshot!(
            missed_block(&address(), 7),
            @"slashing/missed/0202020202020202020202020202020202020202/0000000000000007"
        );
        insta::assert_snapshot!(
            purge_queue(12, &address()),
            @"slashing/purge_queue/000000000000000c/0202020202020202020202020202020202020202"
        );
    }

    #[test]
    fn keys_should_have_component_prefix() {
        assert!(PARAMS.starts_with(COMPONENT_PREFIX));
        assert!(signing_info(&address()).starts_with(COMPONENT_PREFIX));
        assert!(missed_block(&address(), 1).starts_with(COMPONENT_PREFIX));
        assert!(purge_queue(1, &address()).starts_with(COMPONENT_PREFIX));
    }

    #[test]
    fn missed_blocks_of_one_validator_share_a_prefix() {
        let other = tendermint::account::Id::new([3; 20]);
        assert!(missed_block(&address(), 3).starts_with(&missed_blocks_prefix(&address())));
        assert!(!missed_block(&other, 3).starts_with(&missed_blocks_prefix(&address())));
    }
}

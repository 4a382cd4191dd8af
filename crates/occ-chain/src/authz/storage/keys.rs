use crate::{
    address::Address,
    storage::keys::AddressHex,
};

const GRANT_PREFIX: &str = "authz/grant/";

/// Example: `authz/grant/0101....0101/0202....0202//cosmos.bank.v1beta1.MsgSend`.
///                       |granter   | |grantee   | |type url               |
pub(in crate::authz) fn grant(granter: &Address, grantee: &Address, type_url: &str) -> String {
    format!(
        "{GRANT_PREFIX}{}/{}/{type_url}",
        AddressHex(granter),
        AddressHex(grantee)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_should_not_change() {
        insta::assert_snapshot!(
            grant(
                &Address::from_array([1; 20]),
                &Address::from_array([2; 20]),
                "/cosmos.bank.v1beta1.MsgSend"
            ),
            @"authz/grant/0101010101010101010101010101010101010101/0202020202020202020202020202020202020202//cosmos.bank.v1beta1.MsgSend"
        );
    }

    #[test]
    fn grants_are_directional() {
        let first = Address::from_array([1; 20]);
        let second = Address::from_array([2; 20]);
        assert_ne!(grant(&first, &second, "x"), grant(&second, &first, "x"));
    }
}

use std::fmt::{
    self,
    Display,
    Formatter,
};

use crate::address::Address;

/// Renders a component prefix followed by an address as lowercase hex.
///
/// Example: `accounts/0101....0101`.
///                   |40 hex chars|
pub(crate) struct AccountPrefixer<'a> {
    prefix: &'static str,
    address: &'a Address,
}

impl<'a> AccountPrefixer<'a> {
    pub(crate) fn new(prefix: &'static str, address: &'a Address) -> Self {
        Self {
            prefix,
            address,
        }
    }
}

impl Display for AccountPrefixer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, AddressHex(self.address))
    }
}

/// An address as 40 lowercase hex chars.
pub(crate) struct AddressHex<'a>(pub(crate) &'a Address);

impl Display for AddressHex<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A consensus address as 40 lowercase hex chars.
pub(crate) struct ConsensusHex<'a>(pub(crate) &'a tendermint::account::Id);

impl Display for ConsensusHex<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A `u64` as 16 hex chars so that keys sort in numerical order.
pub(crate) struct Sortable(pub(crate) u64);

impl Display for Sortable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Sortable {
    pub(crate) fn parse(hex: &str) -> eyre::Result<u64> {
        eyre::ensure!(hex.len() == 16, "expected 16 hex chars, got `{hex}`");
        u64::from_str_radix(hex, 16).map_err(|e| eyre::eyre!("invalid sortable number `{hex}`: {e}"))
    }
}

pub(crate) fn parse_address_hex(hex: &str) -> eyre::Result<Address> {
    let mut bytes = [0u8; crate::address::ADDRESS_LEN];
    hex::decode_to_slice(hex, &mut bytes)
        .map_err(|e| eyre::eyre!("invalid address hex `{hex}`: {e}"))?;
    Ok(Address::from_array(bytes))
}

pub(crate) fn parse_consensus_hex(hex: &str) -> eyre::Result<tendermint::account::Id> {
    let mut bytes = [0u8; crate::address::ADDRESS_LEN];
    hex::decode_to_slice(hex, &mut bytes)
        .map_err(|e| eyre::eyre!("invalid consensus address hex `{hex}`: {e}"))?;
    Ok(tendermint::account::Id::new(bytes))
}

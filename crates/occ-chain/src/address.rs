//! Account addresses: 20 raw bytes rendered as bech32 with the `sei` prefix.

use std::{
    fmt,
    str::FromStr,
};

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use sha2::{
    Digest as _,
    Sha256,
};

pub const ADDRESS_LEN: usize = 20;
pub const HUMAN_READABLE_ADDRESS_PREFIX: &str = "sei";

const BECH32_HRP: bech32::Hrp = bech32::Hrp::parse_unchecked(HUMAN_READABLE_ADDRESS_PREFIX);

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AddressError(AddressErrorKind);

impl AddressError {
    fn decode(source: bech32::DecodeError) -> Self {
        Self(AddressErrorKind::Decode {
            source,
        })
    }

    fn unknown_hrp(received: bech32::Hrp) -> Self {
        Self(AddressErrorKind::UnknownHrp {
            received,
        })
    }

    fn incorrect_length(received: usize) -> Self {
        Self(AddressErrorKind::IncorrectLength {
            received,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum AddressErrorKind {
    #[error("failed decoding provided bech32 string")]
    Decode { source: bech32::DecodeError },
    #[error("expected `\"{HUMAN_READABLE_ADDRESS_PREFIX}\"` as the bech32 prefix, got `\"{received}\"`")]
    UnknownHrp { received: bech32::Hrp },
    #[error("expected an address of {ADDRESS_LEN} bytes, got {received}")]
    IncorrectLength { received: usize },
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    #[must_use]
    pub const fn from_array(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn get(self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// The deterministic address of a module account.
    #[must_use]
    pub fn module(name: &str) -> Self {
        let digest = Sha256::new()
            .chain_update(b"module/")
            .chain_update(name.as_bytes())
            .finalize();
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }

    /// Parses a bech32 string with the `sei` prefix.
    ///
    /// # Errors
    /// Returns an error if the input is not bech32, carries another prefix, or does not
    /// decode to exactly 20 bytes.
    pub fn try_from_bech32(input: &str) -> Result<Self, AddressError> {
        let (hrp, bytes) = bech32::decode(input).map_err(AddressError::decode)?;
        if hrp != BECH32_HRP {
            return Err(AddressError::unknown_hrp(hrp));
        }
        let bytes = <[u8; ADDRESS_LEN]>::try_from(bytes.as_slice())
            .map_err(|_| AddressError::incorrect_length(bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bech32::encode_lower_to_fmt::<bech32::Bech32, _>(f, BECH32_HRP, &self.0)
            .map_err(|_| fmt::Error)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from_bech32(s)
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The consensus address of an ed25519 validator key: the first 20 bytes of its SHA-256
/// digest.
#[must_use]
pub fn consensus_address(consensus_key: &[u8; 32]) -> tendermint::account::Id {
    let digest = Sha256::digest(consensus_key);
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
    tendermint::account::Id::new(bytes)
}

//! Read a service config from `PREFIX`-ed environment variables.
//!
//! # Example
//! ```no_run
//! use serde::{
//!     Deserialize,
//!     Serialize,
//! };
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! #[serde(deny_unknown_fields)]
//! pub struct NodeConfig {
//!     pub log: String,
//!     pub occ_workers: usize,
//! }
//!
//! impl occ_config::Config for NodeConfig {
//!     const PREFIX: &'static str = "MY_NODE_";
//! }
//!
//! let config: NodeConfig = occ_config::get().unwrap();
//! ```
use serde::{
    de::DeserializeOwned,
    Serialize,
};


#[cfg(feature = "tests")]
pub use tests::{
    config_should_reject_unknown_var,
    example_env_config_is_up_to_date,
};

/// Reads `T` from the environment without importing the [`Config`] trait.
///
/// # Errors
/// Returns an error if a variable is missing, cannot be parsed, or is unknown to `T`.
pub fn get<T: Config>() -> Result<T, figment::Error> {
    T::get()
}

pub trait Config: Serialize + DeserializeOwned {
    /// The prefix shared by all environment variables of this config, e.g. `OCC_CHAIN_`.
    const PREFIX: &'static str;

    /// Reads the config from the process environment.
    ///
    /// `RUST_LOG` is picked up as the `log` field; every other field is read from
    /// [`Self::PREFIX`]-ed variables, which take precedence.
    ///
    /// # Errors
    /// Returns an error if a variable is missing, cannot be parsed, or is unknown to `Self`.
    fn get() -> Result<Self, figment::Error> {
        Self::get_with_prefix(Self::PREFIX, _internal::Internal)
    }

    #[doc(hidden)]
    fn get_with_prefix(
        prefix: &str,
        _internal: _internal::Internal,
    ) -> Result<Self, figment::Error> {
        use figment::{
            providers::Env,
            Figment,
        };
        Figment::new()
            .merge(Env::prefixed("RUST_").split("_").only(&["log"]))
            .merge(Env::prefixed(prefix))
            .extract()
    }
}

mod _internal {
    pub struct Internal;
}

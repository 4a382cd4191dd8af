//! Utilities to emit byte strings as log fields through their [`Display`] implementation.
use std::fmt::{
    Display,
    Formatter,
    Result,
};

use base64::{
    display::Base64Display,
    engine::general_purpose::GeneralPurpose,
};

/// Format `bytes` using standard base64 formatting.
pub fn base64<T: AsRef<[u8]> + ?Sized>(bytes: &T) -> Base64Display<'_, 'static, GeneralPurpose> {
    Base64Display::new(bytes.as_ref(), &base64::engine::general_purpose::STANDARD)
}

/// Format `bytes` as lower-cased hex.
///
/// # Example
/// ```
/// use occ_telemetry::display;
/// let app_hash = [0xde_u8, 0xad, 0xbe, 0xef];
/// tracing::info!(app_hash = %display::hex(&app_hash), "committed block");
/// ```
pub fn hex<T: AsRef<[u8]> + ?Sized>(bytes: &T) -> Hex<'_> {
    Hex(bytes.as_ref())
}

/// A byte slice that is displayed as lower-cased hex. See [`hex`].
pub struct Hex<'a>(&'a [u8]);

impl Display for Hex<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

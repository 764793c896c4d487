//! Lower-case, unpadded RFC 4648 base32, the text form of digests and keys.

use data_encoding::BASE32_NOPAD;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Base32Error {
    #[error("Invalid base32: {0}")]
    Decode(#[from] data_encoding::DecodeError),

    #[error("Expected {expected} bytes of base32, got {found}")]
    InvalidLength { expected: usize, found: usize },
}

pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    BASE32_NOPAD.encode(bytes.as_ref()).to_ascii_lowercase()
}

/// Decode base32 text. Upper-case input is accepted; padding is not.
pub fn decode(text: &str) -> Result<Vec<u8>, Base32Error> {
    Ok(BASE32_NOPAD.decode(text.to_ascii_uppercase().as_bytes())?)
}

/// Decode exactly `N` bytes.
pub fn decode_array<const N: usize>(text: &str) -> Result<[u8; N], Base32Error> {
    let bytes = decode(text)?;
    let found = bytes.len();
    bytes.try_into().map_err(|_| Base32Error::InvalidLength {
        expected: N,
        found,
    })
}

//! Canonical binary encoding.
//!
//! Values are written with borsh: compact, deterministic and not
//! self-describing. The reader must know the type it is decoding.
//!
//! | value                      | bytes                                        |
//! |----------------------------|----------------------------------------------|
//! | `bool`                     | one byte, `0` or `1`                         |
//! | integers                   | fixed width little-endian                    |
//! | `f32` / `f64`              | IEEE-754 little-endian, NaN rejected         |
//! | `String`, `Vec<T>`, maps   | `u32` LE count, then the items               |
//! | `Option<T>`                | tag `0`, or tag `1` then the value           |
//! | `Result<T, E>`             | tag `0` then the error, or `1` then the value|
//! | structs, tuples, arrays    | fields in order, no prefix                   |
//! | enums                      | `u8` variant index, then the variant fields  |
//!
//! Decoding only accepts canonical bytes: the input must be consumed exactly
//! and must be what encoding the decoded value produces again. That rejects
//! maps whose keys are out of order or repeated.

use std::io;

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Failed to encode value: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid encoding: {0}")]
    Invalid(String),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("Value is not canonically encoded")]
    NonCanonical,

    #[error("Invalid enum tag {tag} for {variants} variants")]
    InvalidEnumTag { tag: u8, variants: usize },
}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        EncodeError::Invalid(err.to_string())
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError::Invalid(err.to_string())
    }
}

/// Encode `value` to its canonical bytes.
pub fn to_vec<T: BorshSerialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
    Ok(borsh::to_vec(value)?)
}

/// Decode a `T` that must span all of `bytes` in canonical form.
pub fn from_slice<T: BorshSerialize + BorshDeserialize>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut rest = bytes;
    let value = T::deserialize(&mut rest)?;
    if !rest.is_empty() {
        return Err(DecodeError::TrailingBytes(rest.len()));
    }
    match to_vec(&value) {
        Ok(canonical) if canonical == bytes => Ok(value),
        _ => Err(DecodeError::NonCanonical),
    }
}

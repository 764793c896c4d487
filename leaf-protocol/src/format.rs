//! Structural descriptions of component payloads.

use std::collections::{BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};
use leaf_types::{Blob, Digest, Link, Snapshot};

use crate::codec::DecodeError;

/// The shape of an encoded value.
///
/// A `Format` is itself encodable, so it can be published alongside the
/// components it describes.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Format {
    Null,
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    I8,
    I16,
    I32,
    I64,
    I128,
    F32,
    F64,
    String,
    Option { format: Box<Format> },
    Array { format: Box<Format>, len: u32 },
    Struct { fields: Vec<(String, Format)> },
    Enum { variants: Vec<(String, Format)> },
    Vector { format: Box<Format> },
    Map { key: Box<Format>, value: Box<Format> },
    Set { format: Box<Format> },
    Blob,
    Snapshot,
    Link,
}

impl Format {
    pub fn option(format: Format) -> Self {
        Format::Option {
            format: Box::new(format),
        }
    }

    pub fn vector(format: Format) -> Self {
        Format::Vector {
            format: Box::new(format),
        }
    }

    pub fn structure<'a>(fields: impl IntoIterator<Item = (&'a str, Format)>) -> Self {
        Format::Struct {
            fields: fields
                .into_iter()
                .map(|(name, format)| (name.to_string(), format))
                .collect(),
        }
    }

    /// Check that `bytes` is exactly one encoded value of this format.
    pub fn validate(&self, bytes: &[u8]) -> Result<(), DecodeError> {
        let mut buf = bytes;
        self.walk(&mut buf)?;
        if buf.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes(buf.len()))
        }
    }

    fn walk(&self, buf: &mut &[u8]) -> Result<(), DecodeError> {
        match self {
            Format::Null => {}
            Format::Bool => {
                bool::deserialize(buf)?;
            }
            Format::U8 | Format::I8 => skip(buf, 1)?,
            Format::U16 | Format::I16 => skip(buf, 2)?,
            Format::U32 | Format::I32 => skip(buf, 4)?,
            Format::U64 | Format::I64 => skip(buf, 8)?,
            Format::U128 | Format::I128 => skip(buf, 16)?,
            Format::F32 => {
                f32::deserialize(buf)?;
            }
            Format::F64 => {
                f64::deserialize(buf)?;
            }
            Format::String => {
                String::deserialize(buf)?;
            }
            Format::Option { format } => match u8::deserialize(buf)? {
                0 => {}
                1 => format.walk(buf)?,
                tag => {
                    return Err(DecodeError::Invalid(format!(
                        "Invalid option tag {tag}"
                    )))
                }
            },
            Format::Array { format, len } => {
                for _ in 0..*len {
                    format.walk(buf)?;
                }
            }
            Format::Struct { fields } => {
                for (_, format) in fields {
                    format.walk(buf)?;
                }
            }
            Format::Enum { variants } => {
                let tag = u8::deserialize(buf)?;
                let (_, format) =
                    variants
                        .get(usize::from(tag))
                        .ok_or(DecodeError::InvalidEnumTag {
                            tag,
                            variants: variants.len(),
                        })?;
                format.walk(buf)?;
            }
            Format::Vector { format } | Format::Set { format } => {
                for _ in 0..u32::deserialize(buf)? {
                    format.walk(buf)?;
                }
            }
            Format::Map { key, value } => {
                for _ in 0..u32::deserialize(buf)? {
                    key.walk(buf)?;
                    value.walk(buf)?;
                }
            }
            Format::Blob | Format::Snapshot => skip(buf, 32)?,
            Format::Link => {
                Link::deserialize(buf)?;
            }
        }
        Ok(())
    }
}

fn skip(buf: &mut &[u8], len: usize) -> Result<(), DecodeError> {
    if buf.len() < len {
        return Err(DecodeError::Invalid(format!(
            "Unexpected end of input: wanted {len} bytes, {} left",
            buf.len()
        )));
    }
    *buf = &buf[len..];
    Ok(())
}

/// Types with a known [`Format`].
pub trait HasFormat {
    fn format() -> Format;
}

macro_rules! primitive_formats {
    ($($ty:ty => $format:ident),* $(,)?) => {
        $(impl HasFormat for $ty {
            fn format() -> Format {
                Format::$format
            }
        })*
    };
}

primitive_formats! {
    () => Null,
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    f32 => F32,
    f64 => F64,
    String => String,
    Blob => Blob,
    Snapshot => Snapshot,
    Link => Link,
}

impl HasFormat for Digest {
    fn format() -> Format {
        Format::Array {
            format: Box::new(Format::U8),
            len: 32,
        }
    }
}

impl<T: HasFormat> HasFormat for Option<T> {
    fn format() -> Format {
        Format::option(T::format())
    }
}

impl<T: HasFormat> HasFormat for Vec<T> {
    fn format() -> Format {
        Format::vector(T::format())
    }
}

impl<T: HasFormat, const N: usize> HasFormat for [T; N] {
    fn format() -> Format {
        Format::Array {
            format: Box::new(T::format()),
            len: N as u32,
        }
    }
}

impl<K: HasFormat, V: HasFormat> HasFormat for BTreeMap<K, V> {
    fn format() -> Format {
        Format::Map {
            key: Box::new(K::format()),
            value: Box::new(V::format()),
        }
    }
}

impl<T: HasFormat> HasFormat for BTreeSet<T> {
    fn format() -> Format {
        Format::Set {
            format: Box::new(T::format()),
        }
    }
}

impl<A: HasFormat, B: HasFormat> HasFormat for (A, B) {
    fn format() -> Format {
        Format::Struct {
            fields: vec![("0".to_string(), A::format()), ("1".to_string(), B::format())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_vec;
    use leaf_types::{ExactLink, KeyResolverKind};

    #[test]
    fn test_validate_primitives() {
        assert!(Format::U32.validate(&to_vec(&7_u32).unwrap()).is_ok());
        assert!(Format::U32.validate(&[1, 2]).is_err());
        assert!(Format::U8.validate(&[1, 2]).is_err());
        assert!(matches!(
            Format::Bool.validate(&[2]),
            Err(DecodeError::Invalid(_))
        ));
        assert_eq!(Format::U8.validate(&[1, 2]), Err(DecodeError::TrailingBytes(1)));
        assert!(Format::F32.validate(&f32::NAN.to_le_bytes()).is_err());
        assert!(Format::String.validate(&to_vec("leaf").unwrap()).is_ok());
        assert!(Format::Null.validate(&[]).is_ok());
    }

    #[test]
    fn test_validate_composites() {
        let format = <Vec<Option<u16>>>::format();
        let bytes = to_vec(&vec![Some(1_u16), None]).unwrap();
        assert!(format.validate(&bytes).is_ok());

        let record = Format::structure([("name", Format::String), ("size", Format::U64)]);
        let bytes = to_vec(&("img".to_string(), 42_u64)).unwrap();
        assert!(record.validate(&bytes).is_ok());
        assert!(record.validate(&bytes[..bytes.len() - 1]).is_err());

        let mut map = BTreeMap::new();
        map.insert(1_u8, "one".to_string());
        assert!(<BTreeMap<u8, String>>::format()
            .validate(&to_vec(&map).unwrap())
            .is_ok());
    }

    #[test]
    fn test_validate_enum_tags() {
        let format = Format::Enum {
            variants: vec![("A".into(), Format::Null), ("B".into(), Format::U8)],
        };
        assert!(format.validate(&[0]).is_ok());
        assert!(format.validate(&[1, 9]).is_ok());
        assert_eq!(
            format.validate(&[2]),
            Err(DecodeError::InvalidEnumTag {
                tag: 2,
                variants: 2
            })
        );
    }

    #[test]
    fn test_validate_link() {
        let link: Link = ExactLink::new([3; 32], [4; 32], ["a", "b"]).into();
        assert!(Format::Link.validate(&to_vec(&link).unwrap()).is_ok());

        let custom = Link {
            namespace: KeyResolverKind::Custom {
                id: Digest::new(b"resolver"),
                data: vec![1, 2],
            },
            ..link
        };
        assert!(Format::Link.validate(&to_vec(&custom).unwrap()).is_ok());
        assert!(Format::Link.validate(&[0]).is_err());
    }

    #[test]
    fn test_format_is_encodable() {
        let format = <Option<Vec<u8>>>::format();
        let bytes = to_vec(&format).unwrap();
        assert_eq!(bytes, vec![15, 19, 2]);
        assert_eq!(crate::codec::from_slice::<Format>(&bytes).unwrap(), format);
    }
}

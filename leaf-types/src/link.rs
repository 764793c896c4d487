//! Entity paths and links.
//!
//! An [`ExactLink`] names an entity by namespace, subspace and path. Its text
//! form is `<namespace>/<subspace>/<segment>/...` where the keys are base32
//! and each segment is written as:
//!
//! | segment          | text                 |
//! |------------------|----------------------|
//! | `Null`           | `null`               |
//! | `Bool(b)`        | `bool:true`          |
//! | `Uint(n)`        | `u:42`               |
//! | `Int(n)`         | `i:-7`               |
//! | `Bytes(b)`       | `b:<base32>`         |
//! | `String(s)`      | `s` or `s:<s>`       |
//!
//! Inside strings `%` and `/` are escaped as `%25` and `%2F`.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

use crate::base32::{self, Base32Error};
use crate::Digest;

/// Public key of a namespace.
pub type NamespaceId = [u8; 32];
/// Public key of a subspace.
pub type SubspaceId = [u8; 32];
/// Secret key of a namespace.
pub type NamespaceSecretKey = [u8; 32];
/// Secret key of a subspace.
pub type SubspaceSecretKey = [u8; 32];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseLinkError {
    #[error("Link must contain a namespace and a subspace")]
    MissingKeys,

    #[error("Invalid key: {0}")]
    InvalidKey(#[from] Base32Error),

    #[error("Invalid path segment {segment:?}: {reason}")]
    InvalidSegment { segment: String, reason: String },
}

/// One element of an entity path.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Null,
    Bool(bool),
    Uint(u64),
    Int(i64),
    String(String),
    Bytes(Vec<u8>),
}

impl From<()> for PathSegment {
    fn from(_: ()) -> Self {
        PathSegment::Null
    }
}

impl From<bool> for PathSegment {
    fn from(value: bool) -> Self {
        PathSegment::Bool(value)
    }
}

impl From<u64> for PathSegment {
    fn from(value: u64) -> Self {
        PathSegment::Uint(value)
    }
}

impl From<u32> for PathSegment {
    fn from(value: u32) -> Self {
        PathSegment::Uint(value.into())
    }
}

impl From<i64> for PathSegment {
    fn from(value: i64) -> Self {
        PathSegment::Int(value)
    }
}

impl From<i32> for PathSegment {
    fn from(value: i32) -> Self {
        PathSegment::Int(value.into())
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::String(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::String(value)
    }
}

impl From<Vec<u8>> for PathSegment {
    fn from(value: Vec<u8>) -> Self {
        PathSegment::Bytes(value)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Null => f.write_str("null"),
            PathSegment::Bool(value) => write!(f, "bool:{value}"),
            PathSegment::Uint(value) => write!(f, "u:{value}"),
            PathSegment::Int(value) => write!(f, "i:{value}"),
            PathSegment::Bytes(bytes) => write!(f, "b:{}", base32::encode(bytes)),
            PathSegment::String(text) => {
                let escaped = escape(text);
                if needs_string_prefix(text) {
                    write!(f, "s:{escaped}")
                } else {
                    f.write_str(&escaped)
                }
            }
        }
    }
}

impl FromStr for PathSegment {
    type Err = ParseLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ParseLinkError::InvalidSegment {
            segment: s.to_string(),
            reason,
        };
        if s == "null" {
            return Ok(PathSegment::Null);
        }
        if let Some(rest) = s.strip_prefix("bool:") {
            return rest
                .parse()
                .map(PathSegment::Bool)
                .map_err(|e| invalid(format!("{e}")));
        }
        if let Some(rest) = s.strip_prefix("u:") {
            return rest
                .parse()
                .map(PathSegment::Uint)
                .map_err(|e| invalid(format!("{e}")));
        }
        if let Some(rest) = s.strip_prefix("i:") {
            return rest
                .parse()
                .map(PathSegment::Int)
                .map_err(|e| invalid(format!("{e}")));
        }
        if let Some(rest) = s.strip_prefix("b:") {
            return base32::decode(rest)
                .map(PathSegment::Bytes)
                .map_err(|e| invalid(e.to_string()));
        }
        let text = s.strip_prefix("s:").unwrap_or(s);
        unescape(text).map(PathSegment::String).map_err(invalid)
    }
}

const TYPED_PREFIXES: [&str; 5] = ["bool:", "u:", "i:", "b:", "s:"];

fn needs_string_prefix(text: &str) -> bool {
    text.is_empty() || text == "null" || TYPED_PREFIXES.iter().any(|p| text.starts_with(p))
}

fn escape(text: &str) -> String {
    text.replace('%', "%25").replace('/', "%2F")
}

fn unescape(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest.find('%') {
        out.push_str(&rest[..index]);
        let escape = rest.get(index..index + 3).unwrap_or(&rest[index..]);
        match escape {
            "%25" => out.push('%'),
            "%2F" | "%2f" => out.push('/'),
            other => return Err(format!("unknown escape {other:?}")),
        }
        rest = &rest[index + escape.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

/// An ordered sequence of path segments.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityPath(pub Vec<PathSegment>);

impl EntityPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    /// Builder-style [`EntityPath::push`].
    pub fn join(mut self, segment: impl Into<PathSegment>) -> Self {
        self.push(segment);
        self
    }

    pub fn starts_with(&self, prefix: &EntityPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<Vec<PathSegment>> for EntityPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        EntityPath(segments)
    }
}

impl<const N: usize, T: Into<PathSegment>> From<[T; N]> for EntityPath {
    fn from(segments: [T; N]) -> Self {
        EntityPath(segments.into_iter().map(Into::into).collect())
    }
}

impl FromIterator<PathSegment> for EntityPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        EntityPath(iter.into_iter().collect())
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A fully resolved entity address.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExactLink {
    pub namespace: NamespaceId,
    pub subspace: SubspaceId,
    pub path: EntityPath,
}

impl ExactLink {
    pub fn new(
        namespace: NamespaceId,
        subspace: SubspaceId,
        path: impl Into<EntityPath>,
    ) -> Self {
        Self {
            namespace,
            subspace,
            path: path.into(),
        }
    }
}

impl<P: Into<EntityPath>> From<(NamespaceId, SubspaceId, P)> for ExactLink {
    fn from((namespace, subspace, path): (NamespaceId, SubspaceId, P)) -> Self {
        ExactLink::new(namespace, subspace, path)
    }
}

impl fmt::Display for ExactLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            base32::encode(self.namespace),
            base32::encode(self.subspace)
        )?;
        for segment in &self.path.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for ExactLink {
    type Err = ParseLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(namespace), Some(subspace)) = (parts.next(), parts.next()) else {
            return Err(ParseLinkError::MissingKeys);
        };
        let namespace = base32::decode_array(namespace)?;
        let subspace = base32::decode_array(subspace)?;
        let path = parts
            .map(str::parse::<PathSegment>)
            .collect::<Result<EntityPath, _>>()?;
        Ok(ExactLink {
            namespace,
            subspace,
            path,
        })
    }
}

/// A descriptor for a custom key resolution scheme.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyResolver {
    pub name: String,
    pub specification: Digest,
}

/// How a [`Link`] finds a namespace or subspace key.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyResolverKind {
    Inline([u8; 32]),
    Custom { id: Digest, data: Vec<u8> },
}

/// A reference to an entity, optionally pinned to a snapshot.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link {
    pub namespace: KeyResolverKind,
    pub subspace: KeyResolverKind,
    pub path: EntityPath,
    pub snapshot: Option<Digest>,
}

impl From<ExactLink> for Link {
    fn from(link: ExactLink) -> Self {
        Link {
            namespace: KeyResolverKind::Inline(link.namespace),
            subspace: KeyResolverKind::Inline(link.subspace),
            path: link.path,
            snapshot: None,
        }
    }
}

impl Link {
    /// The exact link, when both keys are given inline.
    pub fn as_exact(&self) -> Option<ExactLink> {
        match (&self.namespace, &self.subspace) {
            (KeyResolverKind::Inline(namespace), KeyResolverKind::Inline(subspace)) => {
                Some(ExactLink {
                    namespace: *namespace,
                    subspace: *subspace,
                    path: self.path.clone(),
                })
            }
            _ => None,
        }
    }
}

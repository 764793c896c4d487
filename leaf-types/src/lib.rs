//! Shared types for Leaf
//!
//! This crate provides the plain data vocabulary used across the Leaf client:
//! digests, entity links and paths, entities and component envelopes.
//! Encoding and hashing rules for these types live in `leaf-protocol`.

pub mod base32;
mod digest;
mod entity;
mod link;

pub use digest::{Digest, ParseDigestError};
pub use entity::{
    Blob, ComponentData, ComponentEntry, ComponentKind, EncryptionAlgorithm, Entity, Snapshot,
};
pub use link::{
    EntityPath, ExactLink, KeyResolver, KeyResolverKind, Link, NamespaceId, NamespaceSecretKey,
    ParseLinkError, PathSegment, SubspaceId, SubspaceSecretKey,
};

//! Entities and the component envelopes they reference.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::Digest;

/// An unordered set of component references.
///
/// The wire form lists entries in canonical order; canonicalization lives
/// with the codec in `leaf-protocol`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Entity {
    pub components: Vec<ComponentEntry>,
}

impl Entity {
    pub fn new(components: Vec<ComponentEntry>) -> Self {
        Self { components }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Entries whose schema is `schema`.
    pub fn entries_for(&self, schema: Digest) -> impl Iterator<Item = &ComponentEntry> {
        self.components
            .iter()
            .filter(move |entry| entry.schema_id == Some(schema))
    }
}

/// A reference from an entity to one component.
///
/// `schema_id` is absent for encrypted components.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentEntry {
    pub schema_id: Option<Digest>,
    pub component_id: Digest,
}

/// A schema-tagged component payload.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentData {
    pub schema: Digest,
    pub data: Vec<u8>,
}

/// Describes an encryption scheme by name and specification entity.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncryptionAlgorithm {
    pub name: String,
    pub specification: Digest,
}

/// The envelope a component is stored and addressed in.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Unencrypted(ComponentData),
    Encrypted {
        algorithm: EncryptionAlgorithm,
        key_id: [u8; 32],
        encrypted_data: Vec<u8>,
    },
}

impl ComponentKind {
    /// The schema id, when the envelope is not encrypted.
    pub fn schema_id(&self) -> Option<Digest> {
        match self {
            ComponentKind::Unencrypted(data) => Some(data.schema),
            ComponentKind::Encrypted { .. } => None,
        }
    }

    pub fn as_unencrypted(&self) -> Option<&ComponentData> {
        match self {
            ComponentKind::Unencrypted(data) => Some(data),
            ComponentKind::Encrypted { .. } => None,
        }
    }
}

impl From<ComponentData> for ComponentKind {
    fn from(data: ComponentData) -> Self {
        ComponentKind::Unencrypted(data)
    }
}

/// Digest of an opaque blob.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Blob(pub Digest);

/// Digest of an entity snapshot.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snapshot(pub Digest);

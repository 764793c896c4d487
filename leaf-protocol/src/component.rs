//! Component types and type-erased component values.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use borsh::{BorshDeserialize, BorshSerialize};
use leaf_types::{ComponentData, ComponentKind, Digest};
use thiserror::Error;

use crate::codec::{self, DecodeError, EncodeError};
use crate::format::{Format, HasFormat};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("Failed to decode component: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encrypted components are not supported")]
    EncryptedUnsupported,

    #[error("Schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: Digest, found: Digest },
}

/// A typed component.
///
/// The schema id of a component type is derived from [`Component::NAME`] and
/// the entity built from [`Component::specification`], so two types with the
/// same name and specification share a schema.
pub trait Component:
    BorshSerialize + BorshDeserialize + HasFormat + Send + Sync + 'static
{
    const NAME: &'static str;

    /// Components describing this one.
    fn specification() -> Vec<AnyComponent> {
        Vec::new()
    }
}

/// A runtime handle to a [`Component`] type.
#[derive(Clone, Copy)]
pub struct ComponentType {
    type_id: TypeId,
    name: &'static str,
    format: fn() -> Format,
    specification: fn() -> Vec<AnyComponent>,
}

impl ComponentType {
    pub fn of<C: Component>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: C::NAME,
            format: C::format,
            specification: C::specification,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn format(&self) -> Format {
        (self.format)()
    }

    pub fn specification(&self) -> Vec<AnyComponent> {
        (self.specification)()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn is<C: Component>(&self) -> bool {
        self.type_id == TypeId::of::<C>()
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.name)
    }
}

trait ErasedComponent: Send + Sync {
    fn encode(&self) -> Result<Vec<u8>, EncodeError>;
    fn as_any(&self) -> &dyn Any;
}

impl<C: Component> ErasedComponent for C {
    fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        codec::to_vec(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A component value of any type, used for heterogeneous lists such as
/// specifications and batched writes.
pub struct AnyComponent {
    ty: ComponentType,
    value: Box<dyn ErasedComponent>,
}

impl AnyComponent {
    pub fn new<C: Component>(component: C) -> Self {
        Self {
            ty: ComponentType::of::<C>(),
            value: Box::new(component),
        }
    }

    pub fn component_type(&self) -> ComponentType {
        self.ty
    }

    /// Canonical payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        self.value.encode()
    }

    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.value.as_any().downcast_ref()
    }
}

impl<C: Component> From<C> for AnyComponent {
    fn from(component: C) -> Self {
        AnyComponent::new(component)
    }
}

impl fmt::Debug for AnyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyComponent").field(&self.ty.name).finish()
    }
}

/// The content id of an unencrypted component.
pub fn component_id(data: &ComponentData) -> Result<Digest, EncodeError> {
    envelope_id(&ComponentKind::Unencrypted(data.clone()))
}

/// The content id of any component envelope.
pub fn envelope_id(kind: &ComponentKind) -> Result<Digest, EncodeError> {
    Ok(Digest::new(&codec::to_vec(kind)?))
}

/// Decode a component envelope and check it carries `expected` schema.
pub fn open_envelope(bytes: &[u8], expected: Digest) -> Result<ComponentData, ComponentError> {
    match codec::from_slice::<ComponentKind>(bytes)? {
        ComponentKind::Encrypted { .. } => Err(ComponentError::EncryptedUnsupported),
        ComponentKind::Unencrypted(data) if data.schema != expected => {
            Err(ComponentError::SchemaMismatch {
                expected,
                found: data.schema,
            })
        }
        ComponentKind::Unencrypted(data) => Ok(data),
    }
}

/// Decode a typed component payload.
pub fn decode_payload<C: Component>(data: &ComponentData) -> Result<C, ComponentError> {
    Ok(codec::from_slice(&data.data)?)
}

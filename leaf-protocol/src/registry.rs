//! Schema ids and the component type registry.
//!
//! A schema id is the digest of `(name, specification_id)`, where the
//! specification id is the digest of the entity formed by the component's
//! specification components. Since those components are themselves typed,
//! computing one schema id can require computing others. Results are cached
//! per type; a type that reaches itself through its own specification is
//! rejected.

use std::any::TypeId;
use std::collections::HashMap;

use leaf_types::{ComponentData, ComponentEntry, Digest, Entity};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::codec::{self, EncodeError};
use crate::component::{self, AnyComponent, Component, ComponentType};
use crate::components;
use crate::entity::{EntityError, EntityExt};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Component {0} depends on its own schema")]
    Cycle(&'static str),

    #[error("Failed to encode component: {0}")]
    Encode(#[from] EncodeError),

    #[error("Invalid specification entity: {0}")]
    Entity(#[from] EntityError),
}

/// Caches schema ids and maps them back to component types.
#[derive(Default)]
pub struct ComponentRegistry {
    schema_ids: RwLock<HashMap<TypeId, Digest>>,
    types: RwLock<HashMap<Digest, ComponentType>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in components already resolved.
    pub fn with_standard_components() -> Result<Self, SchemaError> {
        let registry = Self::new();
        for ty in components::standard_components() {
            registry.schema_id_of(&ty)?;
        }
        Ok(registry)
    }

    pub fn register<C: Component>(&self) -> Result<Digest, SchemaError> {
        self.schema_id::<C>()
    }

    pub fn schema_id<C: Component>(&self) -> Result<Digest, SchemaError> {
        self.schema_id_of(&ComponentType::of::<C>())
    }

    pub fn schema_id_of(&self, ty: &ComponentType) -> Result<Digest, SchemaError> {
        let mut in_progress = Vec::new();
        self.resolve(ty, &mut in_progress)
    }

    /// The registered type for `schema`, if any type with that id was resolved.
    pub fn lookup(&self, schema: &Digest) -> Option<ComponentType> {
        self.types.read().get(schema).copied()
    }

    pub fn len(&self) -> usize {
        self.schema_ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The specification entity of `ty`.
    pub fn specification_entity(&self, ty: &ComponentType) -> Result<Entity, SchemaError> {
        let mut in_progress = vec![ty.type_id()];
        self.build_specification(ty, &mut in_progress)
    }

    /// Tag a component value with its schema and encode it.
    pub fn make_data(&self, component: &AnyComponent) -> Result<ComponentData, SchemaError> {
        Ok(ComponentData {
            schema: self.schema_id_of(&component.component_type())?,
            data: component.encode()?,
        })
    }

    pub fn component_id(&self, component: &AnyComponent) -> Result<Digest, SchemaError> {
        Ok(component::component_id(&self.make_data(component)?)?)
    }

    /// The entry referencing `component` from an entity.
    pub fn make_entry(&self, component: &AnyComponent) -> Result<ComponentEntry, SchemaError> {
        let data = self.make_data(component)?;
        Ok(ComponentEntry {
            schema_id: Some(data.schema),
            component_id: component::component_id(&data)?,
        })
    }

    /// The canonical entity made of `components`.
    pub fn entity_of(&self, components: &[AnyComponent]) -> Result<Entity, SchemaError> {
        let mut entity = Entity::new(
            components
                .iter()
                .map(|component| self.make_entry(component))
                .collect::<Result<_, _>>()?,
        );
        entity.canonicalize()?;
        Ok(entity)
    }

    /// Digest of the entity `components` would form on the server.
    pub fn entity_digest(&self, components: &[AnyComponent]) -> Result<Digest, SchemaError> {
        Ok(self.entity_of(components)?.compute_digest()?)
    }

    fn resolve(
        &self,
        ty: &ComponentType,
        in_progress: &mut Vec<TypeId>,
    ) -> Result<Digest, SchemaError> {
        if let Some(id) = self.schema_ids.read().get(&ty.type_id()) {
            return Ok(*id);
        }
        if in_progress.contains(&ty.type_id()) {
            return Err(SchemaError::Cycle(ty.name()));
        }

        in_progress.push(ty.type_id());
        let specification = self.build_specification(ty, in_progress);
        in_progress.pop();

        let specification_id = specification?.compute_digest()?;
        let schema_id = derive_schema_id(ty.name(), specification_id)?;
        debug!(component = ty.name(), %schema_id, "resolved schema id");

        self.schema_ids.write().insert(ty.type_id(), schema_id);
        self.types.write().insert(schema_id, *ty);
        Ok(schema_id)
    }

    fn build_specification(
        &self,
        ty: &ComponentType,
        in_progress: &mut Vec<TypeId>,
    ) -> Result<Entity, SchemaError> {
        let mut entity = Entity::default();
        for part in ty.specification() {
            let schema = self.resolve(&part.component_type(), in_progress)?;
            let data = ComponentData {
                schema,
                data: part.encode()?,
            };
            entity.components.push(ComponentEntry {
                schema_id: Some(schema),
                component_id: component::component_id(&data)?,
            });
        }
        entity.canonicalize()?;
        Ok(entity)
    }
}

/// The schema id of a component called `name` whose specification entity
/// has digest `specification_id`.
pub fn derive_schema_id(name: &str, specification_id: Digest) -> Result<Digest, EncodeError> {
    Ok(Digest::new(&codec::to_vec(&(name, specification_id))?))
}

/// Schema id of `C` computed without a shared cache.
pub fn schema_id<C: Component>() -> Result<Digest, SchemaError> {
    ComponentRegistry::new().schema_id::<C>()
}

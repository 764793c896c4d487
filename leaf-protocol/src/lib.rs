//! Leaf data model
//!
//! The canonical encoding, payload formats, typed components and schema ids,
//! and entity digests. Everything here is pure: no I/O and no runtime.

pub mod codec;
pub mod component;
pub mod components;
pub mod entity;
pub mod format;
pub mod registry;

pub use codec::{DecodeError, EncodeError};
pub use component::{AnyComponent, Component, ComponentError, ComponentType};
pub use entity::{EntityError, EntityExt};
pub use format::{Format, HasFormat};
pub use registry::{ComponentRegistry, SchemaError};

pub use leaf_types;

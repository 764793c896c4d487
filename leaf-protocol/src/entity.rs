//! Entity canonicalization and digests.
//!
//! An entity is a multiset of component entries. Its canonical form sorts the
//! entries by their encoded bytes, so the digest does not depend on insertion
//! order. Repeated entries are kept and count towards the digest.

use leaf_types::{ComponentEntry, Digest, Entity};
use thiserror::Error;

use crate::codec::{self, EncodeError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("Failed to encode entity: {0}")]
    Encode(#[from] EncodeError),

    #[error("Component entry encodings are not prefix-free")]
    AmbiguousOrder,
}

/// Canonical ordering and hashing for [`Entity`].
pub trait EntityExt {
    /// Sort entries into canonical order.
    fn canonicalize(&mut self) -> Result<(), EntityError>;

    /// BLAKE3 of the canonical encoding. Does not modify `self`.
    fn compute_digest(&self) -> Result<Digest, EntityError>;

    fn is_canonical(&self) -> Result<bool, EntityError>;
}

impl EntityExt for Entity {
    fn canonicalize(&mut self) -> Result<(), EntityError> {
        self.components = canonical_entries(&self.components)?;
        Ok(())
    }

    fn compute_digest(&self) -> Result<Digest, EntityError> {
        let canonical = Entity::new(canonical_entries(&self.components)?);
        Ok(Digest::new(&codec::to_vec(&canonical)?))
    }

    fn is_canonical(&self) -> Result<bool, EntityError> {
        Ok(canonical_entries(&self.components)? == self.components)
    }
}

fn canonical_entries(entries: &[ComponentEntry]) -> Result<Vec<ComponentEntry>, EntityError> {
    let mut keyed = entries
        .iter()
        .map(|entry| Ok((codec::to_vec(entry)?, *entry)))
        .collect::<Result<Vec<_>, EncodeError>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    // Any strict prefix relation would show up between neighbours.
    if keyed
        .windows(2)
        .any(|pair| pair[1].0.len() > pair[0].0.len() && pair[1].0.starts_with(&pair[0].0))
    {
        return Err(EntityError::AmbiguousOrder);
    }

    Ok(keyed.into_iter().map(|(_, entry)| entry).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(schema: Option<&[u8]>, component: &[u8]) -> ComponentEntry {
        ComponentEntry {
            schema_id: schema.map(Digest::new),
            component_id: Digest::new(component),
        }
    }

    #[test]
    fn test_empty_entity_digest() {
        let entity = Entity::default();
        assert_eq!(
            entity.compute_digest().unwrap(),
            Digest::new(&[0, 0, 0, 0])
        );
        assert!(entity.is_canonical().unwrap());
    }

    #[test]
    fn test_canonical_order_keeps_duplicates() {
        let a = entry(Some(b"s1"), b"a");
        let b = entry(None, b"b");
        let c = entry(Some(b"s2"), b"c");

        let mut entity = Entity::new(vec![c, a, b, a]);
        assert!(!entity.is_canonical().unwrap());
        let digest = entity.compute_digest().unwrap();
        entity.canonicalize().unwrap();

        assert_eq!(entity.components.len(), 4);
        // Entries without a schema start with tag 0 and sort first.
        assert_eq!(entity.components[0], b);
        assert_eq!(entity.components[1], entity.components[2]);
        assert!(entity.is_canonical().unwrap());
        assert_eq!(entity.compute_digest().unwrap(), digest);
    }

    #[test]
    fn test_duplicates_change_the_digest() {
        let a = entry(Some(b"s"), b"a");
        let once = Entity::new(vec![a]);
        let twice = Entity::new(vec![a, a]);
        assert_ne!(
            once.compute_digest().unwrap(),
            twice.compute_digest().unwrap()
        );
        assert!(twice.is_canonical().unwrap());

        let mut expected = vec![2, 0, 0, 0];
        for _ in 0..2 {
            expected.extend(codec::to_vec(&a).unwrap());
        }
        assert_eq!(twice.compute_digest().unwrap(), Digest::new(&expected));
    }
}

//! Request and response messages.
//!
//! Every frame on the connection is one encoded [`Req`] or [`Resp`]. The
//! variant order of [`ReqKind`] and [`RespKind`] fixes their wire tags and
//! must not change. A response result is tagged `Err` = 0, `Ok` = 1.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use leaf_types::{
    ComponentData, Digest, Entity, ExactLink, NamespaceId, NamespaceSecretKey, SubspaceId,
    SubspaceSecretKey,
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct Req {
    pub id: u64,
    pub kind: ReqKind,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum ReqKind {
    Authenticate(String),
    ReadEntity(ExactLink),
    DelEntity(ExactLink),
    GetComponentsBySchema {
        link: ExactLink,
        schemas: Vec<Digest>,
    },
    DelComponentsBySchema {
        link: ExactLink,
        schemas: Vec<Digest>,
    },
    AddComponents {
        link: ExactLink,
        components: Vec<ComponentData>,
        replace_existing: bool,
    },
    ListEntities(ExactLink),
    CreateNamespace,
    ImportNamespaceSecret(NamespaceSecretKey),
    GetNamespaceSecret(NamespaceId),
    CreateSubspace,
    ImportSubspaceSecret(SubspaceSecretKey),
    GetSubspaceSecret(SubspaceId),
    GetLocalSecret(String),
    SetLocalSecret(String, Option<String>),
    ListLocalSecrets,
}

impl ReqKind {
    pub fn name(&self) -> &'static str {
        match self {
            ReqKind::Authenticate(_) => "Authenticate",
            ReqKind::ReadEntity(_) => "ReadEntity",
            ReqKind::DelEntity(_) => "DelEntity",
            ReqKind::GetComponentsBySchema { .. } => "GetComponentsBySchema",
            ReqKind::DelComponentsBySchema { .. } => "DelComponentsBySchema",
            ReqKind::AddComponents { .. } => "AddComponents",
            ReqKind::ListEntities(_) => "ListEntities",
            ReqKind::CreateNamespace => "CreateNamespace",
            ReqKind::ImportNamespaceSecret(_) => "ImportNamespaceSecret",
            ReqKind::GetNamespaceSecret(_) => "GetNamespaceSecret",
            ReqKind::CreateSubspace => "CreateSubspace",
            ReqKind::ImportSubspaceSecret(_) => "ImportSubspaceSecret",
            ReqKind::GetSubspaceSecret(_) => "GetSubspaceSecret",
            ReqKind::GetLocalSecret(_) => "GetLocalSecret",
            ReqKind::SetLocalSecret(..) => "SetLocalSecret",
            ReqKind::ListLocalSecrets => "ListLocalSecrets",
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct Resp {
    pub id: u64,
    pub result: Result<RespKind, String>,
}

/// Components of one entity, grouped by schema. Each payload is an encoded
/// component envelope.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct GetComponentsInner {
    pub entity_digest: Digest,
    pub components: BTreeMap<Digest, Vec<Vec<u8>>>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum RespKind {
    Authenticated,
    ReadEntity(Option<(Digest, Entity)>),
    DelEntity,
    GetComponentsBySchema(Option<GetComponentsInner>),
    DelComponentsBySchema(Option<Digest>),
    AddComponents(Digest),
    ListEntities(Vec<ExactLink>),
    CreateNamespace(NamespaceId),
    ImportNamespaceSecret(NamespaceId),
    GetNamespaceSecret(Option<NamespaceSecretKey>),
    CreateSubspace(SubspaceId),
    ImportSubspaceSecret(SubspaceId),
    GetSubspaceSecret(Option<SubspaceSecretKey>),
    GetLocalSecret(Option<String>),
    SetLocalSecret,
    ListLocalSecrets(BTreeMap<String, String>),
}

impl RespKind {
    pub fn name(&self) -> &'static str {
        match self {
            RespKind::Authenticated => "Authenticated",
            RespKind::ReadEntity(_) => "ReadEntity",
            RespKind::DelEntity => "DelEntity",
            RespKind::GetComponentsBySchema(_) => "GetComponentsBySchema",
            RespKind::DelComponentsBySchema(_) => "DelComponentsBySchema",
            RespKind::AddComponents(_) => "AddComponents",
            RespKind::ListEntities(_) => "ListEntities",
            RespKind::CreateNamespace(_) => "CreateNamespace",
            RespKind::ImportNamespaceSecret(_) => "ImportNamespaceSecret",
            RespKind::GetNamespaceSecret(_) => "GetNamespaceSecret",
            RespKind::CreateSubspace(_) => "CreateSubspace",
            RespKind::ImportSubspaceSecret(_) => "ImportSubspaceSecret",
            RespKind::GetSubspaceSecret(_) => "GetSubspaceSecret",
            RespKind::GetLocalSecret(_) => "GetLocalSecret",
            RespKind::SetLocalSecret => "SetLocalSecret",
            RespKind::ListLocalSecrets(_) => "ListLocalSecrets",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaf_protocol::codec::{from_slice, to_vec};

    #[test]
    fn test_request_layout() {
        let req = Req {
            id: 1,
            kind: ReqKind::ListLocalSecrets,
        };
        assert_eq!(to_vec(&req).unwrap(), vec![1, 0, 0, 0, 0, 0, 0, 0, 15]);

        let req = Req {
            id: 2,
            kind: ReqKind::Authenticate("t".into()),
        };
        assert_eq!(
            to_vec(&req).unwrap(),
            vec![2, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, b't']
        );
    }

    #[test]
    fn test_response_puts_error_first() {
        let err = Resp {
            id: 3,
            result: Err("x".into()),
        };
        let bytes = to_vec(&err).unwrap();
        assert_eq!(bytes, vec![3, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, b'x']);
        assert_eq!(from_slice::<Resp>(&bytes).unwrap(), err);

        let ok = Resp {
            id: 4,
            result: Ok(RespKind::SetLocalSecret),
        };
        let bytes = to_vec(&ok).unwrap();
        assert_eq!(bytes, vec![4, 0, 0, 0, 0, 0, 0, 0, 1, 14]);
        assert_eq!(from_slice::<Resp>(&bytes).unwrap(), ok);
    }

    #[test]
    fn test_response_roundtrip() {
        let mut components = BTreeMap::new();
        components.insert(Digest::new(b"schema"), vec![vec![1, 2], vec![]]);
        let resp = Resp {
            id: u64::MAX,
            result: Ok(RespKind::GetComponentsBySchema(Some(GetComponentsInner {
                entity_digest: Digest::new(b"entity"),
                components,
            }))),
        };
        assert_eq!(from_slice::<Resp>(&to_vec(&resp).unwrap()).unwrap(), resp);
    }
}

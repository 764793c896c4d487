//! Typed operations on top of [`RpcClient::request`].

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};

use leaf_protocol::component::{decode_payload, open_envelope};
use leaf_protocol::{AnyComponent, Component, ComponentError, ComponentType};
use leaf_types::{
    ComponentData, Digest, Entity, ExactLink, NamespaceId, NamespaceSecretKey, SubspaceId,
    SubspaceSecretKey,
};
use tracing::warn;

use crate::client::RpcClient;
use crate::error::ClientError;
use crate::proto::{ReqKind, RespKind};

fn invalid(expected: &'static str, found: &RespKind) -> ClientError {
    ClientError::InvalidResponse {
        expected,
        found: found.name(),
    }
}

/// Components read from one entity, keyed by the requested types.
#[derive(Debug, Clone)]
pub struct GetComponentsResult {
    digest: Digest,
    components: HashMap<TypeId, Vec<Result<ComponentData, ComponentError>>>,
}

impl GetComponentsResult {
    /// Digest of the entity the components were read from.
    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Raw entries for `ty`, including ones that could not be opened.
    pub fn entries(&self, ty: &ComponentType) -> &[Result<ComponentData, ComponentError>] {
        self.components
            .get(&ty.type_id())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every component of type `C`, decoded.
    pub fn all<C: Component>(&self) -> Vec<Result<C, ComponentError>> {
        self.entries(&ComponentType::of::<C>())
            .iter()
            .map(|entry| match entry {
                Ok(data) => decode_payload(data),
                Err(err) => Err(err.clone()),
            })
            .collect()
    }

    /// The first component of type `C` that decodes.
    pub fn get<C: Component>(&self) -> Option<C> {
        self.all::<C>().into_iter().find_map(Result::ok)
    }
}

impl RpcClient {
    pub async fn read_entity(
        &self,
        link: impl Into<ExactLink>,
    ) -> Result<Option<(Digest, Entity)>, ClientError> {
        match self.request(ReqKind::ReadEntity(link.into())).await? {
            RespKind::ReadEntity(entity) => Ok(entity),
            other => Err(invalid("ReadEntity", &other)),
        }
    }

    pub async fn del_entity(&self, link: impl Into<ExactLink>) -> Result<(), ClientError> {
        match self.request(ReqKind::DelEntity(link.into())).await? {
            RespKind::DelEntity => Ok(()),
            other => Err(invalid("DelEntity", &other)),
        }
    }

    /// Links of the entities under `prefix`.
    pub async fn list_entities(
        &self,
        prefix: impl Into<ExactLink>,
    ) -> Result<Vec<ExactLink>, ClientError> {
        match self.request(ReqKind::ListEntities(prefix.into())).await? {
            RespKind::ListEntities(links) => Ok(links),
            other => Err(invalid("ListEntities", &other)),
        }
    }

    /// Add components to an entity, creating it if needed. With
    /// `replace_existing`, components sharing a schema with a new one are
    /// removed first. Returns the new entity digest.
    pub async fn add_components(
        &self,
        link: impl Into<ExactLink>,
        components: impl IntoIterator<Item = AnyComponent>,
        replace_existing: bool,
    ) -> Result<Digest, ClientError> {
        let components = components
            .into_iter()
            .map(|component| self.registry().make_data(&component))
            .collect::<Result<Vec<_>, _>>()?;
        let kind = ReqKind::AddComponents {
            link: link.into(),
            components,
            replace_existing,
        };
        match self.request(kind).await? {
            RespKind::AddComponents(digest) => Ok(digest),
            other => Err(invalid("AddComponents", &other)),
        }
    }

    pub async fn add_component<C: Component>(
        &self,
        link: impl Into<ExactLink>,
        component: C,
        replace_existing: bool,
    ) -> Result<Digest, ClientError> {
        self.add_components(link, [AnyComponent::new(component)], replace_existing)
            .await
    }

    /// Remove every component of the given types. `None` when nothing was
    /// removed.
    pub async fn del_components(
        &self,
        link: impl Into<ExactLink>,
        types: &[ComponentType],
    ) -> Result<Option<Digest>, ClientError> {
        let schemas = types
            .iter()
            .map(|ty| self.registry().schema_id_of(ty))
            .collect::<Result<Vec<_>, _>>()?;
        let kind = ReqKind::DelComponentsBySchema {
            link: link.into(),
            schemas,
        };
        match self.request(kind).await? {
            RespKind::DelComponentsBySchema(digest) => Ok(digest),
            other => Err(invalid("DelComponentsBySchema", &other)),
        }
    }

    /// Read the components of the given types. `None` when the entity does
    /// not exist.
    pub async fn get_components(
        &self,
        link: impl Into<ExactLink>,
        types: &[ComponentType],
    ) -> Result<Option<GetComponentsResult>, ClientError> {
        let requested = types
            .iter()
            .map(|ty| Ok((self.registry().schema_id_of(ty)?, *ty)))
            .collect::<Result<Vec<_>, ClientError>>()?;
        let kind = ReqKind::GetComponentsBySchema {
            link: link.into(),
            schemas: requested.iter().map(|(schema, _)| *schema).collect(),
        };

        let inner = match self.request(kind).await? {
            RespKind::GetComponentsBySchema(Some(inner)) => inner,
            RespKind::GetComponentsBySchema(None) => return Ok(None),
            other => return Err(invalid("GetComponentsBySchema", &other)),
        };

        let mut components = HashMap::new();
        for (schema, payloads) in inner.components {
            let Some((_, ty)) = requested.iter().find(|(id, _)| *id == schema) else {
                warn!(%schema, "server returned components for a schema that was not requested");
                continue;
            };
            let entries = payloads
                .iter()
                .map(|payload| open_envelope(payload, schema))
                .collect::<Vec<_>>();
            for err in entries.iter().filter_map(|entry| entry.as_ref().err()) {
                warn!(component = ty.name(), %err, "skipping component");
            }
            components.insert(ty.type_id(), entries);
        }

        Ok(Some(GetComponentsResult {
            digest: inner.entity_digest,
            components,
        }))
    }

    /// Every decodable component of type `C` on an entity.
    pub async fn get_component_list<C: Component>(
        &self,
        link: impl Into<ExactLink>,
    ) -> Result<Option<(Digest, Vec<C>)>, ClientError> {
        let Some(result) = self
            .get_components(link, &[ComponentType::of::<C>()])
            .await?
        else {
            return Ok(None);
        };
        let mut list = Vec::new();
        for component in result.all::<C>() {
            match component {
                Ok(component) => list.push(component),
                Err(err) => warn!(component = C::NAME, %err, "failed to decode component"),
            }
        }
        Ok(Some((result.digest(), list)))
    }

    pub async fn create_namespace(&self) -> Result<NamespaceId, ClientError> {
        match self.request(ReqKind::CreateNamespace).await? {
            RespKind::CreateNamespace(id) => Ok(id),
            other => Err(invalid("CreateNamespace", &other)),
        }
    }

    pub async fn import_namespace_secret(
        &self,
        secret: NamespaceSecretKey,
    ) -> Result<NamespaceId, ClientError> {
        match self.request(ReqKind::ImportNamespaceSecret(secret)).await? {
            RespKind::ImportNamespaceSecret(id) => Ok(id),
            other => Err(invalid("ImportNamespaceSecret", &other)),
        }
    }

    pub async fn get_namespace_secret(
        &self,
        id: NamespaceId,
    ) -> Result<Option<NamespaceSecretKey>, ClientError> {
        match self.request(ReqKind::GetNamespaceSecret(id)).await? {
            RespKind::GetNamespaceSecret(secret) => Ok(secret),
            other => Err(invalid("GetNamespaceSecret", &other)),
        }
    }

    pub async fn create_subspace(&self) -> Result<SubspaceId, ClientError> {
        match self.request(ReqKind::CreateSubspace).await? {
            RespKind::CreateSubspace(id) => Ok(id),
            other => Err(invalid("CreateSubspace", &other)),
        }
    }

    pub async fn import_subspace_secret(
        &self,
        secret: SubspaceSecretKey,
    ) -> Result<SubspaceId, ClientError> {
        match self.request(ReqKind::ImportSubspaceSecret(secret)).await? {
            RespKind::ImportSubspaceSecret(id) => Ok(id),
            other => Err(invalid("ImportSubspaceSecret", &other)),
        }
    }

    pub async fn get_subspace_secret(
        &self,
        id: SubspaceId,
    ) -> Result<Option<SubspaceSecretKey>, ClientError> {
        match self.request(ReqKind::GetSubspaceSecret(id)).await? {
            RespKind::GetSubspaceSecret(secret) => Ok(secret),
            other => Err(invalid("GetSubspaceSecret", &other)),
        }
    }

    pub async fn get_local_secret(
        &self,
        key: impl Into<String>,
    ) -> Result<Option<String>, ClientError> {
        match self.request(ReqKind::GetLocalSecret(key.into())).await? {
            RespKind::GetLocalSecret(value) => Ok(value),
            other => Err(invalid("GetLocalSecret", &other)),
        }
    }

    /// Store a server-local secret. `None` deletes it.
    pub async fn set_local_secret(
        &self,
        key: impl Into<String>,
        value: Option<String>,
    ) -> Result<(), ClientError> {
        match self
            .request(ReqKind::SetLocalSecret(key.into(), value))
            .await?
        {
            RespKind::SetLocalSecret => Ok(()),
            other => Err(invalid("SetLocalSecret", &other)),
        }
    }

    pub async fn list_local_secrets(&self) -> Result<BTreeMap<String, String>, ClientError> {
        match self.request(ReqKind::ListLocalSecrets).await? {
            RespKind::ListLocalSecrets(secrets) => Ok(secrets),
            other => Err(invalid("ListLocalSecrets", &other)),
        }
    }
}

//! An in-memory Leaf server for client tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use leaf_protocol::codec;
use leaf_protocol::component::envelope_id;
use leaf_protocol::EntityExt;
use leaf_rpc::proto::{GetComponentsInner, Req, ReqKind, Resp, RespKind};
use leaf_rpc::transport::{memory_transport, MemoryListener, MemoryServerConnection};
use leaf_rpc::{Backoff, ClientOptions, RpcClient};
use leaf_types::{
    ComponentEntry, ComponentKind, Digest, Entity, EntityPath, ExactLink, NamespaceId,
    NamespaceSecretKey, SubspaceId, SubspaceSecretKey,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

pub type SharedStore = Arc<Mutex<Store>>;

/// Entities, keys and local secrets held by the mock server.
#[derive(Default)]
pub struct Store {
    entities: BTreeMap<ExactLink, Vec<ComponentKind>>,
    namespaces: BTreeMap<NamespaceId, NamespaceSecretKey>,
    subspaces: BTreeMap<SubspaceId, SubspaceSecretKey>,
    secrets: BTreeMap<String, String>,
    keys_created: u8,
    pub authentications: usize,
}

// Stand-in for real key derivation.
fn public_key(secret: &[u8; 32]) -> [u8; 32] {
    *Digest::new(secret).as_bytes()
}

fn entity_of(components: &[ComponentKind]) -> Result<(Digest, Entity), String> {
    let mut entity = Entity::default();
    for component in components {
        entity.components.push(ComponentEntry {
            schema_id: component.schema_id(),
            component_id: envelope_id(component).map_err(|e| e.to_string())?,
        });
    }
    entity.canonicalize().map_err(|e| e.to_string())?;
    let digest = entity.compute_digest().map_err(|e| e.to_string())?;
    Ok((digest, entity))
}

impl Store {
    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Store::default()))
    }

    fn next_secret(&mut self, tag: u8) -> [u8; 32] {
        self.keys_created += 1;
        *Digest::new(&[tag, self.keys_created]).as_bytes()
    }

    pub fn handle(&mut self, kind: ReqKind) -> Result<RespKind, String> {
        Ok(match kind {
            ReqKind::Authenticate(_) => {
                self.authentications += 1;
                RespKind::Authenticated
            }
            ReqKind::ReadEntity(link) => RespKind::ReadEntity(
                self.entities
                    .get(&link)
                    .map(|components| entity_of(components))
                    .transpose()?,
            ),
            ReqKind::DelEntity(link) => {
                self.entities.remove(&link);
                RespKind::DelEntity
            }
            ReqKind::GetComponentsBySchema { link, schemas } => {
                let Some(components) = self.entities.get(&link) else {
                    return Ok(RespKind::GetComponentsBySchema(None));
                };
                let (entity_digest, _) = entity_of(components)?;
                let mut found = BTreeMap::new();
                for schema in schemas {
                    let payloads = components
                        .iter()
                        .filter(|component| component.schema_id() == Some(schema))
                        .map(|component| codec::to_vec(component).map_err(|e| e.to_string()))
                        .collect::<Result<Vec<_>, _>>()?;
                    found.insert(schema, payloads);
                }
                RespKind::GetComponentsBySchema(Some(GetComponentsInner {
                    entity_digest,
                    components: found,
                }))
            }
            ReqKind::DelComponentsBySchema { link, schemas } => {
                let Some(components) = self.entities.get_mut(&link) else {
                    return Ok(RespKind::DelComponentsBySchema(None));
                };
                let before = components.len();
                components.retain(|component| {
                    !component
                        .schema_id()
                        .is_some_and(|schema| schemas.contains(&schema))
                });
                if components.len() == before {
                    RespKind::DelComponentsBySchema(None)
                } else {
                    RespKind::DelComponentsBySchema(Some(entity_of(components)?.0))
                }
            }
            ReqKind::AddComponents {
                link,
                components,
                replace_existing,
            } => {
                let existing = self.entities.entry(link).or_default();
                if replace_existing {
                    existing.retain(|component| {
                        !components
                            .iter()
                            .any(|new| component.schema_id() == Some(new.schema))
                    });
                }
                existing.extend(components.into_iter().map(ComponentKind::Unencrypted));
                RespKind::AddComponents(entity_of(existing)?.0)
            }
            ReqKind::ListEntities(prefix) => RespKind::ListEntities(
                self.entities
                    .keys()
                    .filter(|link| {
                        link.namespace == prefix.namespace
                            && link.subspace == prefix.subspace
                            && link.path.starts_with(&prefix.path)
                    })
                    .cloned()
                    .collect(),
            ),
            ReqKind::CreateNamespace => {
                let secret = self.next_secret(b'n');
                let id = public_key(&secret);
                self.namespaces.insert(id, secret);
                RespKind::CreateNamespace(id)
            }
            ReqKind::ImportNamespaceSecret(secret) => {
                let id = public_key(&secret);
                self.namespaces.insert(id, secret);
                RespKind::ImportNamespaceSecret(id)
            }
            ReqKind::GetNamespaceSecret(id) => {
                RespKind::GetNamespaceSecret(self.namespaces.get(&id).copied())
            }
            ReqKind::CreateSubspace => {
                let secret = self.next_secret(b's');
                let id = public_key(&secret);
                self.subspaces.insert(id, secret);
                RespKind::CreateSubspace(id)
            }
            ReqKind::ImportSubspaceSecret(secret) => {
                let id = public_key(&secret);
                self.subspaces.insert(id, secret);
                RespKind::ImportSubspaceSecret(id)
            }
            ReqKind::GetSubspaceSecret(id) => {
                RespKind::GetSubspaceSecret(self.subspaces.get(&id).copied())
            }
            ReqKind::GetLocalSecret(key) => RespKind::GetLocalSecret(self.secrets.get(&key).cloned()),
            ReqKind::SetLocalSecret(key, value) => {
                match value {
                    Some(value) => self.secrets.insert(key, value),
                    None => self.secrets.remove(&key),
                };
                RespKind::SetLocalSecret
            }
            ReqKind::ListLocalSecrets => RespKind::ListLocalSecrets(self.secrets.clone()),
        })
    }
}

fn encode(resp: &Resp) -> Vec<u8> {
    codec::to_vec(resp).expect("responses encode")
}

/// Answer requests in order. With a token, every request before a matching
/// `Authenticate` is refused.
pub async fn serve(mut conn: MemoryServerConnection, store: SharedStore, token: Option<String>) {
    let mut authenticated = token.is_none();
    while let Some(frame) = conn.recv().await {
        let Ok(req) = codec::from_slice::<Req>(&frame) else {
            break;
        };
        let result = match (&req.kind, &token) {
            (ReqKind::Authenticate(given), Some(expected)) if given != expected => {
                Err("invalid token".to_string())
            }
            (ReqKind::Authenticate(_), _) => {
                authenticated = true;
                store.lock().handle(req.kind.clone())
            }
            _ if !authenticated => Err("Unauthenticated".to_string()),
            _ => store.lock().handle(req.kind.clone()),
        };
        if conn.send(encode(&Resp { id: req.id, result })).is_err() {
            break;
        }
    }
}

/// Hold responses until `batch` requests arrived, then send them in a
/// seeded random order.
pub async fn serve_shuffled(
    mut conn: MemoryServerConnection,
    store: SharedStore,
    batch: usize,
    mut seed: u64,
) {
    let mut held = Vec::new();
    while let Some(frame) = conn.recv().await {
        let req: Req = codec::from_slice(&frame).expect("requests decode");
        let result = store.lock().handle(req.kind);
        held.push(Resp { id: req.id, result });
        if held.len() == batch {
            for i in (1..held.len()).rev() {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                held.swap(i, (seed % (i as u64 + 1)) as usize);
            }
            for resp in held.drain(..) {
                if conn.send(encode(&resp)).is_err() {
                    return;
                }
            }
        }
    }
}

/// Accept one connection and answer each request with whatever frames
/// `script` returns.
pub fn spawn_scripted<F>(mut listener: MemoryListener, mut script: F) -> JoinHandle<()>
where
    F: FnMut(Req) -> Vec<Vec<u8>> + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut conn) = listener.accept().await else {
            return;
        };
        while let Some(frame) = conn.recv().await {
            let req: Req = codec::from_slice(&frame).expect("requests decode");
            for reply in script(req) {
                if conn.send(reply).is_err() {
                    return;
                }
            }
        }
    })
}

pub fn reply(id: u64, result: Result<RespKind, String>) -> Vec<u8> {
    encode(&Resp { id, result })
}

/// Serve every connection the client opens.
pub fn spawn_server(
    mut listener: MemoryListener,
    store: SharedStore,
    token: Option<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(conn) = listener.accept().await {
            tokio::spawn(serve(conn, store.clone(), token.clone()));
        }
    })
}

pub fn fast_options() -> ClientOptions {
    ClientOptions::default().with_backoff(Backoff {
        initial: Duration::from_millis(5),
        max: Duration::from_millis(20),
    })
}

pub fn start(options: ClientOptions) -> (RpcClient, MemoryListener) {
    let (connector, listener) = memory_transport();
    (RpcClient::new(connector, options), listener)
}

pub fn entity_link(path: impl Into<EntityPath>) -> ExactLink {
    ExactLink::new([7; 32], [9; 32], path)
}

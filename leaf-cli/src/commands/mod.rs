//! CLI command implementations.

pub mod entity;
pub mod keys;
pub mod schema;
pub mod secret;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use leaf_protocol::ComponentRegistry;
use leaf_rpc::transport::WebSocketConnector;
use leaf_rpc::{ClientConfig, ClientOptions, RpcClient};

pub use entity::{del_entity, get_entity, list_entities, read_entity, set_description, set_name};
pub use keys::{create_namespace, create_subspace, import_namespace, import_subspace};
pub use schema::schema_ids;
pub use secret::{get_secret, list_secrets, set_secret};

/// Start a client for `config` and wait up to `timeout_secs` for it to connect.
pub async fn connect(config: &ClientConfig, timeout_secs: u64) -> Result<RpcClient> {
    let registry = ComponentRegistry::with_standard_components()
        .context("Failed to compute standard schema ids")?;
    let options = ClientOptions::from(config).with_registry(Arc::new(registry));
    let client = RpcClient::new(WebSocketConnector::new(config.url.clone()), options);

    tokio::time::timeout(Duration::from_secs(timeout_secs), client.wait_connected())
        .await
        .with_context(|| format!("Timed out connecting to {}", config.url))??;
    Ok(client)
}

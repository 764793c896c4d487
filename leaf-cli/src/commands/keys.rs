//! Namespace and subspace keys.

use anyhow::Result;
use leaf_rpc::RpcClient;
use leaf_types::{base32, NamespaceSecretKey, SubspaceSecretKey};

pub async fn create_namespace(client: &RpcClient) -> Result<()> {
    let id = client.create_namespace().await?;
    println!("{}", base32::encode(id));
    Ok(())
}

pub async fn create_subspace(client: &RpcClient) -> Result<()> {
    let id = client.create_subspace().await?;
    println!("{}", base32::encode(id));
    Ok(())
}

pub async fn import_namespace(client: &RpcClient, secret: NamespaceSecretKey) -> Result<()> {
    let id = client.import_namespace_secret(secret).await?;
    println!("{}", base32::encode(id));
    Ok(())
}

pub async fn import_subspace(client: &RpcClient, secret: SubspaceSecretKey) -> Result<()> {
    let id = client.import_subspace_secret(secret).await?;
    println!("{}", base32::encode(id));
    Ok(())
}

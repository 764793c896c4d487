use anyhow::{bail, Result};
use leaf_rpc::RpcClient;

pub async fn get_secret(client: &RpcClient, key: String) -> Result<()> {
    match client.get_local_secret(key.as_str()).await? {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => bail!("No secret named {key}"),
    }
}

pub async fn set_secret(client: &RpcClient, key: String, value: Option<String>) -> Result<()> {
    client.set_local_secret(key, value).await?;
    Ok(())
}

pub async fn list_secrets(client: &RpcClient) -> Result<()> {
    for (key, value) in client.list_local_secrets().await? {
        println!("{key}\t{value}");
    }
    Ok(())
}

//! Reading and editing entities.

use anyhow::{bail, Result};
use leaf_protocol::components::{CommonMark, DateCreated, DateUpdated, Description, Name, Utf8};
use leaf_protocol::ComponentType;
use leaf_rpc::RpcClient;
use leaf_types::ExactLink;

pub async fn read_entity(client: &RpcClient, link: ExactLink) -> Result<()> {
    let Some((digest, entity)) = client.read_entity(link.clone()).await? else {
        bail!("No entity at {link}");
    };
    println!("{digest}");
    for entry in &entity.components {
        let schema = match entry.schema_id {
            Some(schema) => client
                .registry()
                .lookup(&schema)
                .map(|ty| ty.name().to_string())
                .unwrap_or_else(|| schema.to_string()),
            None => "-".to_string(),
        };
        println!("  {}  {schema}", entry.component_id);
    }
    Ok(())
}

pub async fn list_entities(client: &RpcClient, prefix: ExactLink) -> Result<()> {
    for link in client.list_entities(prefix).await? {
        println!("{link}");
    }
    Ok(())
}

pub async fn del_entity(client: &RpcClient, link: ExactLink) -> Result<()> {
    client.del_entity(link).await?;
    Ok(())
}

/// Print the human-readable components of an entity.
pub async fn get_entity(client: &RpcClient, link: ExactLink) -> Result<()> {
    let types = [
        ComponentType::of::<Name>(),
        ComponentType::of::<Description>(),
        ComponentType::of::<CommonMark>(),
        ComponentType::of::<Utf8>(),
        ComponentType::of::<DateCreated>(),
        ComponentType::of::<DateUpdated>(),
    ];
    let Some(result) = client.get_components(link.clone(), &types).await? else {
        bail!("No entity at {link}");
    };

    println!("digest: {}", result.digest());
    for name in result.all::<Name>().into_iter().flatten() {
        println!("name: {}", name.0);
    }
    for description in result.all::<Description>().into_iter().flatten() {
        println!("description: {}", description.0);
    }
    for date in result.all::<DateCreated>().into_iter().flatten() {
        print_date("created", date.to_datetime(), date.0);
    }
    for date in result.all::<DateUpdated>().into_iter().flatten() {
        print_date("updated", date.to_datetime(), date.0);
    }
    for text in result.all::<Utf8>().into_iter().flatten() {
        println!("text:\n{}", text.0);
    }
    for markdown in result.all::<CommonMark>().into_iter().flatten() {
        println!("markdown:\n{}", markdown.0);
    }
    Ok(())
}

fn print_date(label: &str, date: Option<chrono::DateTime<chrono::Utc>>, raw: u64) {
    match date {
        Some(date) => println!("{label}: {}", date.to_rfc3339()),
        None => println!("{label}: {raw}"),
    }
}

pub async fn set_name(client: &RpcClient, link: ExactLink, name: String) -> Result<()> {
    let digest = client.add_component(link, Name(name), true).await?;
    println!("{digest}");
    Ok(())
}

pub async fn set_description(
    client: &RpcClient,
    link: ExactLink,
    description: String,
) -> Result<()> {
    let digest = client
        .add_component(link, Description(description), true)
        .await?;
    println!("{digest}");
    Ok(())
}

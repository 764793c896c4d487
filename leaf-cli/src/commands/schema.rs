use anyhow::Result;
use leaf_protocol::components::standard_components;
use leaf_protocol::ComponentRegistry;

/// Print `<schema id>  <name>` for every standard component. Needs no server.
pub fn schema_ids() -> Result<()> {
    let registry = ComponentRegistry::new();
    for ty in standard_components() {
        println!("{}  {}", registry.schema_id_of(&ty)?, ty.name());
    }
    Ok(())
}

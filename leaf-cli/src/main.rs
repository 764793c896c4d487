//! # leaf CLI
//!
//! Command-line client for Leaf servers.

mod commands;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use leaf_rpc::ClientConfig;
use leaf_types::{base32, ExactLink};

#[derive(Parser)]
#[command(name = "leaf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// WebSocket URL of the Leaf server
    #[arg(long, env = "LEAF_URL")]
    url: Option<String>,

    /// Token used to authenticate each connection
    #[arg(long, env = "LEAF_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Path to a YAML configuration file
    #[arg(long, env = "LEAF_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds to wait for the connection and for each response. A
    /// `request_timeout_ms` in the config file takes precedence for responses.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema id of every standard component
    SchemaIds,

    /// Create a namespace and print its id
    CreateNamespace,

    /// Create a subspace and print its id
    CreateSubspace,

    /// Import a namespace secret key
    ImportNamespace {
        /// Base32 secret key
        #[arg(value_parser = parse_key)]
        secret: [u8; 32],
    },

    /// Import a subspace secret key
    ImportSubspace {
        /// Base32 secret key
        #[arg(value_parser = parse_key)]
        secret: [u8; 32],
    },

    /// Print an entity's digest and component entries
    Read { link: ExactLink },

    /// List entities under a link prefix
    List { link: ExactLink },

    /// Delete an entity
    DelEntity { link: ExactLink },

    /// Print the text components of an entity
    Get { link: ExactLink },

    /// Replace an entity's name
    SetName { link: ExactLink, name: String },

    /// Replace an entity's description
    SetDescription {
        link: ExactLink,
        description: String,
    },

    /// Server-local secrets
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },
}

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Print one secret
    Get { key: String },

    /// Store a secret, or delete it when no value is given
    Set { key: String, value: Option<String> },

    /// Print every secret
    List,
}

fn parse_key(text: &str) -> Result<[u8; 32], base32::Base32Error> {
    base32::decode_array(text)
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge the config file with flags and environment. Flags win.
fn resolve_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match (&cli.config, &cli.url) {
        (Some(path), _) => ClientConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, Some(url)) => ClientConfig::new(url.clone()),
        (None, None) => bail!("no server URL: pass --url, set LEAF_URL or use --config"),
    };
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(token) = &cli.auth_token {
        config.auth_token = Some(token.clone());
    }
    config
        .request_timeout_ms
        .get_or_insert(cli.timeout.saturating_mul(1000));
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::SchemaIds = cli.command {
        return commands::schema_ids();
    }

    let config = resolve_config(&cli)?;
    let client = commands::connect(&config, cli.timeout).await?;

    match cli.command {
        Commands::SchemaIds => commands::schema_ids(),
        Commands::CreateNamespace => commands::create_namespace(&client).await,
        Commands::CreateSubspace => commands::create_subspace(&client).await,
        Commands::ImportNamespace { secret } => commands::import_namespace(&client, secret).await,
        Commands::ImportSubspace { secret } => commands::import_subspace(&client, secret).await,
        Commands::Read { link } => commands::read_entity(&client, link).await,
        Commands::List { link } => commands::list_entities(&client, link).await,
        Commands::DelEntity { link } => commands::del_entity(&client, link).await,
        Commands::Get { link } => commands::get_entity(&client, link).await,
        Commands::SetName { link, name } => commands::set_name(&client, link, name).await,
        Commands::SetDescription { link, description } => {
            commands::set_description(&client, link, description).await
        }
        Commands::Secret { command } => match command {
            SecretCommands::Get { key } => commands::get_secret(&client, key).await,
            SecretCommands::Set { key, value } => commands::set_secret(&client, key, value).await,
            SecretCommands::List => commands::list_secrets(&client).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.yml");
        std::fs::write(&path, "url: ws://from-file\nauth_token: file-token\n").unwrap();

        let cli = Cli::parse_from([
            "leaf",
            "--config",
            path.to_str().unwrap(),
            "--auth-token",
            "flag-token",
            "secret",
            "list",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.url, "ws://from-file");
        assert_eq!(config.auth_token.as_deref(), Some("flag-token"));
    }

    #[test]
    fn test_timeout_bounds_requests() {
        let cli = Cli::parse_from(["leaf", "--url", "ws://x", "--timeout", "3", "secret", "list"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(3)));

        let cli = Cli::parse_from(["leaf", "--url", "ws://x", "secret", "list"]);
        assert_eq!(
            resolve_config(&cli).unwrap().request_timeout(),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_config_request_timeout_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.yml");
        std::fs::write(&path, "url: ws://from-file
request_timeout_ms: 1500
").unwrap();

        let cli = Cli::parse_from([
            "leaf",
            "--config",
            path.to_str().unwrap(),
            "--timeout",
            "3",
            "secret",
            "list",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_key_argument() {
        assert_eq!(parse_key(&"a".repeat(52)).unwrap(), [0; 32]);
        assert!(parse_key("not-base32").is_err());
    }
}

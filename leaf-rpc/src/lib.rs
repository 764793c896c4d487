//! Leaf RPC client
//!
//! Talks to a Leaf server over a single duplex connection, multiplexing any
//! number of concurrent requests. See [`RpcClient`] for the connection model
//! and the `api` module for typed operations.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod proto;
pub mod transport;

pub use api::GetComponentsResult;
pub use client::{Backoff, ClientOptions, ConnectionState, RpcClient};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, TransportError};

pub use leaf_protocol;
pub use leaf_types;

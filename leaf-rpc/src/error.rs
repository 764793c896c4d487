//! Client and transport errors.

use leaf_protocol::{DecodeError, EncodeError, SchemaError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Connection error: {0}")]
    Io(String),

    #[error("Connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match error {
            Error::ConnectionClosed | Error::AlreadyClosed => TransportError::Closed,
            other => TransportError::Io(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Failed to encode request: {0}")]
    Encode(#[from] EncodeError),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid RPC response: expected {expected}, got {found}")]
    InvalidResponse {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Error from Leaf RPC endpoint: {0}")]
    Server(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Request {0} timed out")]
    Timeout(u64),

    #[error("Client is shut down")]
    Closed,
}

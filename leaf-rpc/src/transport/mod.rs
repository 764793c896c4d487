//! Frame transports.
//!
//! The client only needs an ordered, reliable stream of binary frames in
//! each direction. [`Connector`] opens one such connection; the client calls
//! it again whenever the previous connection is lost.

mod memory;
mod websocket;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};

use crate::error::TransportError;

pub use memory::{memory_transport, MemoryConnector, MemoryListener, MemoryServerConnection};
pub use websocket::WebSocketConnector;

pub type FrameSink = Pin<Box<dyn Sink<Vec<u8>, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// One open duplex connection.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Connection, TransportError>;

    /// Where this connector connects to, for logs.
    fn endpoint(&self) -> String;
}

//! An in-process transport.
//!
//! [`memory_transport`] returns a connector for the client and a listener
//! that plays the server. Each `connect` waits until the listener accepts it.
//! Dropping a [`MemoryServerConnection`] closes that connection.

use async_trait::async_trait;
use futures::channel::mpsc as frames;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use super::{Connection, Connector};
use crate::error::TransportError;

type Pending = (MemoryServerConnection, oneshot::Sender<()>);

pub fn memory_transport() -> (MemoryConnector, MemoryListener) {
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    (
        MemoryConnector {
            incoming: incoming_tx,
        },
        MemoryListener {
            incoming: incoming_rx,
        },
    )
}

#[derive(Clone)]
pub struct MemoryConnector {
    incoming: mpsc::UnboundedSender<Pending>,
}

pub struct MemoryListener {
    incoming: mpsc::UnboundedReceiver<Pending>,
}

/// The server half of one in-memory connection.
pub struct MemoryServerConnection {
    requests: frames::UnboundedReceiver<Vec<u8>>,
    responses: frames::UnboundedSender<Vec<u8>>,
}

impl MemoryListener {
    /// Wait for the next client connection. `None` once every connector is gone.
    pub async fn accept(&mut self) -> Option<MemoryServerConnection> {
        loop {
            let (connection, accepted) = self.incoming.recv().await?;
            // The client may have given up while queued.
            if accepted.send(()).is_ok() {
                return Some(connection);
            }
        }
    }
}

impl MemoryServerConnection {
    /// Next request frame. `None` once the client closed the connection.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.requests.next().await
    }

    pub fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.responses
            .unbounded_send(frame)
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let (request_tx, request_rx) = frames::unbounded();
        let (response_tx, response_rx) = frames::unbounded();
        let (accepted_tx, accepted_rx) = oneshot::channel();

        let server = MemoryServerConnection {
            requests: request_rx,
            responses: response_tx,
        };
        self.incoming
            .send((server, accepted_tx))
            .map_err(|_| TransportError::Connect("listener is gone".into()))?;
        accepted_rx
            .await
            .map_err(|_| TransportError::Connect("connection refused".into()))?;

        Ok(Connection {
            sink: Box::pin(request_tx.sink_map_err(|_| TransportError::Closed)),
            stream: Box::pin(response_rx.map(Ok::<_, TransportError>)),
        })
    }

    fn endpoint(&self) -> String {
        "memory".to_string()
    }
}

//! WebSocket transport: one binary message per frame, text and control
//! messages skipped.

use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use super::{Connection, Connector};
use crate::error::TransportError;

/// Connects to a Leaf server over WebSocket, one binary message per frame.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(url = %self.url, "websocket connected");

        let (write, read) = socket.split();
        let sink = write
            .sink_map_err(TransportError::from)
            .with(|frame: Vec<u8>| future::ready(Ok::<_, TransportError>(Message::Binary(frame.into()))));

        let stream = read
            .take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)))))
            .filter_map(|message| {
                future::ready(match message {
                    Ok(Message::Binary(bytes)) => Some(Ok(bytes.to_vec())),
                    Ok(Message::Text(text)) => {
                        warn!(text = text.as_str(), "ignoring text frame from server");
                        None
                    }
                    Ok(_) => None,
                    Err(error) => Some(Err(TransportError::from(error))),
                })
            });

        Ok(Connection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

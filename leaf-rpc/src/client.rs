//! The multiplexed RPC client.
//!
//! One background task owns the connection. It connects, pumps frames in
//! both directions and reconnects with exponential backoff when the
//! connection ends. Callers never touch the connection directly: they wait
//! for the `Connected` state, register a pending slot keyed by request id and
//! hand the encoded frame to the task. Responses are routed back to their
//! slot by id, in whatever order the server sends them.
//!
//! Authentication is per connection. When a token is configured, the first
//! request on each new connection authenticates it before anything else is
//! sent, and concurrent requests wait for that one attempt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use leaf_protocol::{codec, ComponentRegistry};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::proto::{Req, ReqKind, Resp, RespKind};
use crate::transport::{Connection, Connector, WebSocketConnector};

/// Where the client's connection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected { generation: u64, authenticated: bool },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected {
                authenticated: true,
                ..
            }
        )
    }
}

/// Reconnect delays: start at `initial`, double per failure, cap at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct ClientOptions {
    pub auth_token: Option<String>,
    pub request_timeout: Option<Duration>,
    pub backoff: Backoff,
    pub registry: Arc<ComponentRegistry>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auth_token: None,
            request_timeout: None,
            backoff: Backoff::default(),
            registry: Arc::new(ComponentRegistry::new()),
        }
    }
}

impl ClientOptions {
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

impl From<&ClientConfig> for ClientOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            auth_token: config.auth_token.clone(),
            request_timeout: config.request_timeout(),
            backoff: config.backoff(),
            registry: Arc::new(ComponentRegistry::new()),
        }
    }
}

/// A frame queued for the current connection.
struct Outgoing {
    id: u64,
    frame: Vec<u8>,
}

struct LiveLink {
    generation: u64,
    frames: mpsc::UnboundedSender<Outgoing>,
}

struct Inner {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Resp>>>,
    link: Mutex<Option<LiveLink>>,
    state: watch::Sender<ConnectionState>,
    auth_token: Option<String>,
    auth_lock: tokio::sync::Mutex<()>,
    request_timeout: Option<Duration>,
    registry: Arc<ComponentRegistry>,
    // Dropped with the last client handle, which stops the driver task.
    _shutdown: oneshot::Sender<()>,
}

/// A cheaply cloneable handle to one logical connection.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

impl RpcClient {
    /// Start a client over `connector`. Must be called within a tokio runtime.
    pub fn new(connector: impl Connector, options: ClientOptions) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let inner = Arc::new(Inner {
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            link: Mutex::new(None),
            state,
            auth_token: options.auth_token,
            auth_lock: tokio::sync::Mutex::new(()),
            request_timeout: options.request_timeout,
            registry: options.registry,
            _shutdown: shutdown_tx,
        });

        tokio::spawn(drive(
            Arc::downgrade(&inner),
            Box::new(connector),
            options.backoff,
            shutdown_rx,
        ));

        Self { inner }
    }

    /// Connect to the WebSocket endpoint named in `config`.
    pub fn connect(config: &ClientConfig) -> Self {
        info!(url = %config.url, "starting Leaf client");
        Self::new(
            WebSocketConnector::new(config.url.clone()),
            ClientOptions::from(config),
        )
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.inner.registry
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver for connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Requests sent but not yet answered.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Wait until a connection is open.
    pub async fn wait_connected(&self) -> Result<(), ClientError> {
        self.ready().await.map(|_| ())
    }

    /// Send `kind` and wait for the server's answer, authenticating first if
    /// the current connection needs it.
    pub async fn request(&self, kind: ReqKind) -> Result<RespKind, ClientError> {
        loop {
            let (generation, authenticated) = self.ready().await?;
            if self.inner.auth_token.is_some() && !authenticated {
                self.authenticate(generation).await?;
                continue;
            }
            if let Some(resp) = self.send(generation, kind.clone(), false).await? {
                return resp.result.map_err(ClientError::Server);
            }
            debug!(request = kind.name(), "connection lost before send, retrying");
        }
    }

    async fn ready(&self) -> Result<(u64, bool), ClientError> {
        let mut state = self.inner.state.subscribe();
        let current = *state
            .wait_for(ConnectionState::is_connected)
            .await
            .map_err(|_| ClientError::Closed)?;
        match current {
            ConnectionState::Connected {
                generation,
                authenticated,
            } => Ok((generation, authenticated)),
            _ => Err(ClientError::Closed),
        }
    }

    async fn authenticate(&self, generation: u64) -> Result<(), ClientError> {
        let Some(token) = self.inner.auth_token.clone() else {
            return Ok(());
        };
        let _guard = self.inner.auth_lock.lock().await;

        // Someone else may have finished while we waited for the lock.
        let current = self.state();
        if current
            != (ConnectionState::Connected {
                generation,
                authenticated: false,
            })
        {
            return Ok(());
        }

        debug!(generation, "authenticating connection");
        // Scoped to this generation: if it drops mid-attempt the lock is
        // released and the caller re-authenticates on the next connection.
        let Some(resp) = self
            .send(generation, ReqKind::Authenticate(token), true)
            .await?
        else {
            return Ok(());
        };
        match resp.result {
            Ok(RespKind::Authenticated) => {
                self.inner.mark_authenticated(generation);
                info!(generation, "authenticated");
                Ok(())
            }
            Ok(other) => Err(ClientError::Authentication(format!(
                "Unexpected response when authenticating: {}",
                other.name()
            ))),
            Err(message) => Err(ClientError::Authentication(message)),
        }
    }

    /// One attempt on connection `generation`. `None` means the frame never
    /// reached that connection and the request may be retried. With `scoped`
    /// the wait also ends with `None` once `generation` is no longer current.
    async fn send(
        &self,
        generation: u64,
        kind: ReqKind,
        scoped: bool,
    ) -> Result<Option<Resp>, ClientError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let name = kind.name();
        let frame = codec::to_vec(&Req { id, kind })?;
        let (sender, receiver) = oneshot::channel();

        if !self.inner.enqueue(generation, id, frame, sender) {
            return Ok(None);
        }
        let _slot = PendingSlot {
            inner: &self.inner,
            id,
        };
        trace!(id, generation, request = name, "request sent");

        let answer = async {
            if scoped {
                tokio::select! {
                    answer = receiver => answer.ok(),
                    _ = self.inner.generation_closed(generation) => {
                        debug!(id, generation, request = name, "connection closed while waiting");
                        None
                    }
                }
            } else {
                // A dropped slot means the connection died before the frame went out.
                receiver.await.ok()
            }
        };

        match self.inner.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, answer).await {
                Ok(answer) => Ok(answer),
                Err(_) => {
                    warn!(id, request = name, "request timed out");
                    Err(ClientError::Timeout(id))
                }
            },
            None => Ok(answer.await),
        }
    }
}

/// Removes a pending entry when its request finishes or is abandoned.
struct PendingSlot<'a> {
    inner: &'a Inner,
    id: u64,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.inner.pending.lock().remove(&self.id);
    }
}

impl Inner {
    fn enqueue(
        &self,
        generation: u64,
        id: u64,
        frame: Vec<u8>,
        sender: oneshot::Sender<Resp>,
    ) -> bool {
        let link = self.link.lock();
        let Some(live) = link.as_ref().filter(|live| live.generation == generation) else {
            return false;
        };
        self.pending.lock().insert(id, sender);
        if live.frames.send(Outgoing { id, frame }).is_err() {
            self.pending.lock().remove(&id);
            return false;
        }
        true
    }

    fn open(&self, generation: u64, frames: mpsc::UnboundedSender<Outgoing>) {
        *self.link.lock() = Some(LiveLink { generation, frames });
        self.state.send_replace(ConnectionState::Connected {
            generation,
            authenticated: false,
        });
    }

    fn close(&self, generation: u64) {
        let mut link = self.link.lock();
        if link.as_ref().map(|live| live.generation) == Some(generation) {
            *link = None;
        }
        drop(link);
        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// Resolves once `generation` is no longer the live connection.
    async fn generation_closed(&self, generation: u64) {
        let mut state = self.state.subscribe();
        // An error means the driver is gone, which ends the generation too.
        let _ = state
            .wait_for(|state| {
                !matches!(
                    state,
                    ConnectionState::Connected { generation: current, .. } if *current == generation
                )
            })
            .await;
    }

    fn mark_authenticated(&self, generation: u64) {
        self.state.send_if_modified(|state| match state {
            ConnectionState::Connected {
                generation: current,
                authenticated,
            } if *current == generation && !*authenticated => {
                *authenticated = true;
                true
            }
            _ => false,
        });
    }

    /// Release the slot of a request whose frame never left, so its caller
    /// retries.
    fn unsent(&self, id: u64) {
        self.pending.lock().remove(&id);
    }

    fn route_response(&self, frame: &[u8]) {
        let resp: Resp = match codec::from_slice(frame) {
            Ok(resp) => resp,
            Err(err) => {
                error!(%err, "error deserializing response from server");
                return;
            }
        };
        let slot = self.pending.lock().remove(&resp.id);
        match slot {
            Some(slot) => {
                // The caller may have given up already.
                let _ = slot.send(resp);
            }
            None => warn!(id = resp.id, "got response for request that is not pending"),
        }
    }
}

async fn drive(
    inner: Weak<Inner>,
    connector: Box<dyn Connector>,
    backoff: Backoff,
    mut shutdown: oneshot::Receiver<()>,
) {
    let endpoint = connector.endpoint();
    let mut delay = backoff.initial;
    let mut generation = 0;

    loop {
        let Some(shared) = inner.upgrade() else { break };
        shared.state.send_replace(ConnectionState::Connecting);
        drop(shared);

        let connected = tokio::select! {
            _ = &mut shutdown => break,
            connected = connector.connect() => connected,
        };

        match connected {
            Ok(connection) => {
                generation += 1;
                delay = backoff.initial;
                let (frames_tx, frames_rx) = mpsc::unbounded_channel();
                let Some(shared) = inner.upgrade() else { break };
                shared.open(generation, frames_tx);
                drop(shared);
                info!(%endpoint, generation, "connected");

                let (mut frames_rx, failed) = tokio::select! {
                    _ = &mut shutdown => break,
                    rest = pump(&inner, connection, frames_rx) => rest,
                };

                let Some(shared) = inner.upgrade() else { break };
                shared.close(generation);
                // No new frames can be queued now; hand back the ones left.
                if let Some(id) = failed {
                    shared.unsent(id);
                }
                while let Ok(outgoing) = frames_rx.try_recv() {
                    shared.unsent(outgoing.id);
                }
                drop(shared);
                warn!(%endpoint, generation, "connection closed, reconnecting");
            }
            Err(err) => {
                warn!(%endpoint, %err, retry_in = ?delay, "failed to connect");
            }
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = backoff.next(delay);
    }

    debug!(%endpoint, "client shut down");
}

/// Move frames until the connection ends. Returns the outgoing queue and the
/// id of the request whose send failed, if any.
async fn pump(
    inner: &Weak<Inner>,
    connection: Connection,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
) -> (mpsc::UnboundedReceiver<Outgoing>, Option<u64>) {
    let Connection {
        mut sink,
        mut stream,
    } = connection;

    loop {
        tokio::select! {
            next = outgoing.recv() => {
                let Some(Outgoing { id, frame }) = next else { break };
                if let Err(err) = sink.send(frame).await {
                    warn!(%err, id, "error sending request");
                    return (outgoing, Some(id));
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(frame)) => {
                        let Some(shared) = inner.upgrade() else { break };
                        shared.route_response(&frame);
                    }
                    Some(Err(err)) => {
                        warn!(%err, "error reading from server");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    (outgoing, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = Backoff {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(350),
        };
        let mut delay = backoff.initial;
        let mut seen = vec![delay];
        for _ in 0..3 {
            delay = backoff.next(delay);
            seen.push(delay);
        }
        assert_eq!(
            seen,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
    }

    #[test]
    fn test_state_predicates() {
        let open = ConnectionState::Connected {
            generation: 1,
            authenticated: false,
        };
        assert!(open.is_connected());
        assert!(!open.is_authenticated());
        assert!(!ConnectionState::Connecting.is_connected());
    }

    #[test]
    fn test_options_from_config() {
        let mut config = ClientConfig::new("ws://localhost:8000");
        config.auth_token = Some("token".into());
        config.request_timeout_ms = Some(250);
        let options = ClientOptions::from(&config);
        assert_eq!(options.auth_token.as_deref(), Some("token"));
        assert_eq!(options.request_timeout, Some(Duration::from_millis(250)));
        assert_eq!(options.backoff, Backoff::default());
    }
}

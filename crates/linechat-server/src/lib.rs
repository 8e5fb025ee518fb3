//! Linechat server.
//!
//! A single-room chat server speaking the newline-delimited linechat protocol
//! over TCP.
//!
//! # Architecture
//!
//! The protocol logic lives in [`ServerDriver`], which owns the
//! [`ConnectionRegistry`] but no sockets. It writes replies through the
//! registry handles' [`LineSink`], which never blocks. [`Server`] is the
//! runtime around it: one control task on a current-thread Tokio runtime
//! that waits on the listening socket and every connection's read stream at
//! once, and hands each wake-up to the driver.
//!
//! Every iteration of the loop:
//!
//! 1. removes connections that failed since the last iteration (write error
//!    or framing overflow),
//! 2. waits until either a new connection is pending or one connection has
//!    produced a bounded read,
//! 3. accepts and registers the connection, or feeds the read to the driver.
//!
//! # Components
//!
//! - [`ServerDriver`]: line protocol state machine, writes via [`LineSink`]
//! - [`ConnectionRegistry`]: fixed-capacity slot arena of connections
//! - [`LineSink`]: seam between the registry and the sockets
//! - [`TcpTransport`]: listening socket
//! - [`Server`]: the event loop

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod broadcast;
mod driver;
mod error;
mod registry;
mod transport;

use std::{net::SocketAddr, pin::pin, time::Duration};

pub use broadcast::{BroadcastPolicy, BroadcastReport, LineSink};
pub use driver::{DEFAULT_MAX_CONNECTIONS, ServerConfig, ServerDriver};
pub use error::ServerError;
use futures::{
    StreamExt,
    stream::{BoxStream, SelectAll},
};
pub use registry::{Connection, ConnectionRegistry, SlotId};
use tokio::{
    net::TcpStream,
    time::{Instant, sleep},
};
pub use transport::{
    LISTEN_BACKLOG, PeerHandle, READ_CHUNK, ReadEvent, TcpTransport, is_descriptor_exhaustion,
    read_events, split_peer,
};

/// Pause before accepting again after an accept error.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Read streams of every live connection, tagged with their slot.
type Inbound = SelectAll<BoxStream<'static, (SlotId, ReadEvent)>>;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to, as `host:port`
    pub bind_address: String,
    /// Maximum bytes read from a connection per wake
    pub read_chunk: usize,
    /// Driver configuration (capacity, line limit, echo policy)
    pub driver: ServerConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9000".to_string(),
            read_chunk: READ_CHUNK,
            driver: ServerConfig::default(),
        }
    }
}

/// Production linechat server.
///
/// Wraps [`ServerDriver`] with the Tokio TCP transport.
#[derive(Debug)]
pub struct Server {
    /// Protocol state machine
    driver: ServerDriver<PeerHandle>,
    /// Listening socket
    transport: TcpTransport,
    /// Bytes read per wake
    read_chunk: usize,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the address is malformed, does not resolve,
    /// or cannot be bound.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let transport = TcpTransport::bind(&config.bind_address).await?;
        let driver = ServerDriver::new(config.driver);

        Ok(Self { driver, transport, read_chunk: config.read_chunk })
    }

    /// Local address the server is bound to.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Transport` if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Run the event loop.
    ///
    /// Never returns under normal operation: the server runs until the
    /// process is killed. Accept and per-connection errors are logged and do
    /// not stop the loop. After an accept error the listener is left alone
    /// for [`ACCEPT_BACKOFF`] while existing connections keep being served.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Transport` if the local address cannot be read
    /// at startup.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!(
            addr = %self.local_addr()?,
            capacity = self.driver.config().max_connections,
            policy = ?self.driver.config().broadcast_policy,
            "server running"
        );

        let mut inbound = Inbound::new();
        let mut backoff = pin!(sleep(Duration::ZERO));
        let mut accepting = true;

        loop {
            self.driver.reap_failed();

            tokio::select! {
                accepted = self.transport.accept(), if accepting => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr, &mut inbound),
                    Err(err) => {
                        tracing::warn!(%err, "accept failed, backing off");
                        accepting = false;
                        backoff.as_mut().reset(Instant::now() + ACCEPT_BACKOFF);
                    },
                },
                () = &mut backoff, if !accepting => accepting = true,
                Some((slot, event)) = inbound.next(), if !inbound.is_empty() => {
                    self.dispatch(slot, event);
                },
            }
        }
    }

    fn admit(&mut self, stream: TcpStream, addr: SocketAddr, inbound: &mut Inbound) {
        let (peer, events) = match split_peer(stream, addr, self.read_chunk) {
            Ok(parts) => parts,
            Err(err) => {
                tracing::warn!(%addr, %err, "failed to set up connection");
                return;
            },
        };

        match self.driver.handle_connection_accepted(peer) {
            Ok(slot) => {
                tracing::info!(slot, %addr, "connection accepted");
                inbound.push(events.map(move |event| (slot, event)).boxed());
            },
            Err(peer) => {
                tracing::warn!(addr = %peer.peer_addr(), "connection refused");
            },
        }
    }

    fn dispatch(&mut self, slot: SlotId, event: ReadEvent) {
        match event {
            ReadEvent::Data(bytes) => self.driver.handle_bytes_received(slot, &bytes),
            ReadEvent::Eof => {
                self.driver.handle_connection_closed(slot, "end of stream");
            },
            ReadEvent::Failed(err) => {
                self.driver.handle_connection_closed(slot, &err.to_string());
            },
        }
    }
}

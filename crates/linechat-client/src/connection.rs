//! TCP connection to a linechat server.
//!
//! [`ChatConnection`] is the thin I/O layer around [`Session`]: it reads from
//! the socket, feeds the bytes to the session and writes whatever the session
//! asks it to send. Protocol decisions stay in the session.

use std::{collections::VecDeque, net::SocketAddr};

use bytes::BytesMut;
use linechat_proto::Nickname;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpStream, lookup_host},
};

use crate::{
    error::ClientError,
    event::{ChatLine, SessionAction, SessionEvent},
    session::{Session, outbound},
};

/// Maximum number of bytes read per wake.
pub const READ_CHUNK: usize = 4096;

/// What one [`ChatConnection::recv`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Received {
    /// Chat lines to display, in arrival order
    pub lines: Vec<ChatLine>,
    /// The server closed the connection; no further reads will succeed
    pub closed: bool,
}

/// A registered connection to a linechat server.
#[derive(Debug)]
pub struct ChatConnection {
    /// Server socket
    stream: TcpStream,
    /// Server address actually connected to
    peer: SocketAddr,
    /// Greeting line sent by the server
    greeting: String,
    /// Protocol state
    session: Session,
    /// Lines that arrived together with the handshake reply
    carried: VecDeque<ChatLine>,
    /// Set once the server has gone away
    closed: bool,
}

impl ChatConnection {
    /// Connect to `address` (`host:port`) and register as `nickname`.
    ///
    /// Every address the host resolves to is tried in turn. Returns once the
    /// server has accepted the nickname.
    ///
    /// # Errors
    ///
    /// - `ClientError::Connect` if the address is malformed or no resolved
    ///   address accepts the connection
    /// - `ClientError::Rejected` if the server refuses the nickname
    /// - any handshake error from [`Session::handle`]
    pub async fn connect(address: &str, nickname: Nickname) -> Result<Self, ClientError> {
        let (stream, peer) = open(address).await?;
        tracing::info!(%peer, "connected");

        let mut conn = Self {
            stream,
            peer,
            greeting: String::new(),
            session: Session::new(nickname),
            carried: VecDeque::new(),
            closed: false,
        };
        conn.handshake().await?;
        Ok(conn)
    }

    /// Server address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Greeting line the server opened with, e.g. `HELLO 1`.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Registered nickname.
    pub fn nickname(&self) -> &Nickname {
        self.session.nickname()
    }

    /// Read once from the server.
    ///
    /// Lines that arrived with the handshake reply are returned first,
    /// without reading. Cancel-safe: if the future is dropped before it
    /// completes, no data is lost.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Protocol` if the server overflows the line
    /// buffer. Read errors are reported as a closed connection.
    pub async fn recv(&mut self) -> Result<Received, ClientError> {
        if !self.carried.is_empty() {
            return Ok(Received { lines: self.carried.drain(..).collect(), closed: false });
        }
        if self.closed {
            return Ok(Received { lines: Vec::new(), closed: true });
        }

        let event = self.read_event().await;
        let actions = self.session.handle(event)?;

        let mut received = Received::default();
        for action in actions {
            match action {
                SessionAction::Display(line) => received.lines.push(line),
                SessionAction::Closed => {
                    self.closed = true;
                    received.closed = true;
                },
                _ => {},
            }
        }
        Ok(received)
    }

    /// Send a line of chat text. Empty text is not sent.
    ///
    /// # Errors
    ///
    /// Propagates socket write errors.
    pub async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        let actions = self.session.handle(SessionEvent::Submit(text.to_owned()))?;
        self.write_all(&actions).await
    }

    async fn handshake(&mut self) -> Result<(), ClientError> {
        while !self.session.is_registered() {
            let event = self.read_event().await;
            let actions = self.session.handle(event)?;
            self.write_all(&actions).await?;

            for action in actions {
                match action {
                    SessionAction::Greeted { greeting } => self.greeting = greeting,
                    SessionAction::Display(line) => self.carried.push_back(line),
                    _ => {},
                }
            }
        }

        tracing::info!(nick = %self.session.nickname(), "registered");
        Ok(())
    }

    async fn read_event(&mut self) -> SessionEvent {
        let mut buf = BytesMut::with_capacity(READ_CHUNK);

        match self.stream.read_buf(&mut buf).await {
            Ok(0) => SessionEvent::ConnectionLost,
            Ok(_) => SessionEvent::BytesReceived(buf.freeze()),
            Err(err) => {
                tracing::debug!(%err, "read failed");
                SessionEvent::ConnectionLost
            },
        }
    }

    async fn write_all(&mut self, actions: &[SessionAction]) -> Result<(), ClientError> {
        for bytes in outbound(actions) {
            self.stream.write_all(bytes).await?;
        }
        Ok(())
    }
}

async fn open(address: &str) -> Result<(TcpStream, SocketAddr), ClientError> {
    if !address.contains(':') {
        return Err(ClientError::Connect(format!("invalid address '{address}': expected host:port")));
    }

    let addrs = lookup_host(address)
        .await
        .map_err(|e| ClientError::Connect(format!("failed to resolve '{address}': {e}")))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok((stream, addr)),
            Err(err) => {
                tracing::debug!(%addr, %err, "connect attempt failed");
                last_err = Some(err);
            },
        }
    }

    Err(ClientError::Connect(match last_err {
        Some(err) => format!("{address}: {err}"),
        None => format!("'{address}' resolved to no addresses"),
    }))
}

//! Tokio TCP transport.
//!
//! The listener is bound through [`TcpSocket`] so that `SO_REUSEADDR` and the
//! listen backlog can be set before `listen`. Every accepted stream is split
//! into:
//!
//! - a [`PeerHandle`] owned by the registry, which writes outbound lines with
//!   non-blocking writes, and
//! - a read stream of [`ReadEvent`]s polled by the runtime's event loop, one
//!   bounded read per poll.
//!
//! Dropping the handle aborts the read stream and shuts the socket down in
//! both directions, so freeing a registry slot closes the connection.
//!
//! Each connection holds two descriptors (the reader and the duplicated
//! writer). When the process runs out of descriptors, `accept` fails while
//! the connection stays queued. The transport keeps one spare descriptor for
//! that case: releasing it lets the queued connection be accepted and closed
//! at once, so the peer sees end of stream instead of waiting forever.

use std::{
    io::{self, Write},
    net::{Ipv4Addr, Shutdown, SocketAddr, UdpSocket},
};

use bytes::{Bytes, BytesMut};
use futures::{
    FutureExt, Stream,
    stream::{self, AbortHandle, Abortable},
};
use tokio::{
    io::AsyncReadExt,
    net::{TcpListener, TcpSocket, TcpStream, lookup_host},
};

use crate::{broadcast::LineSink, error::ServerError};

/// Pending connection queue length passed to `listen`.
pub const LISTEN_BACKLOG: u32 = 16;

/// Maximum number of bytes read per wake.
pub const READ_CHUNK: usize = 4096;

/// Listening TCP socket.
#[derive(Debug)]
pub struct TcpTransport {
    /// Tokio listener
    listener: TcpListener,
    /// Descriptor held back for shedding connections when none are left
    spare: Option<UdpSocket>,
}

impl TcpTransport {
    /// Resolve `host:port` and listen on the first address that binds.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if the address has no port or does not resolve
    /// - `ServerError::Transport` if no resolved address could be bound
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        if !address.contains(':') {
            return Err(ServerError::Config(format!(
                "invalid bind address '{address}': expected host:port"
            )));
        }

        let addrs = lookup_host(address)
            .await
            .map_err(|e| ServerError::Config(format!("failed to resolve '{address}': {e}")))?;

        let mut last_err = None;
        for addr in addrs {
            match listen_on(addr) {
                Ok(listener) => {
                    tracing::info!(%addr, "TCP transport bound");
                    return Ok(Self { listener, spare: reserve_descriptor() });
                },
                Err(err) => {
                    tracing::debug!(%addr, %err, "bind attempt failed");
                    last_err = Some(err);
                },
            }
        }

        Err(match last_err {
            Some(err) => ServerError::Transport(format!("failed to bind '{address}': {err}")),
            None => ServerError::Config(format!("'{address}' resolved to no addresses")),
        })
    }

    /// Accept the next connection.
    ///
    /// # Errors
    ///
    /// Accept failures are returned as-is. On descriptor exhaustion the
    /// queued connection is shed with [`refuse_pending`](Self::refuse_pending)
    /// before the error is returned.
    pub async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        let result = self.listener.accept().await;
        if result.as_ref().is_err_and(is_descriptor_exhaustion) {
            self.refuse_pending();
        }
        result
    }

    /// Accept one queued connection and close it immediately.
    ///
    /// Releases the spare descriptor for the duration of the call. Returns
    /// whether a connection was shed; never waits for one.
    pub fn refuse_pending(&mut self) -> bool {
        self.spare = None;
        let shed = match self.listener.accept().now_or_never() {
            Some(Ok((stream, addr))) => {
                tracing::warn!(%addr, "out of descriptors, closing connection");
                drop(stream);
                true
            },
            Some(Err(err)) => {
                tracing::debug!(%err, "could not shed queued connection");
                false
            },
            None => false,
        };
        self.spare = reserve_descriptor();
        shed
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}

/// Whether an accept error means the process or system ran out of
/// descriptors (`EMFILE`/`ENFILE`, `WSAEMFILE`).
pub fn is_descriptor_exhaustion(err: &io::Error) -> bool {
    #[cfg(unix)]
    const CODES: &[i32] = &[23, 24];
    #[cfg(windows)]
    const CODES: &[i32] = &[10024];
    #[cfg(not(any(unix, windows)))]
    const CODES: &[i32] = &[];

    err.raw_os_error().is_some_and(|code| CODES.contains(&code))
}

fn reserve_descriptor() -> Option<UdpSocket> {
    match UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)) {
        Ok(socket) => Some(socket),
        Err(err) => {
            tracing::debug!(%err, "no spare descriptor available");
            None
        },
    }
}

fn listen_on(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

/// Result of one bounded read.
#[derive(Debug)]
pub enum ReadEvent {
    /// Bytes read from the peer
    Data(Bytes),
    /// Peer closed its side of the connection
    Eof,
    /// The read failed
    Failed(io::Error),
}

/// Turn a read half into a stream of [`ReadEvent`]s.
///
/// Each poll performs exactly one read of at most `chunk` bytes. The stream
/// ends after yielding [`ReadEvent::Eof`] or [`ReadEvent::Failed`].
pub fn read_events(reader: TcpStream, chunk: usize) -> impl Stream<Item = ReadEvent> + Send {
    let chunk = chunk.max(1);

    stream::unfold(Some(reader), move |state| async move {
        let mut reader = state?;
        let mut buf = BytesMut::with_capacity(chunk);

        match reader.read_buf(&mut buf).await {
            Ok(0) => Some((ReadEvent::Eof, None)),
            Ok(_) => Some((ReadEvent::Data(buf.freeze()), Some(reader))),
            Err(err) => Some((ReadEvent::Failed(err), None)),
        }
    })
}

/// Registry handle of an accepted connection.
///
/// Owns the write side of the socket and the abort switch of its read
/// stream.
#[derive(Debug)]
pub struct PeerHandle {
    /// Remote address
    addr: SocketAddr,
    /// Non-blocking write side
    writer: std::net::TcpStream,
    /// Stops the connection's read stream
    reader: AbortHandle,
}

impl PeerHandle {
    /// Remote peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl LineSink for PeerHandle {
    fn send_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.writer.write_all(line)
    }
}

impl Drop for PeerHandle {
    fn drop(&mut self) {
        self.reader.abort();
        if let Err(err) = self.writer.shutdown(Shutdown::Both) {
            tracing::debug!(addr = %self.addr, %err, "shutdown failed");
        }
    }
}

/// Split an accepted stream into its registry handle and its read stream.
///
/// The write side is a duplicate of the socket in non-blocking mode: a write
/// either completes into the kernel buffer or fails, it never waits for the
/// reactor.
///
/// # Errors
///
/// Fails if the socket cannot be duplicated or re-registered with the
/// reactor.
pub fn split_peer(
    stream: TcpStream,
    addr: SocketAddr,
    chunk: usize,
) -> io::Result<(PeerHandle, Abortable<impl Stream<Item = ReadEvent> + Send>)> {
    let socket = stream.into_std()?;
    let writer = socket.try_clone()?;
    let reader = TcpStream::from_std(socket)?;

    let (events, abort) = stream::abortable(read_events(reader, chunk));
    Ok((PeerHandle { addr, writer, reader: abort }, events))
}

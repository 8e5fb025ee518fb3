//! Server driver.
//!
//! Ties together the connection registry, the line framer and the line
//! protocol. The driver owns no sockets: the runtime feeds it accepted
//! handles and received bytes. Replies and broadcasts are written
//! synchronously through each handle's [`LineSink`] before a call returns.

use linechat_proto::{ClientMessage, MAX_LINE_LEN, Nickname, ServerMessage};

use crate::{
    broadcast::{BroadcastPolicy, LineSink},
    registry::{Connection, ConnectionRegistry, SlotId},
};

/// Default maximum number of simultaneous connections.
///
/// The TCP runtime uses two descriptors per connection, so reaching this
/// needs a descriptor limit above twice the value. Below that, connections
/// past the limit are closed on accept rather than refused by the registry.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections; further connections are refused
    pub max_connections: usize,
    /// Inbound buffer capacity per connection
    pub line_capacity: usize,
    /// Whether the sender receives its own chat lines
    pub broadcast_policy: BroadcastPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            line_capacity: MAX_LINE_LEN,
            broadcast_policy: BroadcastPolicy::default(),
        }
    }
}

/// Line protocol state machine for every connection of the server.
#[derive(Debug)]
pub struct ServerDriver<H> {
    /// Live connections
    registry: ConnectionRegistry<H>,
    /// Driver configuration
    config: ServerConfig,
}

impl<H: LineSink> ServerDriver<H> {
    /// Create a driver with an empty registry.
    pub fn new(config: ServerConfig) -> Self {
        let registry =
            ConnectionRegistry::with_line_capacity(config.max_connections, config.line_capacity);
        Self { registry, config }
    }

    /// Driver configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Connection registry.
    pub fn registry(&self) -> &ConnectionRegistry<H> {
        &self.registry
    }

    /// Handle a newly accepted connection.
    ///
    /// The connection takes the first free slot and is sent the greeting.
    ///
    /// # Errors
    ///
    /// Returns the handle back when every slot is taken. The runtime closes
    /// it; the existing connections are untouched.
    pub fn handle_connection_accepted(&mut self, handle: H) -> Result<SlotId, H> {
        let slot = match self.registry.insert(handle) {
            Ok(slot) => slot,
            Err(handle) => {
                tracing::warn!(
                    capacity = self.registry.capacity(),
                    "registry full, refusing connection"
                );
                return Err(handle);
            },
        };

        self.registry.send_to(slot, &ServerMessage::greeting().to_bytes());
        tracing::debug!(slot, live = self.registry.len(), "connection accepted");
        Ok(slot)
    }

    /// Handle bytes read from a connection.
    ///
    /// Every complete line is parsed and acted on in arrival order. A framing
    /// overflow marks the connection failed; it is removed by the next
    /// [`reap_failed`](Self::reap_failed).
    pub fn handle_bytes_received(&mut self, slot: SlotId, data: &[u8]) {
        let Some(conn) = self.registry.get_mut(slot) else {
            tracing::debug!(slot, "bytes for a free slot, ignoring");
            return;
        };
        if conn.is_failed() {
            return;
        }

        let lines = match conn.framer_mut().push(data) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!(slot, %err, "framing overflow, dropping connection");
                conn.mark_failed();
                return;
            },
        };

        for line in lines {
            self.handle_line(slot, &line);
        }
    }

    /// Remove a connection whose peer went away.
    ///
    /// Returns the removed connection; dropping it closes the transport.
    pub fn handle_connection_closed(&mut self, slot: SlotId, reason: &str) -> Option<Connection<H>> {
        let conn = self.registry.remove(slot)?;
        match conn.nickname() {
            Some(nick) => tracing::info!(slot, %nick, reason, "client left"),
            None => tracing::debug!(slot, reason, "unregistered connection closed"),
        }
        Some(conn)
    }

    /// Remove every connection marked failed since the last call.
    pub fn reap_failed(&mut self) -> Vec<SlotId> {
        let failed = self.registry.failed_slots();
        for &slot in &failed {
            self.registry.remove(slot);
            tracing::debug!(slot, "reaped failed connection");
        }
        failed
    }

    fn handle_line(&mut self, slot: SlotId, line: &[u8]) {
        // An earlier line in the same read may have failed the connection.
        if self.registry.get(slot).is_none_or(Connection::is_failed) {
            return;
        }

        match ClientMessage::parse(line) {
            Ok(ClientMessage::Nick(candidate)) => self.handle_nick(slot, &candidate),
            Ok(ClientMessage::Msg(text)) => self.handle_msg(slot, &text),
            Err(err) => tracing::debug!(slot, %err, "ignoring line"),
        }
    }

    fn handle_nick(&mut self, slot: SlotId, candidate: &str) {
        let Ok(nick) = Nickname::parse(candidate) else {
            tracing::debug!(slot, candidate, "rejected nickname");
            self.registry.send_to(slot, &ServerMessage::invalid_nick().to_bytes());
            return;
        };

        let Some(conn) = self.registry.get_mut(slot) else {
            return;
        };
        match conn.register(nick.clone()) {
            Some(old) => tracing::info!(slot, %old, new = %nick, "client renamed"),
            None => tracing::info!(slot, %nick, "client registered"),
        }

        self.registry.send_to(slot, &ServerMessage::Ok.to_bytes());
    }

    fn handle_msg(&mut self, slot: SlotId, text: &str) {
        let Some(nick) = self.registry.get(slot).and_then(Connection::nickname) else {
            tracing::debug!(slot, "dropping MSG from unregistered connection");
            return;
        };

        // Receivers frame with MAX_LINE_LEN; the nick prefix can push a line
        // that fit inbound past it.
        let message = ServerMessage::chat(nick, text);
        if message.line_len() > MAX_LINE_LEN {
            tracing::warn!(slot, len = message.line_len(), "chat line too long to relay, dropping");
            return;
        }

        let line = message.to_bytes();
        let exclude = match self.config.broadcast_policy {
            BroadcastPolicy::IncludeSender => None,
            BroadcastPolicy::ExcludeSender => Some(slot),
        };

        let report = self.registry.broadcast(&line, exclude);
        tracing::debug!(slot, delivered = report.delivered, failed = report.failed, "broadcast");
    }
}

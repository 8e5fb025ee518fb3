//! Sans-IO client session.
//!
//! The session tracks where the client is in the handshake and turns bytes
//! from the server into [`SessionAction`]s. It never touches a socket, so the
//! same logic runs against TCP in production and against byte vectors in
//! tests.
//!
//! ```text
//! AwaitingGreeting --HELLO--> AwaitingAck --OK--> Registered --lost--> Closed
//!                                         --ERR-> Closed (rejected)
//! ```

use bytes::Bytes;
use linechat_proto::{ClientMessage, LineFramer, Nickname, ServerMessage};

use crate::{
    error::ClientError,
    event::{ChatLine, SessionAction, SessionEvent},
};

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, waiting for `HELLO`.
    AwaitingGreeting,
    /// `NICK` sent, waiting for `OK` or `ERR`.
    AwaitingAck,
    /// Nickname accepted; chat lines flow.
    Registered,
    /// Connection is over.
    Closed,
}

/// Client side of one connection.
#[derive(Debug)]
pub struct Session {
    /// Nickname to register; own chat lines are not displayed
    nickname: Nickname,
    /// Handshake progress
    state: SessionState,
    /// Inbound line reassembly
    framer: LineFramer,
}

impl Session {
    /// Create a session that will register as `nickname`.
    pub fn new(nickname: Nickname) -> Self {
        Self { nickname, state: SessionState::AwaitingGreeting, framer: LineFramer::new() }
    }

    /// Nickname this session registers as.
    pub fn nickname(&self) -> &Nickname {
        &self.nickname
    }

    /// Current handshake state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the nickname has been accepted.
    pub fn is_registered(&self) -> bool {
        self.state == SessionState::Registered
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// - `ClientError::Protocol` if a server line overflows the buffer
    /// - `ClientError::UnexpectedReply` if the handshake is answered with
    ///   anything but the expected line
    /// - `ClientError::Rejected` if the server refuses the nickname
    /// - `ClientError::ClosedDuringHandshake` if the connection drops before
    ///   registration completes
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionAction>, ClientError> {
        match event {
            SessionEvent::BytesReceived(data) => self.handle_bytes(&data),
            SessionEvent::Submit(text) => Ok(self.handle_submit(text)),
            SessionEvent::ConnectionLost => self.handle_connection_lost(),
        }
    }

    fn handle_bytes(&mut self, data: &[u8]) -> Result<Vec<SessionAction>, ClientError> {
        if self.state == SessionState::Closed {
            return Ok(Vec::new());
        }

        let lines = self.framer.push(data).inspect_err(|_| self.state = SessionState::Closed)?;

        let mut actions = Vec::new();
        for line in lines {
            self.handle_line(&line, &mut actions)?;
        }
        Ok(actions)
    }

    fn handle_line(
        &mut self,
        line: &[u8],
        actions: &mut Vec<SessionAction>,
    ) -> Result<(), ClientError> {
        let message = ServerMessage::parse(line);

        match self.state {
            SessionState::AwaitingGreeting => match message {
                Ok(ServerMessage::Hello { version }) => {
                    tracing::debug!(%version, "greeted, registering");
                    self.state = SessionState::AwaitingAck;
                    // Shown as sent, whatever the case of the verb.
                    let greeting = String::from_utf8_lossy(line).into_owned();
                    actions.push(SessionAction::Greeted { greeting });
                    actions.push(SessionAction::Send(
                        ClientMessage::Nick(self.nickname.to_string()).to_bytes(),
                    ));
                },
                _ => return Err(self.unexpected(line)),
            },
            SessionState::AwaitingAck => match message {
                Ok(ServerMessage::Ok) => {
                    tracing::debug!(nick = %self.nickname, "registered");
                    self.state = SessionState::Registered;
                    actions.push(SessionAction::Registered);
                },
                Ok(ServerMessage::Err { reason }) => {
                    self.state = SessionState::Closed;
                    return Err(ClientError::Rejected(reason));
                },
                _ => return Err(self.unexpected(line)),
            },
            SessionState::Registered => match message {
                Ok(ServerMessage::Msg { nick, text }) => {
                    if self.nickname != *nick {
                        actions.push(SessionAction::Display(ChatLine { nick, text }));
                    }
                },
                Ok(other) => tracing::debug!(%other, "ignoring server line"),
                Err(err) => tracing::debug!(%err, "ignoring server line"),
            },
            SessionState::Closed => {},
        }

        Ok(())
    }

    fn handle_submit(&mut self, text: String) -> Vec<SessionAction> {
        if !self.is_registered() || text.is_empty() || text.contains('\n') {
            return Vec::new();
        }

        vec![SessionAction::Send(ClientMessage::Msg(text).to_bytes())]
    }

    fn handle_connection_lost(&mut self) -> Result<Vec<SessionAction>, ClientError> {
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);

        match previous {
            SessionState::AwaitingGreeting | SessionState::AwaitingAck => {
                Err(ClientError::ClosedDuringHandshake)
            },
            SessionState::Registered => {
                let mut actions = Vec::new();
                // A final line the server never terminated is still shown.
                if let Some(tail) = self.framer.finish() {
                    self.state = SessionState::Registered;
                    self.handle_line(&tail, &mut actions)?;
                    self.state = SessionState::Closed;
                }
                actions.push(SessionAction::Closed);
                Ok(actions)
            },
            SessionState::Closed => Ok(Vec::new()),
        }
    }

    fn unexpected(&mut self, line: &[u8]) -> ClientError {
        self.state = SessionState::Closed;
        ClientError::UnexpectedReply(String::from_utf8_lossy(line).into_owned())
    }
}

/// Extract the bytes to write from a batch of actions.
pub(crate) fn outbound(actions: &[SessionAction]) -> impl Iterator<Item = &Bytes> {
    actions.iter().filter_map(|action| match action {
        SessionAction::Send(bytes) => Some(bytes),
        _ => None,
    })
}

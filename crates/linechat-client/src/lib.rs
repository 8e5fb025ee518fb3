//! Linechat client.
//!
//! Connects to a linechat server, registers a nickname, then lets the user
//! type chat lines while lines from other users are printed as they arrive.
//!
//! # Architecture
//!
//! The protocol side follows the Sans-IO pattern: [`Session`] receives events
//! ([`SessionEvent`]), updates the handshake state and returns actions
//! ([`SessionAction`]) for the caller to execute. [`ChatConnection`] executes
//! them over TCP.
//!
//! The interactive side is split the same way: [`LineEditor`] owns the line
//! being typed and [`Console`] renders output. [`run`] ties everything
//! together in a single event loop that waits on the server socket and the
//! terminal at the same time.
//!
//! # Components
//!
//! - [`Session`]: handshake and chat state machine (no I/O)
//! - [`ChatConnection`]: TCP connection executing session actions
//! - [`LineEditor`]: input buffer with backspace and a length limit
//! - [`Console`]: status, chat and echo rendering
//! - [`RawModeGuard`]: raw terminal mode for the lifetime of the loop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connection;
mod console;
mod editor;
mod error;
mod event;
mod session;
mod terminal;

use std::io;

use crossterm::event::EventStream;
use futures::StreamExt;

pub use connection::{ChatConnection, READ_CHUNK, Received};
pub use console::Console;
pub use editor::{EditOutcome, KeyInput, LineEditor};
pub use error::ClientError;
pub use event::{ChatLine, SessionAction, SessionEvent};
pub use linechat_proto::Nickname;
pub use session::{Session, SessionState};
pub use terminal::{RawModeGuard, key_input};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, as `host:port`
    pub address: String,
    /// Nickname to register
    pub nickname: Nickname,
}

/// Run an interactive chat session on the current terminal.
///
/// Returns `Ok(())` when the server closes the connection or the user
/// presses Ctrl-C / Ctrl-D.
///
/// # Errors
///
/// Returns `ClientError` if the connection or handshake fails, the terminal
/// cannot be put in raw mode, or a socket error occurs mid-session.
pub async fn run(config: ClientConfig) -> Result<(), ClientError> {
    let mut console = Console::new(io::stdout());

    let mut conn = ChatConnection::connect(&config.address, config.nickname).await?;

    console.status(&format!("Connected to {}", conn.peer_addr()))?;
    console.status(&format!("Server protocol: {}", conn.greeting()))?;
    console.status("Name accepted!")?;

    let _raw = RawModeGuard::enable().map_err(ClientError::Terminal)?;
    let mut keys = EventStream::new();
    let mut editor = LineEditor::new();

    loop {
        tokio::select! {
            received = conn.recv() => {
                let received = received?;
                for line in &received.lines {
                    console.chat_line(line, editor.buffer())?;
                }
                if received.closed {
                    console.newline()?;
                    tracing::info!("server closed the connection");
                    return Ok(());
                }
            },
            event = keys.next() => {
                let event = match event {
                    Some(Ok(event)) => event,
                    Some(Err(err)) => return Err(ClientError::Terminal(err)),
                    None => return Ok(()),
                };
                let Some(key) = key_input(&event) else {
                    continue;
                };

                match editor.handle_key(key) {
                    EditOutcome::Echo(c) => console.echo(c)?,
                    EditOutcome::Erase => console.erase()?,
                    EditOutcome::Submit(text) => {
                        conn.send(&text).await?;
                        console.newline()?;
                    },
                    EditOutcome::Ignored => {},
                    EditOutcome::Quit => {
                        console.newline()?;
                        return Ok(());
                    },
                }
            },
        }
    }
}

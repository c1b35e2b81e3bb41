//! In-process channel-backed transport.
//!
//! The wire socket is out of scope; this adapter gives the session engine a
//! real [`ChatTransport`] whose far end is a [`TransportHarness`] the tests
//! (or an embedding bridge) drive: outbound emits arrive as
//! [`ClientCommand`]s, and the harness injects [`TransportEvent`]s.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::chat::domain::ConversationId;
use crate::chat::error::{TransportError, TransportResult};
use crate::chat::ports::transport::{ChatTransport, OutboundMessage, TransportEvent};

/// An emit captured from the client side of the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// A `send:message` emit.
    Send(OutboundMessage),
    /// A `join:conversation` emit.
    Join(ConversationId),
}

/// Client half of the in-process transport.
pub struct ChannelTransport {
    connected: AtomicBool,
    commands: mpsc::UnboundedSender<ClientCommand>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
}

/// Server half: receives client emits, injects server events.
pub struct TransportHarness {
    /// Emits produced by the client side.
    pub commands: mpsc::UnboundedReceiver<ClientCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportHarness {
    /// Injects a server event into the client's stream.
    pub fn emit(&self, event: TransportEvent) {
        // A closed stream means the session was torn down; nothing to do.
        self.events.send(event).ok();
    }

    /// Waits for the next client emit.
    pub async fn next_command(&mut self) -> Option<ClientCommand> {
        self.commands.recv().await
    }
}

/// Builds a connected pair of transport halves.
#[must_use]
pub fn channel_transport() -> (ChannelTransport, TransportHarness) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let transport = ChannelTransport {
        connected: AtomicBool::new(false),
        commands: command_tx,
        events_tx: event_tx.clone(),
        events_rx: Mutex::new(Some(event_rx)),
    };
    let harness = TransportHarness {
        commands: command_rx,
        events: event_tx,
    };
    (transport, harness)
}

#[async_trait]
impl ChatTransport for ChannelTransport {
    async fn connect(&self) -> TransportResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        self.events_tx
            .send(TransportEvent::Connected)
            .map_err(|_| TransportError::Connect("event stream closed".to_owned()))
    }

    async fn disconnect(&self) {
        // Idempotent by construction.
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, payload: OutboundMessage) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.commands
            .send(ClientCommand::Send(payload))
            .map_err(|_| TransportError::StreamClosed)
    }

    async fn join_conversation(&self, conversation_id: ConversationId) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.commands
            .send(ClientCommand::Join(conversation_id))
            .map_err(|_| TransportError::StreamClosed)
    }

    fn subscribe(&self) -> TransportResult<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events_rx
            .lock()
            .map_err(|_| TransportError::AlreadySubscribed)?
            .take()
            .ok_or(TransportError::AlreadySubscribed)
    }
}

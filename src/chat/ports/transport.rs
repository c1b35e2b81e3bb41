//! Transport port: the live connection to the messaging server.
//!
//! The socket library itself is out of scope; this port captures the typed
//! event surface the session engine consumes and the two outbound emits it
//! produces. Exactly one connector instance is permitted per authenticated
//! identity; guests never open a connection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::chat::domain::{
    ChatMessage, ConversationId, MessageId, MessageMetadata, SenderType, SessionId, TempId,
    TenantId, UserId,
};
use crate::chat::error::TransportResult;

/// Payload of an outbound `send:message` emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The text body.
    pub message: String,
    /// Correlation key for the acknowledgement.
    #[serde(rename = "tempId")]
    pub temp_id: TempId,
    /// Attribute bag forwarded verbatim.
    pub metadata: MessageMetadata,
    /// The kind of actor sending.
    #[serde(rename = "senderType")]
    pub sender_type: SenderType,
    /// The authenticated sender, if any.
    #[serde(rename = "senderId")]
    pub sender_id: Option<UserId>,
    /// The tenant scope.
    #[serde(rename = "tenantId")]
    pub tenant_id: TenantId,
    /// Omitted when unknown; the server then creates a conversation
    /// lazily and announces it via [`TransportEvent::ConversationCreated`].
    #[serde(rename = "conversationId", skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

/// Inbound events from the messaging server.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is up.
    Connected,
    /// The connection dropped; `reason` is diagnostic only.
    Disconnected {
        /// Why the transport reported the drop.
        reason: String,
    },
    /// A connection attempt failed.
    ConnectError {
        /// The transport's error description.
        reason: String,
    },
    /// A message broadcast into the joined conversation room. When it
    /// carries the temp id of a still-pending send it doubles as the
    /// acknowledgement of that send.
    Message(ChatMessage),
    /// Explicit acknowledgement of an optimistic send.
    MessageConfirmed {
        /// The correlation key being confirmed.
        temp_id: TempId,
        /// The server-issued stable id.
        message_id: MessageId,
    },
    /// Explicit rejection of an optimistic send. The entry is kept
    /// visible; policy resolves it rather than deleting it.
    MessageFailed {
        /// The correlation key being rejected.
        temp_id: TempId,
        /// Server-side failure description, if any.
        error: Option<String>,
    },
    /// The server created a conversation for this user.
    ConversationCreated {
        /// The new conversation.
        conversation_id: ConversationId,
    },
    /// The active conversation changed server-side.
    ConversationUpdated {
        /// The conversation to adopt.
        conversation_id: ConversationId,
    },
    /// An admin started or stopped typing.
    Typing {
        /// The admin user involved.
        user_id: UserId,
        /// Whether they are currently typing.
        is_typing: bool,
    },
    /// The server assigned a transport session id.
    SessionInitialized {
        /// The assigned session id.
        session_id: SessionId,
    },
}

/// Port for the live messaging connection.
///
/// # Implementation Notes
///
/// - `disconnect` must be idempotent.
/// - `subscribe` hands out the single event stream; a second call fails.
/// - Emits while disconnected fail with `TransportError::NotConnected`.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Establishes the connection.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` when the attempt fails; the
    /// session retries with its bounded fixed-delay policy.
    async fn connect(&self) -> TransportResult<()>;

    /// Tears the connection down. Safe to call repeatedly.
    async fn disconnect(&self);

    /// Returns `true` while the connection is up.
    fn is_connected(&self) -> bool;

    /// Emits a `send:message`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotConnected` while disconnected.
    async fn send(&self, payload: OutboundMessage) -> TransportResult<()>;

    /// Emits a `join:conversation` for the given room.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotConnected` while disconnected.
    async fn join_conversation(&self, conversation_id: ConversationId) -> TransportResult<()>;

    /// Takes the inbound event stream.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::AlreadySubscribed` on a second call; the
    /// session engine is the sole consumer.
    fn subscribe(&self) -> TransportResult<mpsc::UnboundedReceiver<TransportEvent>>;
}

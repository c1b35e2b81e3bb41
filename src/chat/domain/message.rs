//! The chat message record: one unit of conversation.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

use super::{
    ConversationId, MessageId, MessageMetadata, MessageStatus, SenderType, SessionId, TempId,
    UserId,
};

/// Placeholder body shown while an AI reply is being produced.
pub const THINKING_PLACEHOLDER: &str = "...";

/// One message in the active conversation.
///
/// Exactly one entry exists per logical message: an optimistic send and its
/// eventual server confirmation are merged into a single record by the
/// message store. `created_at` is the sole sort key; ties keep insertion
/// order.
///
/// The body may embed `[label](path)` link markup (resolved to in-app
/// links, never raw HTML); see [`super::parse_segments`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Stable identifier once confirmed; may temporarily equal `temp_id`.
    pub id: MessageId,

    /// Correlation key, present only while the send is unconfirmed.
    #[serde(rename = "tempId", skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<TempId>,

    /// The server conversation, absent for guests until one exists.
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<ConversationId>,

    /// The guest session the message belongs to, if any.
    #[serde(rename = "sessionId")]
    pub session_id: Option<SessionId>,

    /// The authenticated sender, if any.
    #[serde(rename = "senderId")]
    pub sender_id: Option<UserId>,

    /// The kind of actor that authored the message.
    #[serde(rename = "senderType")]
    pub sender_type: SenderType,

    /// The text body.
    pub message: String,

    /// Open attribute bag (token stats, guest flags, error flags).
    #[serde(default)]
    pub metadata: MessageMetadata,

    /// Creation timestamp; the sole ordering key.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// Delivery state.
    pub status: MessageStatus,
}

impl ChatMessage {
    /// Builds the optimistic entry for an authenticated send.
    ///
    /// The entry starts in [`MessageStatus::Sending`] with its id equal to
    /// the correlation key until the server confirms it.
    #[must_use]
    pub fn outgoing_user(
        temp_id: &TempId,
        body: impl Into<String>,
        sender_id: UserId,
        conversation_id: Option<ConversationId>,
        metadata: MessageMetadata,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            id: MessageId::from_temp(temp_id),
            temp_id: Some(temp_id.clone()),
            conversation_id,
            session_id: None,
            sender_id: Some(sender_id),
            sender_type: SenderType::User,
            message: body.into(),
            metadata,
            created_at: clock.utc(),
            status: MessageStatus::Sending,
        }
    }

    /// Builds a guest-authored entry that lives only in client storage.
    #[must_use]
    pub fn guest_local(
        temp_id: &TempId,
        body: impl Into<String>,
        session_id: SessionId,
        metadata: MessageMetadata,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            id: MessageId::from_temp(temp_id),
            temp_id: Some(temp_id.clone()),
            conversation_id: None,
            session_id: Some(session_id),
            sender_id: None,
            sender_type: SenderType::Guest,
            message: body.into(),
            metadata,
            created_at: clock.utc(),
            status: MessageStatus::Local,
        }
    }

    /// Builds the placeholder entry shown while the AI reply is pending.
    ///
    /// Guest placeholders are `local`; authenticated ones are `sending`
    /// until the orchestrator resolves them in place.
    #[must_use]
    pub fn bot_pending(
        temp_id: &TempId,
        conversation_id: Option<ConversationId>,
        session_id: Option<SessionId>,
        is_guest: bool,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            id: MessageId::from_temp(temp_id),
            temp_id: Some(temp_id.clone()),
            conversation_id: if is_guest { None } else { conversation_id },
            session_id,
            sender_id: None,
            sender_type: SenderType::Bot,
            message: THINKING_PLACEHOLDER.to_owned(),
            metadata: MessageMetadata::empty(),
            created_at: clock.utc(),
            status: if is_guest {
                MessageStatus::Local
            } else {
                MessageStatus::Sending
            },
        }
    }

    /// Returns `true` while the entry awaits server confirmation.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.temp_id.is_some() && self.status.is_pending()
    }

    /// Returns `true` for entries that only exist in client storage.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self.status, MessageStatus::Local)
    }
}

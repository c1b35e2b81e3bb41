//! The transport-event reducer.
//!
//! Every event from the live connection flows through [`EngineState::apply`],
//! a pure function from (state, event, pending-send registry) to a list of
//! [`Effect`]s. The session executes the effects; the reducer itself never
//! touches a socket, a clock, or storage, which keeps every reconciliation
//! rule testable in isolation.

use tracing::{debug, warn};

use crate::chat::domain::{ConversationId, MessageId, SessionId, TempId, UserId};
use crate::chat::ports::TransportEvent;

/// Read-only view of the optimistic-send registry.
///
/// The reducer only needs to know whether a correlation key is still
/// unclaimed; the store implements this, and tests can use a plain set.
pub trait PendingSends {
    /// Returns `true` while the send awaits acknowledgement.
    fn is_pending(&self, temp_id: &TempId) -> bool;
}

impl PendingSends for std::collections::HashSet<TempId> {
    fn is_pending(&self, temp_id: &TempId) -> bool {
        self.contains(temp_id)
    }
}

/// One instruction the session must carry out in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Merge an inbound message into the timeline.
    Merge(crate::chat::domain::ChatMessage),
    /// Resolve an optimistic send with its server-issued id, then
    /// consider triggering an AI reply.
    Acknowledge {
        /// The claimed correlation key.
        temp_id: TempId,
        /// The server-issued id.
        message_id: MessageId,
    },
    /// Resolve a send the server rejected.
    AcknowledgeFailed {
        /// The claimed correlation key.
        temp_id: TempId,
        /// The server's reason, when it gave one.
        reason: Option<String>,
    },
    /// Join the conversation room on the live connection.
    JoinConversation(ConversationId),
    /// Persist a newly adopted conversation id to client storage.
    PersistConversationId(ConversationId),
    /// Persist a server-issued session id to client storage.
    PersistSessionId(SessionId),
    /// Reload the conversation history from the server.
    ReloadMessages(ConversationId),
    /// Publish the connection indicator.
    SetConnected(bool),
    /// Raise or clear the typing flag for a counterpart.
    SetTyping {
        /// Who is typing.
        user_id: UserId,
        /// Whether the flag is raised.
        is_typing: bool,
    },
}

/// Reducer state: what the event loop knows between events.
#[derive(Debug, Default)]
pub struct EngineState {
    conversation_id: Option<ConversationId>,
    connected: bool,
}

impl EngineState {
    /// Creates a reducer, optionally seeded with a known conversation.
    #[must_use]
    pub const fn new(conversation_id: Option<ConversationId>) -> Self {
        Self {
            conversation_id,
            connected: false,
        }
    }

    /// The conversation currently adopted, if any.
    #[must_use]
    pub const fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    /// Whether the live connection is up.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Adopts a conversation id from outside the event stream (initial
    /// resolution or storage restore).
    pub const fn set_conversation(&mut self, conversation_id: ConversationId) {
        self.conversation_id = Some(conversation_id);
    }

    /// Drops the adopted conversation (logout).
    pub const fn clear_conversation(&mut self) {
        self.conversation_id = None;
    }

    /// Reduces one transport event to the effects it demands.
    ///
    /// Acknowledgements and rejections are honoured only while the
    /// correlation key is still in the pending registry; a late event
    /// whose key the watchdog already claimed reduces to nothing.
    pub fn apply(&mut self, event: TransportEvent, pending: &dyn PendingSends) -> Vec<Effect> {
        match event {
            TransportEvent::Connected => {
                self.connected = true;
                let mut effects = vec![Effect::SetConnected(true)];
                if let Some(id) = self.conversation_id {
                    effects.push(Effect::JoinConversation(id));
                }
                effects
            }
            TransportEvent::Disconnected { reason } => {
                debug!(%reason, "transport disconnected");
                self.connected = false;
                vec![Effect::SetConnected(false)]
            }
            TransportEvent::ConnectError { reason } => {
                warn!(%reason, "transport connect error");
                self.connected = false;
                vec![Effect::SetConnected(false)]
            }
            TransportEvent::Message(message) => {
                let mut effects = Vec::new();
                if self.conversation_id.is_none()
                    && let Some(id) = message.conversation_id
                {
                    // First server-confirmed message: adopt its conversation.
                    self.conversation_id = Some(id);
                    effects.push(Effect::PersistConversationId(id));
                    effects.push(Effect::JoinConversation(id));
                    effects.push(Effect::ReloadMessages(id));
                }
                // A room echo carrying the correlation key of an
                // unconfirmed send doubles as its acknowledgement.
                if let Some(temp_id) = &message.temp_id
                    && pending.is_pending(temp_id)
                {
                    effects.push(Effect::Acknowledge {
                        temp_id: temp_id.clone(),
                        message_id: message.id.clone(),
                    });
                }
                effects.push(Effect::Merge(message));
                effects
            }
            TransportEvent::MessageConfirmed {
                temp_id,
                message_id,
            } => {
                if pending.is_pending(&temp_id) {
                    vec![Effect::Acknowledge {
                        temp_id,
                        message_id,
                    }]
                } else {
                    debug!(%temp_id, "late acknowledgement ignored");
                    Vec::new()
                }
            }
            TransportEvent::MessageFailed { temp_id, error } => {
                if pending.is_pending(&temp_id) {
                    vec![Effect::AcknowledgeFailed {
                        temp_id,
                        reason: error,
                    }]
                } else {
                    debug!(%temp_id, "late rejection ignored");
                    Vec::new()
                }
            }
            TransportEvent::ConversationCreated { conversation_id } => {
                if self.conversation_id.is_some() {
                    Vec::new()
                } else {
                    self.conversation_id = Some(conversation_id);
                    vec![
                        Effect::PersistConversationId(conversation_id),
                        Effect::JoinConversation(conversation_id),
                        Effect::ReloadMessages(conversation_id),
                    ]
                }
            }
            TransportEvent::ConversationUpdated { conversation_id } => {
                if self.conversation_id == Some(conversation_id) {
                    vec![Effect::ReloadMessages(conversation_id)]
                } else {
                    Vec::new()
                }
            }
            TransportEvent::Typing { user_id, is_typing } => {
                vec![Effect::SetTyping { user_id, is_typing }]
            }
            TransportEvent::SessionInitialized { session_id } => {
                vec![Effect::PersistSessionId(session_id)]
            }
        }
    }
}

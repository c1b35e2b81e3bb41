//! Conversation-history REST surface.
//!
//! Covers the tenant-scoped endpoints the chat core consumes: the message
//! history, the bot-message persistence side channel, the user's latest
//! conversation lookup, and the AI enable/toggle switch.

use async_trait::async_trait;

use crate::chat::domain::{ChatMessage, ConversationId, MessageMetadata, SessionId, UserId};
use crate::chat::error::HistoryResult;

/// Port for the server's conversation REST surface.
#[async_trait]
pub trait ConversationHistory: Send + Sync {
    /// Fetches all messages of a conversation
    /// (`GET /chat/messages?conversationId={id}` with the tenant header).
    /// The result is not guaranteed sorted; the store reorders on load.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` when the request fails or the body is
    /// malformed.
    async fn messages(&self, conversation_id: ConversationId) -> HistoryResult<Vec<ChatMessage>>;

    /// Persists a bot/AI-authored message directly, bypassing the live
    /// socket. Used for canned and AI replies in authenticated mode and
    /// for replaying bot messages during migration.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` when the request fails.
    async fn save_bot_message(
        &self,
        conversation_id: ConversationId,
        message: &str,
        metadata: Option<MessageMetadata>,
        session_id: Option<&SessionId>,
    ) -> HistoryResult<()>;

    /// Looks up the user's most recent conversation, if any.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` when the request fails.
    async fn latest_conversation(&self, user_id: UserId) -> HistoryResult<Option<ConversationId>>;

    /// Reads the tenant's AI-enabled switch
    /// (`GET /tenants/{tenantId}/ai-status`).
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` when the request fails.
    async fn ai_enabled(&self) -> HistoryResult<bool>;

    /// Flips the tenant's AI switch (`PUT /tenants/{tenantId}/toggle-ai`)
    /// and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` when the request fails.
    async fn toggle_ai(&self) -> HistoryResult<bool>;
}

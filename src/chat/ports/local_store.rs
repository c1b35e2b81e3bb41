//! Durable client storage port (the browser-storage analogue).
//!
//! Holds the guest session id, the guest-local message cache, and the
//! persisted conversation/session markers. Only `status='local'` entries
//! ever enter the message cache.

use async_trait::async_trait;

use crate::chat::domain::{ChatMessage, ConversationId, SessionId};
use crate::chat::error::StorageResult;

/// Port for durable client-side key storage.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Reads the persisted guest session id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn guest_session_id(&self) -> StorageResult<Option<SessionId>>;

    /// Persists the guest session id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn set_guest_session_id(&self, session_id: &SessionId) -> StorageResult<()>;

    /// Clears the guest session id (on login).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn clear_guest_session_id(&self) -> StorageResult<()>;

    /// Reads the guest-local message cache.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails or the cached
    /// value is corrupt.
    async fn local_messages(&self) -> StorageResult<Vec<ChatMessage>>;

    /// Replaces the guest-local message cache. Callers must pass only
    /// `status='local'` entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn set_local_messages(&self, messages: &[ChatMessage]) -> StorageResult<()>;

    /// Atomically removes and returns the guest-local cache, leaving it
    /// empty. The migration protocol drains through this so a concurrent
    /// second run finds nothing to replay.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn take_local_messages(&self) -> StorageResult<Vec<ChatMessage>>;

    /// Reads the persisted conversation marker.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn conversation_id(&self) -> StorageResult<Option<ConversationId>>;

    /// Persists the conversation marker.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn set_conversation_id(&self, conversation_id: ConversationId) -> StorageResult<()>;

    /// Clears the conversation marker (on logout).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn clear_conversation_id(&self) -> StorageResult<()>;

    /// Persists the transport-assigned session id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store fails.
    async fn set_session_id(&self, session_id: &SessionId) -> StorageResult<()>;
}

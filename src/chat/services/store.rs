//! The reconciling message store.
//!
//! Holds the single ordered timeline the UI renders, plus the registry of
//! unconfirmed optimistic sends. An optimistic entry and its eventual
//! server confirmation always collapse into one record; duplicates from
//! echo, reload, or reconnect replay are merged idempotently.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::chat::domain::{
    ChatMessage, ConversationId, MessageId, MessageMetadata, MessageStatus, SenderType, TempId,
};
use crate::chat::error::{StorageError, StorageResult};
use crate::chat::services::engine::PendingSends;

/// What the store remembers about an unconfirmed optimistic send.
///
/// Exactly one of the acknowledgement path and the watchdog path may
/// claim an entry; whichever arrives second finds the registry empty and
/// does nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    /// The text that was sent, used to trigger the AI reply on confirm.
    pub message_text: String,
    /// The conversation targeted at send time, if one existed.
    pub conversation_id: Option<ConversationId>,
    /// Who authored the send.
    pub sender_type: SenderType,
    /// When the send was handed to the transport.
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreInner {
    messages: Vec<ChatMessage>,
    pending: HashMap<TempId, PendingSend>,
}

/// Thread-safe message timeline with optimistic-send reconciliation.
#[derive(Debug, Default)]
pub struct MessageStore {
    inner: Mutex<StoreInner>,
}

fn same_entry(existing: &ChatMessage, incoming: &ChatMessage) -> bool {
    if existing.id == incoming.id {
        return true;
    }
    if let (Some(a), Some(b)) = (&existing.temp_id, &incoming.temp_id)
        && a == b
    {
        return true;
    }
    if let Some(temp) = &incoming.temp_id
        && existing.id == MessageId::from_temp(temp)
    {
        return true;
    }
    if let Some(temp) = &existing.temp_id
        && incoming.id == MessageId::from_temp(temp)
    {
        return true;
    }
    false
}

impl MessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::backend("message store lock poisoned"))
    }

    /// Inserts a message, merging it into an existing entry when the two
    /// describe the same logical message (same id, or a correlation-key
    /// match in either direction).
    ///
    /// A merge replaces the entry in place, keeping its timeline position.
    /// The incoming copy wins; entries confirmed with a server-issued
    /// numeric id drop their correlation key. Appends re-sort the timeline
    /// by `created_at` (stable, so ties keep insertion order).
    ///
    /// Returns `true` when the message was appended as a new entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn add_or_merge(&self, incoming: ChatMessage) -> StorageResult<bool> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner
            .messages
            .iter_mut()
            .find(|existing| same_entry(existing, &incoming))
        {
            let mut merged = incoming;
            if merged.id.is_numeric() {
                merged.temp_id = None;
                if merged.status.is_pending() {
                    merged.status = MessageStatus::Sent;
                }
            }
            *existing = merged;
            return Ok(false);
        }
        inner.messages.push(incoming);
        inner.messages.sort_by_key(|m| m.created_at);
        Ok(true)
    }

    /// Confirms an optimistic send in place: the entry takes the
    /// server-issued id, transitions to `sent`, and drops its correlation
    /// key. A miss is a no-op (the entry was already merged away).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn confirm(&self, temp_id: &TempId, message_id: MessageId) -> StorageResult<()> {
        let mut inner = self.lock()?;
        if let Some(entry) = inner
            .messages
            .iter_mut()
            .find(|m| m.temp_id.as_ref() == Some(temp_id))
        {
            entry.id = message_id;
            entry.status = MessageStatus::Sent;
            entry.temp_id = None;
        }
        Ok(())
    }

    /// Force-resolves an unacknowledged send to `sent`, keeping its local
    /// id. Used by the watchdog: a send is never shown as failed merely
    /// because the acknowledgement went missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn force_sent(&self, temp_id: &TempId) -> StorageResult<()> {
        let mut inner = self.lock()?;
        if let Some(entry) = inner
            .messages
            .iter_mut()
            .find(|m| m.temp_id.as_ref() == Some(temp_id))
        {
            entry.status = MessageStatus::Sent;
            entry.temp_id = None;
        }
        Ok(())
    }

    /// Resolves a placeholder entry in place: new id, new body, new
    /// metadata, final status, correlation key cleared. Used when an AI
    /// reply (or a canned substitute) replaces the "..." placeholder.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn resolve_placeholder(
        &self,
        temp_id: &TempId,
        id: MessageId,
        body: impl Into<String>,
        status: MessageStatus,
        metadata: MessageMetadata,
    ) -> StorageResult<()> {
        let mut inner = self.lock()?;
        if let Some(entry) = inner
            .messages
            .iter_mut()
            .find(|m| m.temp_id.as_ref() == Some(temp_id))
        {
            entry.id = id;
            entry.message = body.into();
            entry.status = status;
            entry.metadata = metadata;
            entry.temp_id = None;
        }
        Ok(())
    }

    /// Replaces the whole timeline, re-sorting by `created_at`. Used by
    /// history loads; unconfirmed sends in the pending registry are
    /// unaffected.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn replace_all(&self, messages: Vec<ChatMessage>) -> StorageResult<()> {
        let mut inner = self.lock()?;
        inner.messages = messages;
        inner.messages.sort_by_key(|m| m.created_at);
        Ok(())
    }

    /// Returns a copy of the current timeline.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn snapshot(&self) -> StorageResult<Vec<ChatMessage>> {
        Ok(self.lock()?.messages.clone())
    }

    /// Returns the guest-local entries, in timeline order. These are the
    /// messages a migration must replay.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn local_messages(&self) -> StorageResult<Vec<ChatMessage>> {
        Ok(self
            .lock()?
            .messages
            .iter()
            .filter(|m| m.is_local())
            .cloned()
            .collect())
    }

    /// Counts admin and bot messages newer than the given marker, for the
    /// unread badge while the widget is closed. Unresolved thinking
    /// placeholders (status `sending`) do not count.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn unread_count(&self, last_read: Option<DateTime<Utc>>) -> StorageResult<usize> {
        Ok(self
            .lock()?
            .messages
            .iter()
            .filter(|m| matches!(m.sender_type, SenderType::Admin | SenderType::Bot))
            .filter(|m| m.status != MessageStatus::Sending)
            .filter(|m| last_read.is_none_or(|marker| m.created_at > marker))
            .count())
    }

    /// Registers an optimistic send awaiting acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn register_pending(&self, temp_id: TempId, send: PendingSend) -> StorageResult<()> {
        self.lock()?.pending.insert(temp_id, send);
        Ok(())
    }

    /// Atomically claims an unconfirmed send, removing it from the
    /// registry. Both the acknowledgement handler and the watchdog call
    /// this; only the first claimant gets `Some` and acts on it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn claim(&self, temp_id: &TempId) -> StorageResult<Option<PendingSend>> {
        Ok(self.lock()?.pending.remove(temp_id))
    }

    /// Returns how many sends await acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the store lock is poisoned.
    pub fn pending_count(&self) -> StorageResult<usize> {
        Ok(self.lock()?.pending.len())
    }
}

impl PendingSends for MessageStore {
    fn is_pending(&self, temp_id: &TempId) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.pending.contains_key(temp_id))
            .unwrap_or(false)
    }
}

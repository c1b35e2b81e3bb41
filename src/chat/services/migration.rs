//! Guest-to-authenticated migration protocol.
//!
//! When a guest signs in, the locally cached conversation is replayed into
//! their server conversation: customer-authored entries go back out over
//! the live connection as authenticated sends, assistant entries are
//! persisted through the bot-message side channel. Migration is
//! best-effort; a failed replay of one entry never aborts the rest.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::chat::domain::{ConversationId, TempId, TenantId, UserId};
use crate::chat::error::MigrationError;
use crate::chat::ports::{ChatTransport, ConversationHistory, LocalStore, OutboundMessage};

/// Counts of what one migration run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Customer entries re-sent over the live connection.
    pub replayed: usize,
    /// Assistant entries persisted through the side channel.
    pub persisted: usize,
    /// Entries that failed either path and were skipped.
    pub failed: usize,
}

/// Replays the guest-local message cache into a server conversation.
pub struct Migrator<T, H, S>
where
    T: ChatTransport,
    H: ConversationHistory,
    S: LocalStore,
{
    transport: Arc<T>,
    history: Arc<H>,
    store: Arc<S>,
    tenant_id: TenantId,
    in_flight: AtomicBool,
}

impl<T, H, S> Migrator<T, H, S>
where
    T: ChatTransport,
    H: ConversationHistory,
    S: LocalStore,
{
    /// Creates a migrator.
    #[must_use]
    pub fn new(transport: Arc<T>, history: Arc<H>, store: Arc<S>, tenant_id: TenantId) -> Self {
        Self {
            transport,
            history,
            store,
            tenant_id,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Runs the migration for a freshly signed-in user.
    ///
    /// The local cache is drained atomically up front, so a concurrent
    /// second invocation (or an interleaved identity flap) finds nothing
    /// to replay. Entries keep their original relative order; the final
    /// ordering on the server is by timestamp once the history reloads.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::NoConversation` when no conversation id is
    /// available, `MigrationError::InFlight` when a run is already active,
    /// and `MigrationError::Storage` when the cache cannot be drained.
    pub async fn migrate(
        &self,
        user_id: UserId,
        conversation_id: Option<ConversationId>,
    ) -> Result<MigrationReport, MigrationError> {
        let conversation_id = conversation_id.ok_or(MigrationError::NoConversation)?;
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MigrationError::InFlight);
        }
        let result = self.run(user_id, conversation_id).await;
        self.in_flight.store(false, Ordering::Release);
        result
    }

    async fn run(
        &self,
        user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<MigrationReport, MigrationError> {
        let cached = self.store.take_local_messages().await?;
        if cached.is_empty() {
            return Ok(MigrationReport::default());
        }
        info!(count = cached.len(), %conversation_id, "migrating guest messages");

        let mut report = MigrationReport::default();
        for entry in cached {
            if entry.sender_type.is_customer() {
                let payload = OutboundMessage {
                    message: entry.message.clone(),
                    temp_id: TempId::for_migration(),
                    metadata: entry.metadata.clone(),
                    sender_type: crate::chat::domain::SenderType::User,
                    sender_id: Some(user_id),
                    tenant_id: self.tenant_id,
                    conversation_id: Some(conversation_id),
                };
                match self.transport.send(payload).await {
                    Ok(()) => report.replayed += 1,
                    Err(error) => {
                        warn!(%error, "skipping customer entry that failed to replay");
                        report.failed += 1;
                    }
                }
            } else {
                match self
                    .history
                    .save_bot_message(conversation_id, &entry.message, None, None)
                    .await
                {
                    Ok(()) => report.persisted += 1,
                    Err(error) => {
                        warn!(%error, "skipping assistant entry that failed to persist");
                        report.failed += 1;
                    }
                }
            }
        }

        self.store.clear_guest_session_id().await?;
        info!(?report, "migration finished");
        Ok(report)
    }
}

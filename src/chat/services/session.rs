//! The chat session: one owned object wiring transport, storage, history,
//! identity, migration, and AI orchestration together.
//!
//! The session owns the event loop that reduces transport events through
//! [`EngineState`] and executes the resulting effects against the message
//! store and the ports. The UI observes it through a broadcast update
//! channel plus snapshot accessors; it never touches the socket directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use mockable::Clock;
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::chat::config::ChatConfig;
use crate::chat::domain::{
    AuthState, AuthUser, ChatMessage, ConversationId, Identity, MessageId, MessageMetadata,
    MessageStatus, SenderType, TempId, UserId,
};
use crate::chat::error::{ChatError, StorageError, TransportError};
use crate::chat::ports::{
    AiProvider, ChatTransport, ConversationHistory, LocalStore, OutboundMessage, ProductCatalog,
    TokenLedger, TransportEvent,
};
use crate::chat::services::engine::{Effect, EngineState};
use crate::chat::services::migration::Migrator;
use crate::chat::services::orchestrator::{AiOrchestrator, ReplyRequest};
use crate::chat::services::resolver::IdentityResolver;
use crate::chat::services::store::{MessageStore, PendingSend};

/// Notifications pushed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The message timeline changed; take a fresh snapshot.
    Messages,
    /// The live-connection indicator changed.
    Connection(bool),
    /// The admin typing flag changed.
    AdminTyping(bool),
    /// The AI thinking indicator changed.
    AiThinking(bool),
}

/// One client chat session.
pub struct ChatSession<T, H, S, P, L, C, K>
where
    T: ChatTransport + 'static,
    H: ConversationHistory + 'static,
    S: LocalStore + 'static,
    P: AiProvider + 'static,
    L: TokenLedger + 'static,
    C: ProductCatalog + 'static,
    K: Clock + Send + Sync + 'static,
{
    transport: Arc<T>,
    history: Arc<H>,
    local: Arc<S>,
    store: Arc<MessageStore>,
    orchestrator: Arc<AiOrchestrator<P, L, H, C>>,
    migrator: Arc<Migrator<T, H, S>>,
    resolver: IdentityResolver<S>,
    engine: Mutex<EngineState>,
    user: Mutex<Option<AuthUser>>,
    clock: Arc<K>,
    config: Arc<ChatConfig>,
    updates: broadcast::Sender<SessionUpdate>,
    typing_generation: AtomicU64,
    admin_typing: AtomicBool,
    loop_started: AtomicBool,
}

impl<T, H, S, P, L, C, K> ChatSession<T, H, S, P, L, C, K>
where
    T: ChatTransport + 'static,
    H: ConversationHistory + 'static,
    S: LocalStore + 'static,
    P: AiProvider + 'static,
    L: TokenLedger + 'static,
    C: ProductCatalog + 'static,
    K: Clock + Send + Sync + 'static,
{
    /// Wires a session from its ports.
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        history: Arc<H>,
        local: Arc<S>,
        provider: Arc<P>,
        ledger: Arc<L>,
        catalog: Arc<C>,
        clock: Arc<K>,
        config: ChatConfig,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        let store = Arc::new(MessageStore::new());
        let orchestrator = Arc::new(AiOrchestrator::new(
            provider,
            ledger,
            Arc::clone(&history),
            catalog,
            Arc::clone(&config),
        ));
        let migrator = Arc::new(Migrator::new(
            Arc::clone(&transport),
            Arc::clone(&history),
            Arc::clone(&local),
            config.tenant_id,
        ));
        let resolver = IdentityResolver::new(Arc::clone(&local));
        let (updates, _) = broadcast::channel(64);
        Arc::new(Self {
            transport,
            history,
            local,
            store,
            orchestrator,
            migrator,
            resolver,
            engine: Mutex::new(EngineState::new(None)),
            user: Mutex::new(None),
            clock,
            config,
            updates,
            typing_generation: AtomicU64::new(0),
            admin_typing: AtomicBool::new(false),
            loop_started: AtomicBool::new(false),
        })
    }

    /// Subscribes to UI notifications.
    #[must_use]
    pub fn updates(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// A snapshot of the current timeline.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Storage` when the store lock is poisoned.
    pub fn messages(&self) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.store.snapshot()?)
    }

    /// Counts shop-side messages newer than the given read marker.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Storage` when the store lock is poisoned.
    pub fn unread_count(
        &self,
        last_read: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<usize, ChatError> {
        Ok(self.store.unread_count(last_read)?)
    }

    /// The resolved identity, if auth state has been published.
    pub async fn identity(&self) -> Option<Identity> {
        self.resolver.current().await
    }

    /// Whether the admin typing flag is currently raised.
    #[must_use]
    pub fn admin_typing(&self) -> bool {
        self.admin_typing.load(Ordering::Acquire)
    }

    /// Publishes the host application's auth state.
    ///
    /// Guests get their cached conversation loaded from client storage.
    /// A sign-in connects the transport, resolves the user's conversation,
    /// loads its history, and (when coming from a guest session) schedules
    /// the migration replay. A sign-out disconnects and returns to the
    /// guest cache.
    ///
    /// # Errors
    ///
    /// Returns `ChatError` when client storage fails or the transport
    /// exhausts its connection attempts.
    pub async fn set_auth(self: &Arc<Self>, auth: &AuthState) -> Result<(), ChatError> {
        {
            let mut user = self.user.lock().await;
            *user = match auth {
                AuthState::SignedIn(signed_in) => Some(signed_in.clone()),
                AuthState::Anonymous => None,
            };
        }
        let Some(change) = self.resolver.resolve(auth).await? else {
            return Ok(());
        };
        match &change.to {
            Identity::Guest { .. } => self.enter_guest_mode().await?,
            Identity::Authenticated { user_id, .. } => {
                self.enter_authenticated_mode(*user_id, change.is_login())
                    .await?;
            }
        }
        Ok(())
    }

    /// Sends a customer message.
    ///
    /// Guests append a local-only entry and get a local AI reply;
    /// authenticated customers get an optimistic entry, a live-connection
    /// emit, and an acknowledgement watchdog.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` for a blank body, and transport
    /// or storage errors from the respective path.
    pub async fn send_message(self: &Arc<Self>, body: &str) -> Result<(), ChatError> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let identity = self
            .resolver
            .current()
            .await
            .ok_or_else(|| StorageError::backend("auth state not yet published"))?;
        match identity {
            Identity::Guest { session_id } => self.send_as_guest(trimmed, session_id).await,
            Identity::Authenticated { user_id, .. } => self.send_as_user(trimmed, user_id).await,
        }
    }

    async fn send_as_guest(
        self: &Arc<Self>,
        body: &str,
        session_id: crate::chat::domain::SessionId,
    ) -> Result<(), ChatError> {
        let temp_id = TempId::generate();
        let metadata = MessageMetadata::for_guest(session_id.clone());
        let message = ChatMessage::guest_local(&temp_id, body, session_id, metadata, &*self.clock);
        self.store.add_or_merge(message)?;
        self.persist_local_cache().await?;
        self.notify(SessionUpdate::Messages);

        let session = Arc::clone(self);
        let text = body.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(session.config.guest_ai_reply_delay).await;
            session.produce_ai_reply(&text, None, true).await;
        });
        Ok(())
    }

    async fn send_as_user(self: &Arc<Self>, body: &str, user_id: UserId) -> Result<(), ChatError> {
        let conversation_id = self.engine.lock().await.conversation_id();
        let temp_id = TempId::generate();
        let metadata = MessageMetadata::for_user(user_id, self.config.tenant_id);
        let message = ChatMessage::outgoing_user(
            &temp_id,
            body,
            user_id,
            conversation_id,
            metadata.clone(),
            &*self.clock,
        );
        self.store.add_or_merge(message)?;
        self.store.register_pending(
            temp_id.clone(),
            PendingSend {
                message_text: body.to_owned(),
                conversation_id,
                sender_type: SenderType::User,
                sent_at: self.clock.utc(),
            },
        )?;
        self.notify(SessionUpdate::Messages);
        self.spawn_ack_watchdog(temp_id.clone());

        let emit = self
            .transport
            .send(OutboundMessage {
                message: body.to_owned(),
                temp_id,
                metadata,
                sender_type: SenderType::User,
                sender_id: Some(user_id),
                tenant_id: self.config.tenant_id,
                conversation_id,
            })
            .await;
        if let Err(error) = emit {
            // The entry stays visible as sending; the watchdog resolves it.
            warn!(%error, "emit failed, leaving the send to the watchdog");
        }
        Ok(())
    }

    /// Resolves an unacknowledged send to `sent` after the watchdog
    /// window, then triggers the AI reply the missing acknowledgement
    /// would have. Whichever of the acknowledgement handler and this task
    /// claims the registry entry first wins; the loser does nothing.
    fn spawn_ack_watchdog(self: &Arc<Self>, temp_id: TempId) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(session.config.ack_timeout).await;
            let claimed = match session.store.claim(&temp_id) {
                Ok(claimed) => claimed,
                Err(error) => {
                    warn!(%error, "watchdog could not inspect the send registry");
                    return;
                }
            };
            let Some(pending) = claimed else {
                return;
            };
            warn!(%temp_id, "no acknowledgement in time, resolving to sent");
            if session.store.force_sent(&temp_id).is_ok() {
                session.notify(SessionUpdate::Messages);
            }
            if pending.sender_type.is_customer() {
                tokio::time::sleep(session.config.ai_reply_delay).await;
                let conversation_id = session.engine.lock().await.conversation_id();
                session
                    .produce_ai_reply(&pending.message_text, conversation_id, false)
                    .await;
            }
        });
    }

    async fn enter_guest_mode(self: &Arc<Self>) -> Result<(), ChatError> {
        self.transport.disconnect().await;
        self.engine.lock().await.clear_conversation();
        let cached = self.local.local_messages().await?;
        self.store.replace_all(cached)?;
        self.notify(SessionUpdate::Messages);
        Ok(())
    }

    async fn enter_authenticated_mode(
        self: &Arc<Self>,
        user_id: UserId,
        migrate: bool,
    ) -> Result<(), ChatError> {
        self.start_event_loop()?;
        // Seed the conversation before connecting; the reducer emits the
        // single room join when it applies the Connected event.
        let conversation_id = self.resolve_conversation(user_id).await?;
        if let Some(id) = conversation_id {
            self.engine.lock().await.set_conversation(id);
        }
        self.connect_with_retries().await?;
        if let Some(id) = conversation_id {
            self.load_messages(id).await;
        }

        if migrate {
            self.spawn_migration(user_id);
        }
        Ok(())
    }

    /// Picks the user's conversation: the persisted marker wins, then the
    /// server's most recent conversation. `None` means the server will
    /// create one lazily on the first confirmed send.
    async fn resolve_conversation(
        &self,
        user_id: UserId,
    ) -> Result<Option<ConversationId>, ChatError> {
        if let Some(stored) = self.local.conversation_id().await? {
            return Ok(Some(stored));
        }
        match self.history.latest_conversation(user_id).await {
            Ok(Some(latest)) => {
                self.local.set_conversation_id(latest).await?;
                Ok(Some(latest))
            }
            Ok(None) => Ok(None),
            Err(error) => {
                warn!(%error, "latest-conversation lookup failed");
                Ok(None)
            }
        }
    }

    fn spawn_migration(self: &Arc<Self>, user_id: UserId) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(session.config.migration_settle_delay).await;
            let conversation_id = session.engine.lock().await.conversation_id();
            match session.migrator.migrate(user_id, conversation_id).await {
                Ok(report) => debug!(?report, "guest migration done"),
                Err(error) => {
                    warn!(%error, "guest migration failed");
                    return;
                }
            }
            if let Some(id) = conversation_id {
                tokio::time::sleep(session.config.reload_delay).await;
                session.load_messages(id).await;
            }
        });
    }

    async fn connect_with_retries(&self) -> Result<(), ChatError> {
        if self.transport.is_connected() {
            return Ok(());
        }
        let attempts = self.config.reconnect_attempts;
        for attempt in 1..=attempts {
            match self.transport.connect().await {
                Ok(()) => {
                    info!(attempt, "transport connected");
                    return Ok(());
                }
                Err(error) => {
                    warn!(attempt, %error, "connection attempt failed");
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
            }
        }
        Err(TransportError::RetriesExhausted { attempts }.into())
    }

    fn start_event_loop(self: &Arc<Self>) -> Result<(), ChatError> {
        if self.loop_started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let receiver = match self.transport.subscribe() {
            Ok(receiver) => receiver,
            Err(error) => {
                self.loop_started.store(false, Ordering::Release);
                return Err(error.into());
            }
        };
        let session = Arc::clone(self);
        tokio::spawn(session.run(receiver));
        Ok(())
    }

    async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            let effects = {
                let mut engine = self.engine.lock().await;
                engine.apply(event, &*self.store)
            };
            for effect in effects {
                self.handle_effect(effect).await;
            }
        }
        debug!("transport event stream closed");
    }

    async fn handle_effect(self: &Arc<Self>, effect: Effect) {
        match effect {
            Effect::Merge(message) => {
                match self.store.add_or_merge(message) {
                    Ok(_) => self.notify(SessionUpdate::Messages),
                    Err(error) => warn!(%error, "merge failed"),
                }
            }
            Effect::Acknowledge {
                temp_id,
                message_id,
            } => self.handle_acknowledgement(&temp_id, message_id).await,
            Effect::AcknowledgeFailed { temp_id, reason } => {
                self.handle_rejection(&temp_id, reason.as_deref());
            }
            Effect::JoinConversation(id) => {
                if let Err(error) = self.transport.join_conversation(id).await {
                    warn!(%error, "rejoin failed");
                }
            }
            Effect::PersistConversationId(id) => {
                if let Err(error) = self.local.set_conversation_id(id).await {
                    warn!(%error, "could not persist conversation id");
                }
            }
            Effect::PersistSessionId(session_id) => {
                if let Err(error) = self.local.set_session_id(&session_id).await {
                    warn!(%error, "could not persist session id");
                }
            }
            Effect::ReloadMessages(id) => self.load_messages(id).await,
            Effect::SetConnected(connected) => self.notify(SessionUpdate::Connection(connected)),
            Effect::SetTyping { user_id, is_typing } => {
                debug!(%user_id, is_typing, "typing flag");
                self.set_admin_typing(is_typing);
            }
        }
    }

    async fn handle_acknowledgement(self: &Arc<Self>, temp_id: &TempId, message_id: MessageId) {
        let claimed = match self.store.claim(temp_id) {
            Ok(claimed) => claimed,
            Err(error) => {
                warn!(%error, "could not inspect the send registry");
                return;
            }
        };
        let Some(pending) = claimed else {
            return;
        };
        if let Err(error) = self.store.confirm(temp_id, message_id) {
            warn!(%error, "could not confirm send");
            return;
        }
        self.notify(SessionUpdate::Messages);

        if pending.sender_type.is_customer() {
            let session = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(session.config.ai_reply_delay).await;
                let conversation_id = session.engine.lock().await.conversation_id();
                session
                    .produce_ai_reply(&pending.message_text, conversation_id, false)
                    .await;
            });
        }
    }

    /// A server rejection resolves the entry the same way the watchdog
    /// does. The entry stays visible as `sent` rather than surfacing a
    /// failure state the customer cannot act on.
    fn handle_rejection(&self, temp_id: &TempId, reason: Option<&str>) {
        match self.store.claim(temp_id) {
            Ok(Some(_)) => {
                warn!(%temp_id, ?reason, "send rejected by server, resolving to sent");
                if self.store.force_sent(temp_id).is_ok() {
                    self.notify(SessionUpdate::Messages);
                }
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "could not inspect the send registry"),
        }
    }

    /// Loads history from the server, falling back to the local cache
    /// when the request fails.
    async fn load_messages(self: &Arc<Self>, conversation_id: ConversationId) {
        match self.history.messages(conversation_id).await {
            Ok(messages) => {
                if let Err(error) = self.store.replace_all(messages) {
                    warn!(%error, "could not store loaded history");
                    return;
                }
                self.notify(SessionUpdate::Messages);
            }
            Err(error) => {
                warn!(%error, "history load failed, falling back to local cache");
                match self.local.local_messages().await {
                    Ok(cached) if !cached.is_empty() => {
                        if self.store.replace_all(cached).is_ok() {
                            self.notify(SessionUpdate::Messages);
                        }
                    }
                    Ok(_) => {}
                    Err(storage_error) => warn!(%storage_error, "local fallback failed"),
                }
            }
        }
    }

    /// Shows the thinking placeholder, produces the reply, and resolves
    /// the placeholder in place.
    async fn produce_ai_reply(
        self: &Arc<Self>,
        message_text: &str,
        target_conversation: Option<ConversationId>,
        is_guest: bool,
    ) {
        match self.history.ai_enabled().await {
            Ok(true) => {}
            Ok(false) => {
                debug!("AI replies disabled for this tenant");
                return;
            }
            Err(error) => {
                // An unreachable status endpoint counts as enabled.
                warn!(%error, "AI status check failed, assuming enabled");
            }
        }
        let conversation_id = if is_guest {
            None
        } else if target_conversation.is_some() {
            target_conversation
        } else {
            // The server may still be creating the conversation; give it
            // one reload window before giving up on the reply.
            tokio::time::sleep(self.config.reload_delay).await;
            let retried = self.engine.lock().await.conversation_id();
            if retried.is_none() {
                debug!("no conversation id, skipping AI reply");
                return;
            }
            retried
        };
        let session_id = match self.resolver.current().await {
            Some(Identity::Guest { session_id }) => Some(session_id),
            _ => None,
        };
        let display_name = self
            .user
            .lock()
            .await
            .as_ref()
            .and_then(|user| user.name.clone());

        let temp_id = TempId::for_ai_reply(is_guest);
        let placeholder = ChatMessage::bot_pending(
            &temp_id,
            conversation_id,
            session_id.clone(),
            is_guest,
            &*self.clock,
        );
        if let Err(error) = self.store.add_or_merge(placeholder) {
            warn!(%error, "could not show thinking placeholder");
            return;
        }
        self.notify(SessionUpdate::Messages);
        self.notify(SessionUpdate::AiThinking(true));

        let thinking = if is_guest {
            self.config.guest_thinking_delay
        } else {
            self.config.thinking_delay
        };
        tokio::time::sleep(thinking).await;

        let reply = self
            .orchestrator
            .reply(&ReplyRequest {
                message: message_text,
                conversation_id,
                session_id,
                is_guest,
                display_name: display_name.as_deref(),
            })
            .await;

        let status = if is_guest {
            MessageStatus::Local
        } else {
            MessageStatus::Sent
        };
        let resolved = self.store.resolve_placeholder(
            &temp_id,
            MessageId::local_ai(is_guest),
            reply.text,
            status,
            reply.metadata,
        );
        if let Err(error) = resolved {
            warn!(%error, "could not resolve AI placeholder");
        }
        if is_guest && let Err(error) = self.persist_local_cache().await {
            warn!(%error, "could not persist guest cache");
        }
        self.notify(SessionUpdate::AiThinking(false));
        self.notify(SessionUpdate::Messages);
    }

    /// Writes the current local-only entries back to client storage.
    async fn persist_local_cache(&self) -> Result<(), ChatError> {
        let local_entries = self.store.local_messages()?;
        self.local.set_local_messages(&local_entries).await?;
        Ok(())
    }

    /// Raises the admin typing flag; it decays on its own after the
    /// configured window unless a newer typing event refreshed it.
    fn set_admin_typing(self: &Arc<Self>, is_typing: bool) {
        let generation = self.typing_generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.admin_typing.store(is_typing, Ordering::Release);
        self.notify(SessionUpdate::AdminTyping(is_typing));
        if !is_typing {
            return;
        }
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(session.config.typing_decay).await;
            if session.typing_generation.load(Ordering::Acquire) == generation {
                session.admin_typing.store(false, Ordering::Release);
                session.notify(SessionUpdate::AdminTyping(false));
            }
        });
    }

    fn notify(&self, update: SessionUpdate) {
        self.updates.send(update).ok();
    }
}

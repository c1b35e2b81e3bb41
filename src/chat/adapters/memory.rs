//! In-memory implementations of the client-storage, history, and ledger
//! ports.
//!
//! Thread-safe via internal locks. Used by the unit and scenario tests and
//! by embedders that want a fully local session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::chat::domain::{
    ChatMessage, ConversationId, MessageMetadata, SessionId, TokenUsage, UserId,
};
use crate::chat::error::{
    AiError, AiResult, HistoryError, HistoryResult, StorageError, StorageResult,
};
use crate::chat::ports::ai_provider::{AiCompletion, AiProvider, PromptMetadata};
use crate::chat::ports::history::ConversationHistory;
use crate::chat::ports::local_store::LocalStore;
use crate::chat::ports::token_ledger::{TokenCheck, TokenLedger};

/// In-memory implementation of [`LocalStore`].
#[derive(Debug, Default, Clone)]
pub struct InMemoryLocalStore {
    inner: Arc<RwLock<LocalState>>,
}

#[derive(Debug, Default)]
struct LocalState {
    guest_session_id: Option<SessionId>,
    local_messages: Vec<ChatMessage>,
    conversation_id: Option<ConversationId>,
    session_id: Option<SessionId>,
}

impl InMemoryLocalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transport-assigned session id, if one was persisted.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner
            .read()
            .ok()
            .and_then(|state| state.session_id.clone())
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, LocalState>> {
        self.inner
            .read()
            .map_err(|e| StorageError::backend(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, LocalState>> {
        self.inner
            .write()
            .map_err(|e| StorageError::backend(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn guest_session_id(&self) -> StorageResult<Option<SessionId>> {
        Ok(self.read()?.guest_session_id.clone())
    }

    async fn set_guest_session_id(&self, session_id: &SessionId) -> StorageResult<()> {
        self.write()?.guest_session_id = Some(session_id.clone());
        Ok(())
    }

    async fn clear_guest_session_id(&self) -> StorageResult<()> {
        self.write()?.guest_session_id = None;
        Ok(())
    }

    async fn local_messages(&self) -> StorageResult<Vec<ChatMessage>> {
        Ok(self.read()?.local_messages.clone())
    }

    async fn set_local_messages(&self, messages: &[ChatMessage]) -> StorageResult<()> {
        self.write()?.local_messages = messages.to_vec();
        Ok(())
    }

    async fn take_local_messages(&self) -> StorageResult<Vec<ChatMessage>> {
        Ok(std::mem::take(&mut self.write()?.local_messages))
    }

    async fn conversation_id(&self) -> StorageResult<Option<ConversationId>> {
        Ok(self.read()?.conversation_id)
    }

    async fn set_conversation_id(&self, conversation_id: ConversationId) -> StorageResult<()> {
        self.write()?.conversation_id = Some(conversation_id);
        Ok(())
    }

    async fn clear_conversation_id(&self) -> StorageResult<()> {
        self.write()?.conversation_id = None;
        Ok(())
    }

    async fn set_session_id(&self, session_id: &SessionId) -> StorageResult<()> {
        self.write()?.session_id = Some(session_id.clone());
        Ok(())
    }
}

/// A bot message captured by the in-memory side channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedBotMessage {
    /// The conversation the message was persisted into.
    pub conversation_id: ConversationId,
    /// The text body.
    pub message: String,
    /// Attached metadata, if any.
    pub metadata: Option<MessageMetadata>,
    /// The session the message was attributed to, if any.
    pub session_id: Option<SessionId>,
}

/// In-memory implementation of [`ConversationHistory`].
///
/// Serves scripted conversation transcripts and records every bot-message
/// save so tests can assert on the side channel.
#[derive(Debug, Clone)]
pub struct InMemoryHistory {
    inner: Arc<RwLock<HistoryState>>,
}

#[derive(Debug, Default)]
struct HistoryState {
    conversations: HashMap<ConversationId, Vec<ChatMessage>>,
    latest_by_user: HashMap<UserId, ConversationId>,
    saved_bot_messages: Vec<SavedBotMessage>,
    ai_enabled: bool,
    fail_requests: bool,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHistory {
    /// Creates an empty history with AI enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HistoryState {
                ai_enabled: true,
                ..HistoryState::default()
            })),
        }
    }

    /// Scripts the transcript returned for a conversation.
    pub fn put_conversation(&self, conversation_id: ConversationId, messages: Vec<ChatMessage>) {
        if let Ok(mut state) = self.inner.write() {
            state.conversations.insert(conversation_id, messages);
        }
    }

    /// Scripts the latest-conversation lookup for a user.
    pub fn put_latest(&self, user_id: UserId, conversation_id: ConversationId) {
        if let Ok(mut state) = self.inner.write() {
            state.latest_by_user.insert(user_id, conversation_id);
        }
    }

    /// Sets the AI-enabled switch.
    pub fn set_ai_enabled(&self, enabled: bool) {
        if let Ok(mut state) = self.inner.write() {
            state.ai_enabled = enabled;
        }
    }

    /// Makes every request fail, for error-path tests.
    pub fn fail_requests(&self, fail: bool) {
        if let Ok(mut state) = self.inner.write() {
            state.fail_requests = fail;
        }
    }

    /// Returns every bot message persisted through the side channel.
    #[must_use]
    pub fn saved_bot_messages(&self) -> Vec<SavedBotMessage> {
        self.inner
            .read()
            .map(|state| state.saved_bot_messages.clone())
            .unwrap_or_default()
    }

    fn read(&self) -> HistoryResult<std::sync::RwLockReadGuard<'_, HistoryState>> {
        let guard = self
            .inner
            .read()
            .map_err(|e| HistoryError::Request(format!("lock poisoned: {e}")))?;
        if guard.fail_requests {
            return Err(HistoryError::Request("scripted failure".to_owned()));
        }
        Ok(guard)
    }

    fn write(&self) -> HistoryResult<std::sync::RwLockWriteGuard<'_, HistoryState>> {
        let guard = self
            .inner
            .write()
            .map_err(|e| HistoryError::Request(format!("lock poisoned: {e}")))?;
        if guard.fail_requests {
            return Err(HistoryError::Request("scripted failure".to_owned()));
        }
        Ok(guard)
    }
}

#[async_trait]
impl ConversationHistory for InMemoryHistory {
    async fn messages(&self, conversation_id: ConversationId) -> HistoryResult<Vec<ChatMessage>> {
        Ok(self
            .read()?
            .conversations
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_bot_message(
        &self,
        conversation_id: ConversationId,
        message: &str,
        metadata: Option<MessageMetadata>,
        session_id: Option<&SessionId>,
    ) -> HistoryResult<()> {
        self.write()?.saved_bot_messages.push(SavedBotMessage {
            conversation_id,
            message: message.to_owned(),
            metadata,
            session_id: session_id.cloned(),
        });
        Ok(())
    }

    async fn latest_conversation(&self, user_id: UserId) -> HistoryResult<Option<ConversationId>> {
        Ok(self.read()?.latest_by_user.get(&user_id).copied())
    }

    async fn ai_enabled(&self) -> HistoryResult<bool> {
        Ok(self.read()?.ai_enabled)
    }

    async fn toggle_ai(&self) -> HistoryResult<bool> {
        let mut state = self.write()?;
        state.ai_enabled = !state.ai_enabled;
        Ok(state.ai_enabled)
    }
}

/// In-memory implementation of [`TokenLedger`].
#[derive(Debug, Clone)]
pub struct InMemoryTokenLedger {
    inner: Arc<Mutex<LedgerState>>,
}

#[derive(Debug)]
struct LedgerState {
    balance: u64,
    deductions: Vec<u64>,
    checks: Vec<u64>,
}

impl InMemoryTokenLedger {
    /// Creates a ledger with the given starting balance.
    #[must_use]
    pub fn new(balance: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerState {
                balance,
                deductions: Vec::new(),
                checks: Vec::new(),
            })),
        }
    }

    /// Returns every deduction posted so far.
    #[must_use]
    pub fn deductions(&self) -> Vec<u64> {
        self.inner
            .lock()
            .map(|state| state.deductions.clone())
            .unwrap_or_default()
    }

    /// Returns every estimate checked so far.
    #[must_use]
    pub fn checks(&self) -> Vec<u64> {
        self.inner
            .lock()
            .map(|state| state.checks.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> AiResult<std::sync::MutexGuard<'_, LedgerState>> {
        self.inner
            .lock()
            .map_err(|e| AiError::Ledger(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl TokenLedger for InMemoryTokenLedger {
    async fn balance(&self) -> AiResult<u64> {
        Ok(self.lock()?.balance)
    }

    async fn check(&self, tokens_needed: u64) -> AiResult<TokenCheck> {
        let mut state = self.lock()?;
        state.checks.push(tokens_needed);
        Ok(TokenCheck {
            has_enough_tokens: state.balance >= tokens_needed,
            current_tokens: state.balance,
            tokens_needed,
        })
    }

    async fn deduct(&self, tokens_used: u64) -> AiResult<()> {
        let mut state = self.lock()?;
        state.balance = state.balance.saturating_sub(tokens_used);
        state.deductions.push(tokens_used);
        Ok(())
    }
}

/// Scriptable implementation of [`AiProvider`].
///
/// Returns a queue of scripted completions in order, falling back to the
/// last one; records every prompt and its metadata for assertions.
#[derive(Debug, Clone)]
pub struct ScriptedAiProvider {
    inner: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Default)]
struct ProviderState {
    completions: Vec<AiCompletion>,
    requests: Vec<(String, PromptMetadata)>,
    fail_with: Option<String>,
}

impl Default for ScriptedAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAiProvider {
    /// Creates a provider with no scripted completions; calls fail until
    /// one is pushed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    /// Creates a provider that always answers with the given text for the
    /// given total token cost.
    #[must_use]
    pub fn answering(text: impl Into<String>, total_tokens: u64) -> Self {
        let provider = Self::new();
        provider.push(AiCompletion {
            text: text.into(),
            usage: TokenUsage {
                prompt_tokens: 0,
                completion_tokens: total_tokens,
                total_tokens,
            },
            cached: false,
        });
        provider
    }

    /// Queues a completion.
    pub fn push(&self, completion: AiCompletion) {
        if let Ok(mut state) = self.inner.lock() {
            state.completions.push(completion);
        }
    }

    /// Makes every call fail with the given provider error.
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail_with = Some(message.into());
        }
    }

    /// Returns every prompt the provider was called with.
    #[must_use]
    pub fn requests(&self) -> Vec<(String, PromptMetadata)> {
        self.inner
            .lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AiProvider for ScriptedAiProvider {
    async fn complete(&self, prompt: &str, metadata: PromptMetadata) -> AiResult<AiCompletion> {
        let mut state = self
            .inner
            .lock()
            .map_err(|e| AiError::Provider(format!("lock poisoned: {e}")))?;
        state.requests.push((prompt.to_owned(), metadata));
        if let Some(message) = &state.fail_with {
            return Err(AiError::Provider(message.clone()));
        }
        if state.completions.len() > 1 {
            Ok(state.completions.remove(0))
        } else {
            state
                .completions
                .first()
                .cloned()
                .ok_or_else(|| AiError::Provider("no scripted completion".to_owned()))
        }
    }
}

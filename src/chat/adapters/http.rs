//! HTTP implementations of the REST, AI-provider, and ledger ports.
//!
//! All requests are tenant-scoped: history calls carry the `x-tenant-id`
//! header, ledger calls are addressed under `/tenants/{id}`, and the AI
//! provider call is bearer-token authenticated.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::chat::domain::{
    ChatMessage, ConversationId, MessageMetadata, SessionId, TenantId, TokenUsage, UserId,
};
use crate::chat::error::{AiError, AiResult, HistoryError, HistoryResult};
use crate::chat::ports::ai_provider::{AiCompletion, AiProvider, PromptMetadata};
use crate::chat::ports::history::ConversationHistory;
use crate::chat::ports::token_ledger::{TokenCheck, TokenLedger};
use crate::chat::services::PROVIDER_FALLBACK_TEXT;

/// Endpoint and credential configuration shared by the HTTP adapters.
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Base URL of the storefront API (`/chat/...`, `/tenants/...`).
    pub api_url: String,
    /// Base URL of the AI completion service.
    pub ai_url: String,
    /// Bearer token for the AI completion service.
    pub ai_token: String,
    /// The tenant all requests are scoped to.
    pub tenant_id: TenantId,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpApiConfig {
    /// Creates a configuration with a 30 second request timeout.
    #[must_use]
    pub fn new(
        api_url: impl Into<String>,
        ai_url: impl Into<String>,
        ai_token: impl Into<String>,
        tenant_id: TenantId,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            ai_url: ai_url.into(),
            ai_token: ai_token.into(),
            tenant_id,
            timeout: Duration::from_secs(30),
        }
    }

    fn client(&self) -> Result<reqwest::Client, String> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ConversationIdsResponse {
    #[serde(default)]
    conversation_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct ToggleAiResponse {
    data: ToggleAiData,
}

#[derive(Debug, Deserialize)]
struct ToggleAiData {
    #[serde(rename = "aiChatEnabled")]
    ai_chat_enabled: bool,
}

/// HTTP implementation of [`ConversationHistory`].
#[derive(Debug, Clone)]
pub struct HttpConversationHistory {
    config: HttpApiConfig,
    client: reqwest::Client,
}

impl HttpConversationHistory {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Request` when the HTTP client cannot be
    /// built.
    pub fn new(config: HttpApiConfig) -> HistoryResult<Self> {
        let client = config.client().map_err(HistoryError::Request)?;
        Ok(Self { config, client })
    }

    fn tenant_header(&self) -> String {
        self.config.tenant_id.to_string()
    }
}

#[async_trait]
impl ConversationHistory for HttpConversationHistory {
    async fn messages(&self, conversation_id: ConversationId) -> HistoryResult<Vec<ChatMessage>> {
        let url = format!(
            "{}/chat/messages?conversationId={conversation_id}",
            self.config.api_url
        );
        let response = self
            .client
            .get(&url)
            .header("x-tenant-id", self.tenant_header())
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| HistoryError::Request(e.to_string()))?;

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| HistoryError::Malformed(e.to_string()))?;
        Ok(body.messages)
    }

    async fn save_bot_message(
        &self,
        conversation_id: ConversationId,
        message: &str,
        metadata: Option<MessageMetadata>,
        session_id: Option<&SessionId>,
    ) -> HistoryResult<()> {
        let url = format!("{}/chat/bot-message", self.config.api_url);
        let body = json!({
            "conversationId": conversation_id,
            "message": message,
            "metadata": metadata,
            "sessionId": session_id,
        });
        self.client
            .post(&url)
            .header("x-tenant-id", self.tenant_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| HistoryError::Request(e.to_string()))?;
        Ok(())
    }

    async fn latest_conversation(&self, user_id: UserId) -> HistoryResult<Option<ConversationId>> {
        let url = format!(
            "{}/chat/conversations?userId={user_id}",
            self.config.api_url
        );
        let response = self
            .client
            .get(&url)
            .header("x-tenant-id", self.tenant_header())
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| HistoryError::Request(e.to_string()))?;

        let body: ConversationIdsResponse = response
            .json()
            .await
            .map_err(|e| HistoryError::Malformed(e.to_string()))?;
        Ok(body.conversation_ids.first().copied().map(ConversationId::new))
    }

    async fn ai_enabled(&self) -> HistoryResult<bool> {
        let url = format!(
            "{}/tenants/{}/ai-status",
            self.config.api_url, self.config.tenant_id
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| HistoryError::Request(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| HistoryError::Malformed(e.to_string()))
    }

    async fn toggle_ai(&self) -> HistoryResult<bool> {
        let url = format!(
            "{}/tenants/{}/toggle-ai",
            self.config.api_url, self.config.tenant_id
        );
        let response = self
            .client
            .put(&url)
            .send()
            .await
            .map_err(|e| HistoryError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| HistoryError::Request(e.to_string()))?;

        let body: ToggleAiResponse = response
            .json()
            .await
            .map_err(|e| HistoryError::Malformed(e.to_string()))?;
        Ok(body.data.ai_chat_enabled)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    response: Option<CompletionText>,
    #[serde(default)]
    usage: TokenUsage,
    #[serde(default)]
    cached: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionText {
    text: String,
}

/// HTTP implementation of [`AiProvider`] (`POST {AI_URL}/chat`).
#[derive(Debug, Clone)]
pub struct HttpAiProvider {
    config: HttpApiConfig,
    client: reqwest::Client,
}

impl HttpAiProvider {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Provider` when the HTTP client cannot be built.
    pub fn new(config: HttpApiConfig) -> AiResult<Self> {
        let client = config.client().map_err(AiError::Provider)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    async fn complete(&self, prompt: &str, metadata: PromptMetadata) -> AiResult<AiCompletion> {
        let url = format!("{}/chat", self.config.ai_url);
        let body = json!({ "prompt": prompt, "metadata": metadata });
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.ai_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Provider(e.to_string()))?
            .error_for_status()
            .map_err(|e| AiError::Provider(e.to_string()))?;

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::Provider(e.to_string()))?;

        Ok(AiCompletion {
            text: completion
                .response
                .map(|r| r.text)
                .unwrap_or_else(|| PROVIDER_FALLBACK_TEXT.to_owned()),
            usage: completion.usage,
            cached: completion.cached,
        })
    }
}

/// HTTP implementation of [`TokenLedger`].
#[derive(Debug, Clone)]
pub struct HttpTokenLedger {
    config: HttpApiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    token: u64,
}

impl HttpTokenLedger {
    /// Creates the adapter.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Ledger` when the HTTP client cannot be built.
    pub fn new(config: HttpApiConfig) -> AiResult<Self> {
        let client = config.client().map_err(AiError::Ledger)?;
        Ok(Self { config, client })
    }

    fn tenant_url(&self, suffix: &str) -> String {
        format!(
            "{}/tenants/{}/{suffix}",
            self.config.api_url, self.config.tenant_id
        )
    }
}

#[async_trait]
impl TokenLedger for HttpTokenLedger {
    async fn balance(&self) -> AiResult<u64> {
        let response = self
            .client
            .get(self.tenant_url("tokens"))
            .send()
            .await
            .map_err(|e| AiError::Ledger(e.to_string()))?
            .error_for_status()
            .map_err(|e| AiError::Ledger(e.to_string()))?;

        let body: BalanceResponse = response
            .json()
            .await
            .map_err(|e| AiError::Ledger(e.to_string()))?;
        Ok(body.token)
    }

    async fn check(&self, tokens_needed: u64) -> AiResult<TokenCheck> {
        let response = self
            .client
            .post(self.tenant_url("check-tokens"))
            .json(&json!({ "tokensNeeded": tokens_needed }))
            .send()
            .await
            .map_err(|e| AiError::Ledger(e.to_string()))?
            .error_for_status()
            .map_err(|e| AiError::Ledger(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| AiError::Ledger(e.to_string()))
    }

    async fn deduct(&self, tokens_used: u64) -> AiResult<()> {
        self.client
            .post(self.tenant_url("update-tokens"))
            .json(&json!({ "tokensUsed": tokens_used }))
            .send()
            .await
            .map_err(|e| AiError::Ledger(e.to_string()))?
            .error_for_status()
            .map_err(|e| AiError::Ledger(e.to_string()))?;
        Ok(())
    }
}

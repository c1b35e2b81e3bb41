//! AI completion provider port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::domain::{SessionId, TokenUsage};
use crate::chat::error::AiResult;

/// Request metadata forwarded to the provider alongside the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptMetadata {
    /// Whether the asking actor is a guest.
    #[serde(rename = "isGuest")]
    pub is_guest: bool,
    /// The asking actor's session id, if any.
    #[serde(rename = "sessionId")]
    pub session_id: Option<SessionId>,
    /// Whether the prompt embeds a product candidate list.
    #[serde(rename = "hasProductsContext")]
    pub has_products_context: bool,
    /// How many candidates the prompt embeds.
    #[serde(rename = "productCount")]
    pub product_count: usize,
    /// In-app link paths of the embedded candidates.
    #[serde(rename = "productLinks")]
    pub product_links: Vec<String>,
}

/// A provider completion with its billing information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiCompletion {
    /// The free-text reply.
    pub text: String,
    /// Actual token cost of the call. The ledger is settled from this,
    /// never from the pre-call estimate.
    pub usage: TokenUsage,
    /// `true` when served from the provider's cache; cached answers incur
    /// no deduction.
    pub cached: bool,
}

/// Port for the paid AI completion service (`POST {AI_URL}/chat`,
/// bearer-token authenticated).
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Requests a completion.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Provider` on transport or provider failure; the
    /// orchestrator downgrades to a fixed apology and never retries
    /// within the same user turn.
    async fn complete(&self, prompt: &str, metadata: PromptMetadata) -> AiResult<AiCompletion>;
}

//! Message metadata: an open attribute bag with typed well-known fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::{SessionId, TenantId, UserId};

/// Token accounting returned by the AI completion provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens produced by the completion.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens billed for the call.
    #[serde(default)]
    pub total_tokens: u64,
}

/// Metadata attached to a message.
///
/// Well-known fields are typed; anything else the server or a future client
/// attaches survives round-trips through the flattened extension map.
///
/// # Examples
///
/// ```
/// use shopchat::chat::domain::MessageMetadata;
///
/// let metadata = MessageMetadata::token_error();
/// assert_eq!(metadata.is_token_error, Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Whether the message was authored while the actor was a guest.
    #[serde(rename = "isGuest", skip_serializing_if = "Option::is_none")]
    pub is_guest: Option<bool>,

    /// The guest session the message belonged to, if any.
    #[serde(rename = "guestSessionId", skip_serializing_if = "Option::is_none")]
    pub guest_session_id: Option<SessionId>,

    /// The authenticated sender, if any.
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// The tenant the message was sent under.
    #[serde(rename = "tenantId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Set when an AI reply was replaced by the token-exhaustion notice,
    /// so the admin surface can see budget failures.
    #[serde(rename = "isTokenError", skip_serializing_if = "Option::is_none")]
    pub is_token_error: Option<bool>,

    /// Whether the provider served the completion from its cache (cached
    /// answers are not billed).
    #[serde(rename = "isCached", skip_serializing_if = "Option::is_none")]
    pub is_cached: Option<bool>,

    /// Total tokens actually billed, straight from the provider.
    #[serde(rename = "tokensUsed", skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,

    /// Prompt-side token cost of the completion.
    #[serde(rename = "promptTokens", skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,

    /// Completion-side token cost.
    #[serde(rename = "completionTokens", skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,

    /// Total token cost (prompt plus completion).
    #[serde(rename = "totalTokens", skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,

    /// Extension data for fields this client does not model.
    #[serde(flatten, skip_serializing_if = "HashMap::is_empty")]
    pub extensions: HashMap<String, Value>,
}

impl MessageMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Metadata for a guest-local message.
    #[must_use]
    pub fn for_guest(session_id: SessionId) -> Self {
        Self {
            is_guest: Some(true),
            guest_session_id: Some(session_id),
            ..Self::default()
        }
    }

    /// Metadata for an authenticated optimistic send.
    #[must_use]
    pub fn for_user(user_id: UserId, tenant_id: TenantId) -> Self {
        Self {
            is_guest: Some(false),
            user_id: Some(user_id),
            tenant_id: Some(tenant_id),
            ..Self::default()
        }
    }

    /// Metadata flagging a token-budget failure.
    #[must_use]
    pub fn token_error() -> Self {
        Self {
            is_token_error: Some(true),
            ..Self::default()
        }
    }

    /// Metadata carrying the provider's token accounting.
    #[must_use]
    pub fn with_usage(usage: TokenUsage, cached: bool) -> Self {
        Self {
            is_cached: Some(cached),
            tokens_used: Some(usage.total_tokens),
            prompt_tokens: Some(usage.prompt_tokens),
            completion_tokens: Some(usage.completion_tokens),
            total_tokens: Some(usage.total_tokens),
            ..Self::default()
        }
    }
}

//! Token ledger port: the tenant-scoped AI budget.
//!
//! Consulted with an estimate before every paid AI call and settled with
//! the provider's actual cost afterwards (skipped for cached answers).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::error::AiResult;

/// Outcome of a pre-call budget check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCheck {
    /// Whether the balance covers the estimate.
    #[serde(rename = "hasEnoughTokens")]
    pub has_enough_tokens: bool,
    /// The current balance.
    #[serde(rename = "currentTokens")]
    pub current_tokens: u64,
    /// The estimate that was checked.
    #[serde(rename = "tokensNeeded")]
    pub tokens_needed: u64,
}

/// Port for the tenant token ledger.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Returns the current balance. A zero balance short-circuits the AI
    /// call before any check round-trip.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Ledger` when the ledger cannot be reached.
    async fn balance(&self) -> AiResult<u64>;

    /// Checks whether the balance covers `tokens_needed`.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Ledger` when the ledger cannot be reached.
    async fn check(&self, tokens_needed: u64) -> AiResult<TokenCheck>;

    /// Deducts the actual cost of a completed call.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Ledger` when the ledger cannot be reached.
    async fn deduct(&self, tokens_used: u64) -> AiResult<()>;
}

//! Error taxonomy for the chat subsystem.
//!
//! Uses `thiserror` for typed variants that callers can inspect. End users
//! never see these directly: the session and orchestrator substitute canned
//! friendly text and record machine-readable flags in message metadata.

use thiserror::Error;

/// Errors raised by the transport connector.
///
/// Connection failures are retried with bounded backoff and surfaced only
/// as a connection-status indicator; they never block composing.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Connection attempts were exhausted.
    #[error("connect failed after {attempts} attempts")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
    },

    /// An emit was attempted while disconnected.
    #[error("not connected")]
    NotConnected,

    /// The event subscription was already taken.
    #[error("event stream already subscribed")]
    AlreadySubscribed,

    /// The peer closed the event stream.
    #[error("event stream closed")]
    StreamClosed,
}

/// Errors raised by the durable client storage port.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The backing store rejected a read or write.
    #[error("storage failure: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates a backend failure.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors raised by the conversation-history REST surface.
#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    /// The request could not be completed.
    #[error("history request failed: {0}")]
    Request(String),

    /// The response body could not be decoded.
    #[error("history response malformed: {0}")]
    Malformed(String),
}

/// Errors raised when producing an AI reply.
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// The tenant's admin shop has a zero token balance.
    #[error("admin shop has no AI tokens")]
    NoTokens,

    /// The pre-call budget check reported an insufficient balance.
    #[error("insufficient AI tokens: have {current}, need {needed}")]
    InsufficientTokens {
        /// Current balance reported by the ledger.
        current: u64,
        /// Estimated tokens the call would need.
        needed: u64,
    },

    /// The completion provider failed or returned garbage.
    #[error("AI provider error: {0}")]
    Provider(String),

    /// The token ledger could not be reached.
    #[error("token ledger error: {0}")]
    Ledger(String),
}

impl AiError {
    /// Returns `true` when the failure is a token-budget problem, which is
    /// flagged in message metadata for admin visibility.
    #[must_use]
    pub const fn is_token_error(&self) -> bool {
        matches!(self, Self::NoTokens | Self::InsufficientTokens { .. })
    }
}

/// Errors raised by the guest-to-authenticated migration protocol.
///
/// Individual message replay failures are swallowed per message; migration
/// is best-effort and never rolls back partially replayed messages.
#[derive(Debug, Clone, Error)]
pub enum MigrationError {
    /// No conversation to migrate into.
    #[error("no conversation id available for migration")]
    NoConversation,

    /// A migration is already in flight.
    #[error("migration already in flight")]
    InFlight,

    /// Reading the local buffer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Top-level error for session operations.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// Transport-layer failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Client-storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// History-surface failure.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Migration failure.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// An empty body was submitted for sending.
    #[error("cannot send an empty message")]
    EmptyMessage,
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result alias for client-storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result alias for history-surface operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Result alias for AI reply production.
pub type AiResult<T> = Result<T, AiError>;

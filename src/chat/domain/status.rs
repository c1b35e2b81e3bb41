//! Message delivery status.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Delivery state of one message entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Optimistically shown, awaiting server acknowledgement.
    Sending,
    /// Confirmed by the server (or force-resolved by the ack watchdog).
    Sent,
    /// Explicitly rejected by the server.
    ///
    /// Kept in the model even though current policy resolves nacks to
    /// [`MessageStatus::Sent`]; see the session engine for the policy.
    Failed,
    /// Guest-authored entry that only exists in client storage.
    Local,
}

impl MessageStatus {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Local => "local",
        }
    }

    /// Returns `true` while the entry awaits confirmation.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Sending)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message status: {0}")]
pub struct ParseMessageStatusError(pub String);

impl TryFrom<&str> for MessageStatus {
    type Error = ParseMessageStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sending" => Ok(Self::Sending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "local" => Ok(Self::Local),
            _ => Err(ParseMessageStatusError(value.to_owned())),
        }
    }
}

//! Message sender classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The kind of actor that authored a message.
///
/// A closed enumeration: both business logic (AI triggering, migration
/// routing) and rendering key off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    /// An authenticated storefront customer.
    User,
    /// An anonymous visitor chatting locally.
    Guest,
    /// The automated shop assistant.
    Bot,
    /// A human shop operator on the admin surface.
    Admin,
    /// The AI completion provider (distinct from [`SenderType::Bot`] for
    /// transcripts that track which engine answered).
    Ai,
}

impl SenderType {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Guest => "GUEST",
            Self::Bot => "BOT",
            Self::Admin => "ADMIN",
            Self::Ai => "AI",
        }
    }

    /// Returns `true` for customer-authored messages (the kinds that may
    /// trigger an AI reply).
    #[must_use]
    pub const fn is_customer(self) -> bool {
        matches!(self, Self::User | Self::Guest)
    }

    /// Returns `true` for machine-authored messages (the kinds migration
    /// persists via the bot side channel instead of replaying live).
    #[must_use]
    pub const fn is_assistant(self) -> bool {
        matches!(self, Self::Bot | Self::Ai)
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a sender type string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sender type: {0}")]
pub struct ParseSenderTypeError(pub String);

impl TryFrom<&str> for SenderType {
    type Error = ParseSenderTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "GUEST" => Ok(Self::Guest),
            "BOT" => Ok(Self::Bot),
            "ADMIN" => Ok(Self::Admin),
            "AI" => Ok(Self::Ai),
            _ => Err(ParseSenderTypeError(value.to_owned())),
        }
    }
}

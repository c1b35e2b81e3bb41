//! Domain identifier newtypes for conversations, tenants, users, sessions,
//! and optimistic-send correlation keys.
//!
//! Server-issued identifiers are numeric; locally generated identifiers are
//! string-shaped. The newtypes prevent accidental mixing and keep the wire
//! representation transparent.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Server-issued identifier for a conversation record.
///
/// Guests have no conversation until they authenticate; the server creates
/// one lazily on the first confirmed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(i64);

impl ConversationId {
    /// Wraps a raw server conversation id.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw server id.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the storefront tenant all chat traffic is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i64);

impl TenantId {
    /// Wraps a raw tenant id.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw tenant id.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-issued identifier of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw user id.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw user id.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session identifier for an actor.
///
/// Guests carry a locally generated `guest-` prefixed session id; the
/// server may also hand out a session id over the transport
/// (`session-initialized`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an existing session identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh guest session identifier.
    #[must_use]
    pub fn guest() -> Self {
        Self(format!("guest-{}", Uuid::new_v4()))
    }

    /// Returns the session id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-generated correlation key for one optimistic send.
///
/// Present on a message only while it awaits server confirmation; cleared
/// the moment an acknowledgement (or the watchdog) resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempId(String);

impl TempId {
    /// Wraps an existing correlation key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a correlation key for a fresh optimistic send.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("temp-{}", Uuid::new_v4()))
    }

    /// Generates a correlation key for a migration replay.
    #[must_use]
    pub fn for_migration() -> Self {
        Self(format!("migrate-{}", Uuid::new_v4()))
    }

    /// Generates a correlation key for a pending AI reply.
    ///
    /// Guest replies stay local, so their keys are marked distinctly.
    #[must_use]
    pub fn for_ai_reply(is_guest: bool) -> Self {
        if is_guest {
            Self(format!("ai-local-{}", Uuid::new_v4()))
        } else {
            Self(format!("ai-temp-{}", Uuid::new_v4()))
        }
    }

    /// Returns the correlation key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of a message once confirmed by the server.
///
/// The server issues numeric ids; locally minted entries (optimistic sends,
/// guest-local messages, canned AI replies) carry string ids, which may
/// temporarily equal the entry's [`TempId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// Server-issued numeric identifier.
    Numeric(i64),
    /// Locally generated string identifier.
    Text(String),
}

impl MessageId {
    /// Creates a message id from a temp id, for optimistic entries whose
    /// id equals their correlation key until confirmation.
    #[must_use]
    pub fn from_temp(temp_id: &TempId) -> Self {
        Self::Text(temp_id.as_str().to_owned())
    }

    /// Mints a local id for a resolved AI reply.
    #[must_use]
    pub fn local_ai(is_guest: bool) -> Self {
        if is_guest {
            Self::Text(format!("ai-local-{}", Uuid::new_v4()))
        } else {
            Self::Text(format!("ai-{}", Uuid::new_v4()))
        }
    }

    /// Returns `true` for a server-issued numeric id.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

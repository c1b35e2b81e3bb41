//! Actor identity: guest or authenticated, and the transitions between.

use serde::{Deserialize, Serialize};

use super::{ConversationId, SessionId, UserId};

/// The authenticated user as reported by the host application's auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Server user id.
    pub id: UserId,
    /// Display name, used to personalise canned AI greetings.
    pub name: Option<String>,
}

impl AuthUser {
    /// Creates an authenticated user record.
    #[must_use]
    pub fn new(id: UserId, name: Option<String>) -> Self {
        Self { id, name }
    }
}

/// Raw authentication state handed to the identity resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Nobody is signed in.
    Anonymous,
    /// A user is signed in.
    SignedIn(AuthUser),
}

/// The resolved identity of the current actor.
///
/// Guests are keyed by a locally generated session id and never touch the
/// server; authenticated users are keyed by their server user id and may
/// carry a known conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// Anonymous actor, local-only.
    Guest {
        /// The locally generated session id.
        session_id: SessionId,
    },
    /// Signed-in actor.
    Authenticated {
        /// The server user id.
        user_id: UserId,
        /// The active conversation, once known.
        conversation_id: Option<ConversationId>,
    },
}

impl Identity {
    /// Returns `true` for guest identities.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }

    /// Returns the guest session id, if this is a guest identity.
    #[must_use]
    pub const fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::Guest { session_id } => Some(session_id),
            Self::Authenticated { .. } => None,
        }
    }

    /// Returns the authenticated user id, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Guest { .. } => None,
            Self::Authenticated { user_id, .. } => Some(*user_id),
        }
    }
}

/// An identity transition, emitted exactly once per change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityChange {
    /// The identity before the transition, absent on first resolution.
    pub from: Option<Identity>,
    /// The identity after the transition.
    pub to: Identity,
}

impl IdentityChange {
    /// Returns `true` when this transition is a guest logging in — the
    /// trigger for the migration protocol.
    #[must_use]
    pub fn is_login(&self) -> bool {
        matches!(&self.from, Some(Identity::Guest { .. }))
            && matches!(&self.to, Identity::Authenticated { .. })
    }

    /// Returns `true` when this transition is a logout back to guest.
    #[must_use]
    pub fn is_logout(&self) -> bool {
        matches!(&self.from, Some(Identity::Authenticated { .. }))
            && matches!(&self.to, Identity::Guest { .. })
    }
}

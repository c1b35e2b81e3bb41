//! Identity resolution between guest and authenticated actors.
//!
//! The resolver turns raw auth state into a resolved [`Identity`] and
//! reports each transition exactly once. Guests are provisioned with a
//! durable session id on first resolution; a login retires the guest
//! session marker and a logout clears the persisted conversation marker
//! so the next session starts clean.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::chat::domain::{AuthState, Identity, IdentityChange, SessionId};
use crate::chat::error::StorageResult;
use crate::chat::ports::LocalStore;

/// Resolves auth state into chat identities, detecting transitions.
pub struct IdentityResolver<S>
where
    S: LocalStore,
{
    store: Arc<S>,
    current: Mutex<Option<Identity>>,
}

impl<S> IdentityResolver<S>
where
    S: LocalStore,
{
    /// Creates a resolver backed by the given client storage.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    /// The most recently resolved identity, if any.
    pub async fn current(&self) -> Option<Identity> {
        self.current.lock().await.clone()
    }

    /// Resolves the given auth state.
    ///
    /// Returns `Some` only when the resolved identity differs from the
    /// previous resolution, so each login and logout is reported exactly
    /// once no matter how often the host re-publishes its auth state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when client storage fails.
    pub async fn resolve(&self, auth: &AuthState) -> StorageResult<Option<IdentityChange>> {
        let mut current = self.current.lock().await;
        let resolved = match auth {
            AuthState::Anonymous => {
                let session_id = self.ensure_guest_session().await?;
                Identity::Guest { session_id }
            }
            AuthState::SignedIn(user) => {
                let conversation_id = self.store.conversation_id().await?;
                Identity::Authenticated {
                    user_id: user.id,
                    conversation_id,
                }
            }
        };

        if current.as_ref() == Some(&resolved) {
            return Ok(None);
        }
        // A conversation adopted mid-session changes the identity value but
        // not the actor; that is not a transition worth reporting.
        if let (
            Some(Identity::Authenticated { user_id: prev, .. }),
            Identity::Authenticated { user_id: next, .. },
        ) = (current.as_ref(), &resolved)
            && prev == next
        {
            *current = Some(resolved);
            return Ok(None);
        }

        let change = IdentityChange {
            from: current.clone(),
            to: resolved.clone(),
        };
        if change.is_logout() {
            // The conversation belonged to the departing user.
            self.store.clear_conversation_id().await?;
        }
        if change.is_login() {
            // The guest marker must not outlive the guest.
            self.store.clear_guest_session_id().await?;
            info!("guest signed in");
        }
        *current = Some(resolved);
        Ok(Some(change))
    }

    async fn ensure_guest_session(&self) -> StorageResult<SessionId> {
        if let Some(existing) = self.store.guest_session_id().await? {
            return Ok(existing);
        }
        let fresh = SessionId::guest();
        self.store.set_guest_session_id(&fresh).await?;
        Ok(fresh)
    }
}

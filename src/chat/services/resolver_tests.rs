//! Tests for identity resolution.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use std::sync::Arc;

use super::resolver::IdentityResolver;
use crate::chat::adapters::memory::InMemoryLocalStore;
use crate::chat::domain::{AuthState, AuthUser, ConversationId, Identity, SessionId, UserId};
use crate::chat::ports::LocalStore;

fn signed_in(id: i64) -> AuthState {
    AuthState::SignedIn(AuthUser::new(UserId::new(id), Some("Linh".to_owned())))
}

#[tokio::test]
async fn first_anonymous_resolution_provisions_guest_session() {
    let store = Arc::new(InMemoryLocalStore::new());
    let resolver = IdentityResolver::new(Arc::clone(&store));

    let change = resolver
        .resolve(&AuthState::Anonymous)
        .await
        .expect("resolve")
        .expect("first resolution is a change");

    assert!(change.from.is_none());
    let Identity::Guest { session_id } = &change.to else {
        panic!("expected a guest identity");
    };
    assert!(session_id.as_str().starts_with("guest-"));

    let persisted = store.guest_session_id().await.expect("read");
    assert_eq!(persisted.as_ref(), Some(session_id));
}

#[tokio::test]
async fn repeated_resolution_reports_nothing() {
    let store = Arc::new(InMemoryLocalStore::new());
    let resolver = IdentityResolver::new(store);

    resolver
        .resolve(&AuthState::Anonymous)
        .await
        .expect("resolve");
    let repeat = resolver
        .resolve(&AuthState::Anonymous)
        .await
        .expect("resolve");
    assert!(repeat.is_none());
}

#[tokio::test]
async fn existing_guest_session_is_reused() {
    let store = Arc::new(InMemoryLocalStore::new());
    let existing = SessionId::new("guest-existing");
    store
        .set_guest_session_id(&existing)
        .await
        .expect("seed session");
    let resolver = IdentityResolver::new(store);

    let change = resolver
        .resolve(&AuthState::Anonymous)
        .await
        .expect("resolve")
        .expect("change");
    assert_eq!(change.to.session_id(), Some(&existing));
}

#[tokio::test]
async fn guest_sign_in_is_reported_as_login() {
    let store = Arc::new(InMemoryLocalStore::new());
    let resolver = IdentityResolver::new(store);

    resolver
        .resolve(&AuthState::Anonymous)
        .await
        .expect("resolve");
    let change = resolver
        .resolve(&signed_in(12))
        .await
        .expect("resolve")
        .expect("login is a change");

    assert!(change.is_login());
    assert_eq!(change.to.user_id(), Some(UserId::new(12)));
}

#[tokio::test]
async fn sign_in_clears_the_guest_session_marker() {
    let store = Arc::new(InMemoryLocalStore::new());
    let resolver = IdentityResolver::new(Arc::clone(&store));

    resolver
        .resolve(&AuthState::Anonymous)
        .await
        .expect("resolve");
    assert!(store.guest_session_id().await.expect("read").is_some());

    resolver.resolve(&signed_in(12)).await.expect("resolve");
    assert_eq!(store.guest_session_id().await.expect("read"), None);
}

#[tokio::test]
async fn sign_out_clears_conversation_marker() {
    let store = Arc::new(InMemoryLocalStore::new());
    store
        .set_conversation_id(ConversationId::new(7))
        .await
        .expect("seed conversation");
    let resolver = IdentityResolver::new(Arc::clone(&store));

    resolver.resolve(&signed_in(12)).await.expect("resolve");
    let change = resolver
        .resolve(&AuthState::Anonymous)
        .await
        .expect("resolve")
        .expect("logout is a change");

    assert!(change.is_logout());
    assert_eq!(store.conversation_id().await.expect("read"), None);
}

#[tokio::test]
async fn conversation_adoption_is_not_a_transition() {
    let store = Arc::new(InMemoryLocalStore::new());
    let resolver = IdentityResolver::new(Arc::clone(&store));

    resolver.resolve(&signed_in(12)).await.expect("resolve");
    store
        .set_conversation_id(ConversationId::new(7))
        .await
        .expect("adopt conversation");

    let repeat = resolver.resolve(&signed_in(12)).await.expect("resolve");
    assert!(repeat.is_none());

    let current = resolver.current().await.expect("identity");
    assert_eq!(
        current,
        Identity::Authenticated {
            user_id: UserId::new(12),
            conversation_id: Some(ConversationId::new(7)),
        }
    );
}

#[tokio::test]
async fn switching_users_is_a_transition() {
    let store = Arc::new(InMemoryLocalStore::new());
    let resolver = IdentityResolver::new(store);

    resolver.resolve(&signed_in(12)).await.expect("resolve");
    let change = resolver
        .resolve(&signed_in(13))
        .await
        .expect("resolve")
        .expect("user switch is a change");
    assert_eq!(change.to.user_id(), Some(UserId::new(13)));
}

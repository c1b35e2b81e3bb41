//! Scenario tests for the chat session, driven through the in-process
//! transport harness under a paused tokio clock.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]
#![expect(
    clippy::indexing_slicing,
    reason = "Test code uses indexing after length checks"
)]

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;

use super::session::ChatSession;
use crate::chat::adapters::catalog::KeywordCatalog;
use crate::chat::adapters::channel::{
    ChannelTransport, ClientCommand, TransportHarness, channel_transport,
};
use crate::chat::adapters::memory::{
    InMemoryHistory, InMemoryLocalStore, InMemoryTokenLedger, ScriptedAiProvider,
};
use crate::chat::config::ChatConfig;
use crate::chat::domain::{
    AuthState, AuthUser, ChatMessage, ConversationId, MessageId, MessageMetadata, MessageStatus,
    Product, SenderType, SessionId, TenantId, UserId,
};
use crate::chat::ports::{LocalStore, TransportEvent};

type TestSession = ChatSession<
    ChannelTransport,
    InMemoryHistory,
    InMemoryLocalStore,
    ScriptedAiProvider,
    InMemoryTokenLedger,
    KeywordCatalog,
    DefaultClock,
>;

struct Fixture {
    session: Arc<TestSession>,
    harness: TransportHarness,
    history: InMemoryHistory,
    local: InMemoryLocalStore,
}

fn fixture(provider: ScriptedAiProvider, products: Vec<Product>) -> Fixture {
    let (transport, harness) = channel_transport();
    let history = InMemoryHistory::new();
    let local = InMemoryLocalStore::new();
    let session = ChatSession::new(
        Arc::new(transport),
        Arc::new(history.clone()),
        Arc::new(local.clone()),
        Arc::new(provider),
        Arc::new(InMemoryTokenLedger::new(1_000)),
        Arc::new(KeywordCatalog::new(products)),
        Arc::new(DefaultClock),
        ChatConfig::new(TenantId::new(1)),
    );
    Fixture {
        session,
        harness,
        history,
        local,
    }
}

fn shirt() -> Product {
    Product {
        name: "Áo thun nam".to_owned(),
        slug: "ao-thun-nam".to_owned(),
        base_price: 129_000,
        description: None,
        seo_keywords: None,
        on_promotion: false,
    }
}

fn signed_in(id: i64, name: &str) -> AuthState {
    AuthState::SignedIn(AuthUser::new(UserId::new(id), Some(name.to_owned())))
}

/// Polls a condition under the paused clock; every sleep lets the runtime
/// auto-advance pending timers, so long watchdog windows elapse instantly
/// in real time.
async fn wait_until(description: &str, condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("timed out waiting for: {description}");
}

fn snapshot(session: &Arc<TestSession>) -> Vec<ChatMessage> {
    session.messages().expect("snapshot")
}

#[tokio::test(start_paused = true)]
async fn guest_send_gets_a_local_ai_reply_and_is_cached() {
    let provider = ScriptedAiProvider::answering("Shop có Áo thun nam rất đẹp nhé!", 20);
    let f = fixture(provider, vec![shirt()]);

    f.session
        .set_auth(&AuthState::Anonymous)
        .await
        .expect("guest auth");
    f.session
        .send_message("tìm áo thun nam")
        .await
        .expect("guest send");

    wait_until("guest AI reply resolved", || {
        let messages = snapshot(&f.session);
        messages.len() == 2 && messages[1].message != "..."
    })
    .await;

    let messages = snapshot(&f.session);
    assert_eq!(messages[0].sender_type, SenderType::Guest);
    assert_eq!(messages[0].status, MessageStatus::Local);
    assert!(
        messages[0]
            .session_id
            .as_ref()
            .expect("guest session id")
            .as_str()
            .starts_with("guest-")
    );
    assert_eq!(messages[1].sender_type, SenderType::Bot);
    assert_eq!(messages[1].status, MessageStatus::Local);
    assert!(messages[1].message.contains("Áo thun nam"));

    // Both entries survive in client storage; nothing touches the server.
    let cached = f.local.local_messages().await.expect("local cache");
    assert_eq!(cached.len(), 2);
    assert!(f.history.saved_bot_messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sign_in_connects_joins_and_loads_the_latest_conversation() {
    let mut f = fixture(ScriptedAiProvider::new(), Vec::new());
    let conversation_id = ConversationId::new(42);
    f.history.put_latest(UserId::new(9), conversation_id);

    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");

    let command = f.harness.next_command().await.expect("join emit");
    assert_eq!(command, ClientCommand::Join(conversation_id));
    assert_eq!(
        f.local.conversation_id().await.expect("stored marker"),
        Some(conversation_id)
    );

    // The room is joined exactly once; the next emit is the send itself.
    f.session
        .send_message("có hàng không shop")
        .await
        .expect("send");
    let next = f.harness.next_command().await.expect("send emit");
    assert!(matches!(next, ClientCommand::Send(_)));
}

#[tokio::test(start_paused = true)]
async fn confirmed_send_resolves_and_triggers_a_persisted_ai_reply() {
    let provider = ScriptedAiProvider::answering("Bạn xem thử Áo thun nam nhé!", 25);
    let mut f = fixture(provider, vec![shirt()]);
    let conversation_id = ConversationId::new(42);
    f.history.put_latest(UserId::new(9), conversation_id);
    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");
    f.harness.next_command().await.expect("join emit");

    f.session
        .send_message("tìm áo thun nam")
        .await
        .expect("send");

    let command = f.harness.next_command().await.expect("send emit");
    let ClientCommand::Send(payload) = command else {
        panic!("expected a send emit, got {command:?}");
    };
    assert_eq!(payload.message, "tìm áo thun nam");
    assert!(payload.temp_id.as_str().starts_with("temp-"));
    assert_eq!(payload.conversation_id, Some(conversation_id));

    f.harness.emit(TransportEvent::MessageConfirmed {
        temp_id: payload.temp_id,
        message_id: MessageId::Numeric(77),
    });

    wait_until("send confirmed", || {
        snapshot(&f.session)
            .iter()
            .any(|m| m.id == MessageId::Numeric(77) && m.status == MessageStatus::Sent)
    })
    .await;

    wait_until("AI reply resolved", || {
        snapshot(&f.session)
            .iter()
            .any(|m| m.sender_type == SenderType::Bot && m.message != "...")
    })
    .await;

    let saved = f.history.saved_bot_messages();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].conversation_id, conversation_id);
    assert!(saved[0].message.contains("Áo thun nam"));
}

#[tokio::test(start_paused = true)]
async fn unacknowledged_send_is_forced_to_sent_by_the_watchdog() {
    let provider = ScriptedAiProvider::answering("Đơn của bạn đang được giao nhé!", 15);
    let mut f = fixture(provider, Vec::new());
    let conversation_id = ConversationId::new(42);
    f.history.put_latest(UserId::new(9), conversation_id);
    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");
    f.harness.next_command().await.expect("join emit");

    f.session
        .send_message("đơn của mình tới đâu rồi")
        .await
        .expect("send");
    let command = f.harness.next_command().await.expect("send emit");
    let ClientCommand::Send(payload) = command else {
        panic!("expected a send emit, got {command:?}");
    };

    wait_until("watchdog resolved the send", || {
        snapshot(&f.session).iter().any(|m| {
            m.sender_type == SenderType::User && m.status == MessageStatus::Sent
        })
    })
    .await;

    // The forced success still triggers exactly one AI reply.
    wait_until("AI reply resolved", || {
        snapshot(&f.session)
            .iter()
            .any(|m| m.sender_type == SenderType::Bot && m.message != "...")
    })
    .await;
    assert_eq!(f.history.saved_bot_messages().len(), 1);

    // The local id survives and a late acknowledgement changes nothing.
    let temp_id = payload.temp_id;
    let before = snapshot(&f.session);
    let user_entry = before
        .iter()
        .find(|m| m.sender_type == SenderType::User)
        .expect("user entry");
    assert_eq!(user_entry.id, MessageId::from_temp(&temp_id));
    assert_eq!(user_entry.temp_id, None);

    f.harness.emit(TransportEvent::MessageConfirmed {
        temp_id,
        message_id: MessageId::Numeric(77),
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(snapshot(&f.session), before);
}

#[tokio::test(start_paused = true)]
async fn server_rejection_also_resolves_the_entry_to_sent() {
    let mut f = fixture(ScriptedAiProvider::new(), Vec::new());
    let conversation_id = ConversationId::new(42);
    f.history.put_latest(UserId::new(9), conversation_id);
    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");
    f.harness.next_command().await.expect("join emit");

    f.session
        .send_message("đơn của mình tới đâu rồi")
        .await
        .expect("send");
    let command = f.harness.next_command().await.expect("send emit");
    let ClientCommand::Send(payload) = command else {
        panic!("expected a send emit, got {command:?}");
    };

    f.harness.emit(TransportEvent::MessageFailed {
        temp_id: payload.temp_id,
        error: Some("rate limited".to_owned()),
    });

    wait_until("rejection resolved the send", || {
        snapshot(&f.session)
            .iter()
            .any(|m| m.status == MessageStatus::Sent)
    })
    .await;
    // No AI reply follows a rejected send.
    assert!(f.history.saved_bot_messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn guest_sign_in_replays_the_cached_conversation() {
    let provider = ScriptedAiProvider::answering("Shop có Áo thun nam rất đẹp nhé!", 20);
    let mut f = fixture(provider, vec![shirt()]);

    f.session
        .set_auth(&AuthState::Anonymous)
        .await
        .expect("guest auth");
    f.session
        .send_message("tìm áo thun nam")
        .await
        .expect("guest send");
    wait_until("guest AI reply resolved", || {
        let messages = snapshot(&f.session);
        messages.len() == 2 && messages[1].message != "..."
    })
    .await;

    let conversation_id = ConversationId::new(42);
    f.history.put_latest(UserId::new(9), conversation_id);
    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");

    let join = f.harness.next_command().await.expect("join emit");
    assert_eq!(join, ClientCommand::Join(conversation_id));

    let replay = f.harness.next_command().await.expect("migration emit");
    let ClientCommand::Send(payload) = replay else {
        panic!("expected the replayed customer entry, got {replay:?}");
    };
    assert_eq!(payload.message, "tìm áo thun nam");
    assert!(payload.temp_id.as_str().starts_with("migrate-"));
    assert_eq!(payload.sender_id, Some(UserId::new(9)));
    assert_eq!(payload.conversation_id, Some(conversation_id));

    wait_until("assistant entry persisted", || {
        !f.history.saved_bot_messages().is_empty()
    })
    .await;
    assert!(f.history.saved_bot_messages()[0].message.contains("Áo thun nam"));

    // The replay drains the guest cache and retires the guest session.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let guest_session = f.local.guest_session_id().await.expect("guest session read");
    assert_eq!(guest_session, None);
    assert!(f.local.local_messages().await.expect("cache read").is_empty());
}

#[tokio::test(start_paused = true)]
async fn admin_typing_flag_decays_on_its_own() {
    let f = fixture(ScriptedAiProvider::new(), Vec::new());
    let conversation_id = ConversationId::new(42);
    f.history.put_latest(UserId::new(9), conversation_id);
    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");

    f.harness.emit(TransportEvent::Typing {
        user_id: UserId::new(1),
        is_typing: true,
    });
    wait_until("typing flag raised", || f.session.admin_typing()).await;

    wait_until("typing flag decayed", || !f.session.admin_typing()).await;
}

#[tokio::test(start_paused = true)]
async fn first_inbound_message_adopts_the_lazy_conversation() {
    let mut f = fixture(ScriptedAiProvider::new(), Vec::new());
    // No stored marker and no server conversation yet.
    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");

    let conversation_id = ConversationId::new(51);
    let inbound = ChatMessage {
        id: MessageId::Numeric(300),
        temp_id: None,
        conversation_id: Some(conversation_id),
        session_id: None,
        sender_id: None,
        sender_type: SenderType::Admin,
        message: "Chào bạn, mình hỗ trợ gì được ạ?".to_owned(),
        metadata: MessageMetadata::empty(),
        created_at: chrono::Utc::now(),
        status: MessageStatus::Sent,
    };
    f.harness.emit(TransportEvent::Message(inbound));

    // The marker is persisted before the room join is emitted.
    let join = f.harness.next_command().await.expect("adoption join");
    assert_eq!(join, ClientCommand::Join(conversation_id));
    assert_eq!(
        f.local.conversation_id().await.expect("marker read"),
        Some(conversation_id)
    );

    wait_until("inbound message merged", || {
        snapshot(&f.session)
            .iter()
            .any(|m| m.id == MessageId::Numeric(300))
    })
    .await;
    assert_eq!(f.session.unread_count(None).expect("unread"), 1);
}

#[tokio::test(start_paused = true)]
async fn session_initialized_persists_the_transport_session_id() {
    let f = fixture(ScriptedAiProvider::new(), Vec::new());
    let conversation_id = ConversationId::new(42);
    f.history.put_latest(UserId::new(9), conversation_id);
    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");

    f.harness.emit(TransportEvent::SessionInitialized {
        session_id: SessionId::new("srv-abc"),
    });

    wait_until("session id persisted", || {
        f.local
            .session_id()
            .is_some_and(|id| id.as_str() == "srv-abc")
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn blank_message_is_rejected_up_front() {
    let f = fixture(ScriptedAiProvider::new(), Vec::new());
    f.session
        .set_auth(&AuthState::Anonymous)
        .await
        .expect("guest auth");

    let result = f.session.send_message("   ").await;
    assert!(result.is_err());
    assert!(snapshot(&f.session).is_empty());
}

#[tokio::test(start_paused = true)]
async fn sign_out_returns_to_the_guest_cache() {
    let mut f = fixture(ScriptedAiProvider::new(), Vec::new());
    let conversation_id = ConversationId::new(42);
    f.history.put_latest(UserId::new(9), conversation_id);
    f.history.put_conversation(
        conversation_id,
        vec![ChatMessage {
            id: MessageId::Numeric(1),
            temp_id: None,
            conversation_id: Some(conversation_id),
            session_id: None,
            sender_id: Some(UserId::new(9)),
            sender_type: SenderType::User,
            message: "đơn của mình tới đâu rồi".to_owned(),
            metadata: MessageMetadata::empty(),
            created_at: chrono::Utc::now(),
            status: MessageStatus::Sent,
        }],
    );
    f.session.set_auth(&signed_in(9, "Linh")).await.expect("sign in");
    f.harness.next_command().await.expect("join emit");
    wait_until("history loaded", || !snapshot(&f.session).is_empty()).await;

    f.session
        .set_auth(&AuthState::Anonymous)
        .await
        .expect("sign out");

    // The server transcript is gone; only local-status entries remain.
    assert!(snapshot(&f.session).is_empty());
}

#[tokio::test(start_paused = true)]
async fn disabled_ai_suppresses_the_auto_reply() {
    let provider = ScriptedAiProvider::answering("không bao giờ", 20);
    let f = fixture(provider.clone(), vec![shirt()]);
    f.history.set_ai_enabled(false);

    f.session
        .set_auth(&AuthState::Anonymous)
        .await
        .expect("guest auth");
    f.session
        .send_message("tìm áo thun nam")
        .await
        .expect("guest send");

    tokio::time::sleep(Duration::from_secs(5)).await;
    let messages = snapshot(&f.session);
    assert_eq!(messages.len(), 1);
    assert!(provider.requests().is_empty());
}

//! Tests for AI reply orchestration.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]
#![expect(
    clippy::indexing_slicing,
    reason = "Test code uses indexing after length checks"
)]

use std::sync::Arc;

use super::orchestrator::{
    AiOrchestrator, APOLOGY_TEXT, NO_PRODUCT_TEXT, ReplyRequest, TOKEN_ERROR_TEXT,
};
use crate::chat::adapters::catalog::KeywordCatalog;
use crate::chat::adapters::memory::{
    InMemoryHistory, InMemoryTokenLedger, ScriptedAiProvider,
};
use crate::chat::config::ChatConfig;
use crate::chat::domain::{ConversationId, Product, SessionId, TenantId, TokenUsage};
use crate::chat::ports::ai_provider::AiCompletion;

fn product(name: &str, slug: &str, price: u64) -> Product {
    Product {
        name: name.to_owned(),
        slug: slug.to_owned(),
        base_price: price,
        description: Some("chất liệu cotton".to_owned()),
        seo_keywords: None,
        on_promotion: false,
    }
}

struct Harness {
    orchestrator: AiOrchestrator<
        ScriptedAiProvider,
        InMemoryTokenLedger,
        InMemoryHistory,
        KeywordCatalog,
    >,
    provider: ScriptedAiProvider,
    ledger: InMemoryTokenLedger,
    history: InMemoryHistory,
}

fn harness(provider: ScriptedAiProvider, balance: u64, products: Vec<Product>) -> Harness {
    let ledger = InMemoryTokenLedger::new(balance);
    let history = InMemoryHistory::new();
    let orchestrator = AiOrchestrator::new(
        Arc::new(provider.clone()),
        Arc::new(ledger.clone()),
        Arc::new(history.clone()),
        Arc::new(KeywordCatalog::new(products)),
        Arc::new(ChatConfig::new(TenantId::new(1))),
    );
    Harness {
        orchestrator,
        provider,
        ledger,
        history,
    }
}

fn authenticated_request(message: &str) -> ReplyRequest<'_> {
    ReplyRequest {
        message,
        conversation_id: Some(ConversationId::new(7)),
        session_id: None,
        is_guest: false,
        display_name: Some("Linh"),
    }
}

fn guest_request(message: &str) -> ReplyRequest<'_> {
    ReplyRequest {
        message,
        conversation_id: None,
        session_id: Some(SessionId::new("guest-abc")),
        is_guest: true,
        display_name: None,
    }
}

#[tokio::test]
async fn greeting_is_answered_and_persisted_without_tokens() {
    let h = harness(ScriptedAiProvider::new(), 100, Vec::new());

    let reply = h
        .orchestrator
        .reply(&authenticated_request("xin chào"))
        .await;

    assert!(reply.text.contains("Linh"));
    assert!(reply.persisted);
    assert!(h.provider.requests().is_empty());
    assert!(h.ledger.checks().is_empty());

    let saved = h.history.saved_bot_messages();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].message, reply.text);
    assert_eq!(saved[0].metadata, None);
}

#[tokio::test]
async fn guest_canned_reply_is_never_persisted() {
    let h = harness(ScriptedAiProvider::new(), 100, Vec::new());

    let reply = h.orchestrator.reply(&guest_request("cảm ơn shop")).await;

    assert!(!reply.persisted);
    assert!(h.history.saved_bot_messages().is_empty());
}

#[tokio::test]
async fn zero_balance_short_circuits_before_any_provider_call() {
    let h = harness(ScriptedAiProvider::answering("unused", 5), 0, Vec::new());

    let reply = h
        .orchestrator
        .reply(&authenticated_request("tư vấn giúp mình một bộ đồ đá banh"))
        .await;

    assert_eq!(reply.text, TOKEN_ERROR_TEXT);
    assert_eq!(reply.metadata.is_token_error, Some(true));
    assert!(h.provider.requests().is_empty());
    assert!(h.ledger.checks().is_empty());
    // The notice is still persisted for admin visibility.
    assert!(reply.persisted);
}

#[tokio::test]
async fn insufficient_balance_fails_the_estimate_check() {
    let h = harness(ScriptedAiProvider::answering("unused", 5), 4, Vec::new());

    let reply = h
        .orchestrator
        .reply(&authenticated_request("tư vấn giúp mình một bộ đồ đá banh"))
        .await;

    assert_eq!(reply.text, TOKEN_ERROR_TEXT);
    assert_eq!(reply.metadata.is_token_error, Some(true));
    assert_eq!(h.ledger.checks(), vec![10]);
    assert!(h.provider.requests().is_empty());
}

#[tokio::test]
async fn grounded_reply_embeds_candidates_and_settles_actual_cost() {
    let provider = ScriptedAiProvider::answering(
        "Bạn thử Áo thun nam nhé! Giá: 129.000đ [Xem sản phẩm](san-pham/ao-thun-nam)",
        37,
    );
    let h = harness(
        provider,
        100,
        vec![product("Áo thun nam", "ao-thun-nam", 129_000)],
    );

    let reply = h
        .orchestrator
        .reply(&authenticated_request("tìm áo thun nam"))
        .await;

    assert!(reply.text.contains("Áo thun nam"));
    assert_eq!(reply.metadata.tokens_used, Some(37));
    assert_eq!(reply.metadata.is_cached, Some(false));
    assert_eq!(h.ledger.deductions(), vec![37]);
    assert!(reply.persisted);

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 1);
    let (prompt, metadata) = &requests[0];
    assert!(prompt.contains("DANH SÁCH SẢN PHẨM HIỆN CÓ TRONG CỬA HÀNG"));
    assert!(prompt.contains("Áo thun nam (Giá: 129.000đ)"));
    assert!(prompt.contains("san-pham/ao-thun-nam"));
    assert!(prompt.contains("tìm áo thun nam"));
    assert!(metadata.has_products_context);
    assert_eq!(metadata.product_count, 1);
    assert_eq!(metadata.product_links, vec!["san-pham/ao-thun-nam"]);
}

#[tokio::test]
async fn cached_completion_is_not_billed() {
    let provider = ScriptedAiProvider::new();
    provider.push(AiCompletion {
        text: "Bạn thử Áo thun nam nhé!".to_owned(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 20,
            total_tokens: 30,
        },
        cached: true,
    });
    let h = harness(
        provider,
        100,
        vec![product("Áo thun nam", "ao-thun-nam", 129_000)],
    );

    let reply = h
        .orchestrator
        .reply(&authenticated_request("tìm áo thun nam"))
        .await;

    assert_eq!(reply.metadata.is_cached, Some(true));
    assert!(h.ledger.deductions().is_empty());
    assert!(reply.persisted);
}

#[tokio::test]
async fn hallucinated_recommendation_is_replaced_with_safe_list() {
    let provider = ScriptedAiProvider::answering("Mình gợi ý Quần jean ABC cực đẹp!", 20);
    let h = harness(
        provider,
        100,
        vec![
            product("Áo thun nam", "ao-thun-nam", 129_000),
            product("Áo khoác gió", "ao-khoac-gio", 349_000),
        ],
    );

    let reply = h
        .orchestrator
        .reply(&authenticated_request("tìm áo đẹp"))
        .await;

    assert!(reply.text.contains("mình gợi ý một số sản phẩm phù hợp"));
    assert!(reply.text.contains("**Áo thun nam**"));
    assert!(reply.text.contains("[Xem sản phẩm](san-pham/ao-thun-nam)"));
    assert!(reply.text.contains("129.000đ"));
    // The hallucinated product never surfaces.
    assert!(!reply.text.contains("Quần jean ABC"));
}

#[tokio::test]
async fn no_candidates_substitutes_the_fixed_answer() {
    let provider = ScriptedAiProvider::answering("Shop có bán đàn guitar nhé!", 20);
    let h = harness(provider, 100, Vec::new());

    let reply = h
        .orchestrator
        .reply(&authenticated_request("có bán đàn guitar không"))
        .await;

    assert_eq!(reply.text, NO_PRODUCT_TEXT);
}

#[tokio::test]
async fn completion_admitting_no_products_is_kept() {
    let provider =
        ScriptedAiProvider::answering("Xin lỗi, hiện chưa có sản phẩm như vậy trong cửa hàng.", 20);
    let h = harness(provider, 100, Vec::new());

    let reply = h
        .orchestrator
        .reply(&authenticated_request("có bán đàn guitar không"))
        .await;

    assert!(reply.text.contains("chưa có sản phẩm"));
    assert_ne!(reply.text, NO_PRODUCT_TEXT);
}

#[tokio::test]
async fn provider_failure_downgrades_to_apology() {
    let provider = ScriptedAiProvider::new();
    provider.fail_with("upstream 500");
    let h = harness(provider, 100, Vec::new());

    let reply = h
        .orchestrator
        .reply(&authenticated_request("tư vấn giúp mình một bộ đồ đá banh"))
        .await;

    assert_eq!(reply.text, APOLOGY_TEXT);
    assert_eq!(reply.metadata.is_token_error, None);
    assert!(h.ledger.deductions().is_empty());
    // The apology is shown but never written through the side channel.
    assert!(!reply.persisted);
    assert!(h.history.saved_bot_messages().is_empty());
}

#[tokio::test]
async fn faq_answer_skips_the_catalog_and_ledger() {
    let h = harness(ScriptedAiProvider::new(), 0, Vec::new());

    let reply = h.orchestrator.reply(&guest_request("thanh toán?")).await;

    assert!(reply.text.contains("tiền mặt"));
    assert!(h.ledger.checks().is_empty());
}

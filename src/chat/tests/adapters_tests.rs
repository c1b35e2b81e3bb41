//! Tests for the in-memory adapters: keyword catalog matching and the
//! AI enable/disable surface of the history double.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use crate::chat::adapters::catalog::KeywordCatalog;
use crate::chat::adapters::memory::InMemoryHistory;
use crate::chat::domain::Product;
use crate::chat::ports::{ConversationHistory, ProductCatalog};

fn product(name: &str, slug: &str) -> Product {
    Product {
        name: name.to_owned(),
        slug: slug.to_owned(),
        base_price: 100_000,
        description: None,
        seo_keywords: None,
        on_promotion: false,
    }
}

#[tokio::test]
async fn synonym_expands_to_the_whole_keyword_group() {
    let catalog = KeywordCatalog::new(vec![
        product("Vớ len cao cổ", "vo-len-cao-co"),
        product("Giày sneaker", "giay-sneaker"),
    ]);

    let found = catalog.find_by_keyword("tìm tất ấm mùa đông").await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].slug, "vo-len-cao-co");
}

#[tokio::test]
async fn seo_keywords_participate_in_the_match() {
    let mut denim = product("Baggy wash nhạt", "baggy-wash-nhat");
    denim.seo_keywords = Some("quần jeans nam".to_owned());
    let catalog = KeywordCatalog::new(vec![denim]);

    let found = catalog.find_by_keyword("có jeans nào không").await;

    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn candidate_list_is_capped_at_four() {
    let products = (1..=6)
        .map(|n| product(&format!("Áo thun {n}"), &format!("ao-thun-{n}")))
        .collect();
    let catalog = KeywordCatalog::new(products);

    let found = catalog.find_by_keyword("áo thun").await;

    assert_eq!(found.len(), 4);
}

#[tokio::test]
async fn unrelated_query_finds_nothing() {
    let catalog = KeywordCatalog::new(vec![product("Áo thun nam", "ao-thun-nam")]);

    assert!(catalog.find_by_keyword("đồng hồ").await.is_empty());
}

#[tokio::test]
async fn toggle_ai_flips_the_enabled_flag() {
    let history = InMemoryHistory::new();

    assert!(history.ai_enabled().await.expect("enabled"));
    assert!(!history.toggle_ai().await.expect("toggle off"));
    assert!(!history.ai_enabled().await.expect("disabled"));
    assert!(history.toggle_ai().await.expect("toggle on"));
}

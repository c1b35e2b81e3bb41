//! Product catalog lookup port.
//!
//! A pure keyword lookup the AI orchestrator grounds its replies in: the
//! prompt only ever embeds products this lookup returned, so the model has
//! nothing to invent from.

use async_trait::async_trait;

use crate::chat::domain::Product;

/// Port for keyword-based product lookup.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the candidate products for a customer utterance, capped at
    /// a small set (the storefront uses 4). An empty result means the
    /// reply must not name any product.
    async fn find_by_keyword(&self, keyword: &str) -> Vec<Product>;
}

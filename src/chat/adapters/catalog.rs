//! Keyword product catalog with Vietnamese synonym expansion.

use async_trait::async_trait;
use std::sync::Arc;

use crate::chat::domain::Product;
use crate::chat::ports::catalog::ProductCatalog;

/// Synonym groups: a main keyword with the customer phrasings that imply
/// it. A query containing any synonym searches the whole group.
const KEYWORD_GROUPS: &[(&str, &[&str])] = &[
    ("áo", &["áo", "thun", "sơ mi", "áo nam", "áo nữ"]),
    ("quần", &["quần", "jeans", "tây", "short"]),
    ("giày", &["giày", "dép", "sandal"]),
    ("phụ kiện", &["phụ kiện", "túi", "mũ", "ví", "thắt lưng"]),
    ("găng tay", &["găng tay", "gang tay", "bao tay"]),
    ("vớ", &["vớ", "tất", "vo"]),
];

/// Maximum candidates surfaced for one utterance.
const MAX_CANDIDATES: usize = 4;

/// In-memory [`ProductCatalog`] matching a product list against an
/// utterance through the synonym table.
#[derive(Debug, Clone)]
pub struct KeywordCatalog {
    products: Arc<Vec<Product>>,
}

impl KeywordCatalog {
    /// Creates a catalog over a product list.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Arc::new(products),
        }
    }

    /// Expands a lowercased query into the search keyword set.
    fn search_keywords(query: &str) -> Vec<String> {
        let mut keywords = vec![query.to_owned()];
        for (main, synonyms) in KEYWORD_GROUPS {
            if synonyms.iter().any(|syn| query.contains(syn)) {
                keywords.push((*main).to_owned());
                keywords.extend(synonyms.iter().map(|syn| (*syn).to_owned()));
            }
        }
        keywords
    }

    fn matches(product: &Product, keywords: &[String]) -> bool {
        let name = product.name.to_lowercase();
        let description = product
            .description
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        let seo = product
            .seo_keywords
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();

        keywords.iter().any(|keyword| {
            name.contains(keyword) || description.contains(keyword) || seo.contains(keyword)
        })
    }
}

#[async_trait]
impl ProductCatalog for KeywordCatalog {
    async fn find_by_keyword(&self, keyword: &str) -> Vec<Product> {
        if self.products.is_empty() {
            return Vec::new();
        }

        let query = keyword.to_lowercase().trim().to_owned();
        let keywords = Self::search_keywords(&query);

        self.products
            .iter()
            .filter(|product| Self::matches(product, &keywords))
            .take(MAX_CANDIDATES)
            .cloned()
            .collect()
    }
}

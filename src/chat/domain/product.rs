//! Product records consumed by the AI grounding lookup.

use serde::{Deserialize, Serialize};

/// One product the catalog lookup can surface to the AI.
///
/// Prices are integer Vietnamese đồng.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Display name.
    pub name: String,
    /// URL slug; recommendation links are `san-pham/{slug}`.
    pub slug: String,
    /// Base price in đồng.
    #[serde(rename = "basePrice")]
    pub base_price: u64,
    /// Optional marketing description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional SEO keyword string, matched by the keyword lookup.
    #[serde(rename = "seoKeywords", default)]
    pub seo_keywords: Option<String>,
    /// Whether the product currently has an active promotion.
    #[serde(rename = "onPromotion", default)]
    pub on_promotion: bool,
}

impl Product {
    /// Returns the in-app link path for this product.
    #[must_use]
    pub fn link_path(&self) -> String {
        format!("san-pham/{}", self.slug)
    }

    /// Returns the price formatted for display (`129.000`).
    #[must_use]
    pub fn price_display(&self) -> String {
        format_vnd(self.base_price)
    }
}

/// Formats an amount of đồng with dot thousand separators, the `vi-VN`
/// convention (`1234567` becomes `1.234.567`).
#[must_use]
pub fn format_vnd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut groups: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in digits.chars().rev() {
        current.push(ch);
        if current.len() == 3 {
            groups.push(current.chars().rev().collect());
            current.clear();
        }
    }
    if !current.is_empty() {
        groups.push(current.chars().rev().collect());
    }
    groups.reverse();
    groups.join(".")
}

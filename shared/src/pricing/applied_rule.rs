//! Applied Rule - tracks which rules were applied to a line

use crate::models::{DiscountKind, MarginType, PricingRule, RateOrDiscount};
use serde::{Deserialize, Serialize};

/// Applied rule record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedPricingRule {
    // === Rule Identity ===
    pub pricing_rule: String,
    pub title: String,

    // === Effect ===
    pub price_or_product_discount: DiscountKind,
    pub rate_or_discount: RateOrDiscount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_type: Option<MarginType>,

    // === Match Info ===
    pub item_code: String,
    /// Template the line item is a variant of, when matched by item code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_of: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apply_rule_on_other_items: Vec<String>,
}

impl AppliedPricingRule {
    /// Create from a rule applied to `item_code`
    pub fn from_rule(rule: &PricingRule, item_code: impl Into<String>) -> Self {
        Self {
            pricing_rule: rule.name.clone(),
            title: rule.title.clone(),
            price_or_product_discount: rule.price_or_product_discount,
            rate_or_discount: rule.rate_or_discount,
            margin_type: rule.margin_type,
            item_code: item_code.into(),
            variant_of: None,
            apply_rule_on_other_items: Vec::new(),
        }
    }
}

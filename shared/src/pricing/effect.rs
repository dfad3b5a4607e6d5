//! Resolution output

use super::applied_rule::AppliedPricingRule;
use crate::models::{ApplyOnKind, DiscountKind, MarginType, RateOrDiscount};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Price outcome of a single rule
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceEffect {
    pub pricing_rule: String,
    pub rate_or_discount: RateOrDiscount,
    pub rate: f64,
    pub discount_percentage: f64,
    pub discount_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_type: Option<MarginType>,
    pub margin_rate_or_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_price_list: Option<String>,
}

/// Free line to add to (or update on) a document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FreeItemSpec {
    pub item_code: String,
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub qty: f64,
    pub rate: f64,
    pub price_list_rate: f64,
    pub uom: String,
    pub stock_uom: String,
    pub conversion_factor: f64,
    /// Rule granting the free line
    pub pricing_rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_date: Option<NaiveDate>,
}

/// Outcome of one applied rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "effect", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolvedEffect {
    Price(PriceEffect),
    Product(FreeItemSpec),
}

impl ResolvedEffect {
    pub fn pricing_rule(&self) -> &str {
        match self {
            Self::Price(p) => &p.pricing_rule,
            Self::Product(f) => &f.pricing_rule,
        }
    }
}

/// Pricing fields resolved for one line
///
/// Price fields accumulate across rules in application order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPricingDetails {
    pub item_code: String,
    pub has_pricing_rule: bool,
    /// Applied rule names, in application order
    pub pricing_rules: Vec<String>,
    pub applied_rules: Vec<AppliedPricingRule>,
    pub effects: Vec<ResolvedEffect>,

    /// Set when a Rate rule overrides the list price
    pub price_list_rate: Option<f64>,
    /// Set when applied rules are removed
    pub rate: Option<f64>,
    pub discount_percentage: f64,
    pub discount_amount: f64,
    pub has_margin: bool,
    pub margin_type: Option<MarginType>,
    pub margin_rate_or_amount: f64,

    pub free_item_data: Vec<FreeItemSpec>,
    /// "Almost qualified" advisory message
    pub suggestion: Option<String>,

    pub price_or_product_discount: Option<DiscountKind>,
    pub validate_applied_rule: bool,
    pub apply_rule_on: Option<ApplyOnKind>,
    pub apply_rule_on_other_items: Vec<String>,

    pub pricing_rule_removed: bool,
    /// Free item to strip after rule removal
    pub remove_free_item: Option<String>,
}

impl ItemPricingDetails {
    pub fn new(item_code: impl Into<String>) -> Self {
        Self {
            item_code: item_code.into(),
            ..Default::default()
        }
    }
}

//! Coupon Code Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Coupon type enum
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponType {
    #[default]
    Promotional,
    GiftCard,
}

/// Coupon code entity, linked to exactly one pricing rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CouponCode {
    /// Record key, referenced by `TransactionDocument::coupon_code`
    pub name: String,
    /// Code typed by the customer
    pub coupon_code: String,
    pub coupon_type: CouponType,
    pub customer: Option<String>,
    pub pricing_rule: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_upto: Option<NaiveDate>,
    /// `None` = unlimited
    pub maximum_use: Option<u32>,
    pub used: u32,
    pub description: Option<String>,
}

impl CouponCode {
    pub fn is_exhausted(&self) -> bool {
        self.maximum_use.is_some_and(|max| self.used >= max)
    }
}

//! Pricing Rule Model

use crate::error::ErrorCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which collection a rule is scoped by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyOnKind {
    ItemCode,
    ItemGroup,
    Brand,
    Transaction,
}

impl ApplyOnKind {
    /// Scope kinds queried for a line, in order
    pub const LINE_SCOPES: [ApplyOnKind; 3] =
        [ApplyOnKind::ItemCode, ApplyOnKind::ItemGroup, ApplyOnKind::Brand];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ItemCode => "Item Code",
            Self::ItemGroup => "Item Group",
            Self::Brand => "Brand",
            Self::Transaction => "Transaction",
        }
    }
}

/// Single item code / item group / brand association, optionally UOM-qualified
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
}

impl ScopeEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            uom: None,
        }
    }

    pub fn with_uom(value: impl Into<String>, uom: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            uom: Some(uom.into()),
        }
    }
}

/// Rule scope: one variant per kind, each carrying its ordered entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "entries", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyOnScope {
    ItemCode(Vec<ScopeEntry>),
    ItemGroup(Vec<ScopeEntry>),
    Brand(Vec<ScopeEntry>),
    Transaction,
}

impl Default for ApplyOnScope {
    fn default() -> Self {
        Self::ItemCode(Vec::new())
    }
}

impl ApplyOnScope {
    pub fn kind(&self) -> ApplyOnKind {
        match self {
            Self::ItemCode(_) => ApplyOnKind::ItemCode,
            Self::ItemGroup(_) => ApplyOnKind::ItemGroup,
            Self::Brand(_) => ApplyOnKind::Brand,
            Self::Transaction => ApplyOnKind::Transaction,
        }
    }

    /// Scope entries; empty for transaction-level rules
    pub fn entries(&self) -> &[ScopeEntry] {
        match self {
            Self::ItemCode(e) | Self::ItemGroup(e) | Self::Brand(e) => e,
            Self::Transaction => &[],
        }
    }
}

/// Selling or buying side of a transaction
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionDirection {
    #[default]
    Selling,
    Buying,
}

/// Document types (and their line types) treated as selling
const SELLING_DOCTYPES: [&str; 5] = [
    "Quotation",
    "Sales Order",
    "Delivery Note",
    "Sales Invoice",
    "POS Invoice",
];

impl TransactionDirection {
    /// Direction implied by a document or line doctype
    pub fn for_doctype(doctype: &str) -> Self {
        let parent = doctype.strip_suffix(" Item").unwrap_or(doctype);
        if SELLING_DOCTYPES.contains(&parent) {
            Self::Selling
        } else {
            Self::Buying
        }
    }

    /// Verb used in advisory messages
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Selling => "sale",
            Self::Buying => "purchase",
        }
    }
}

/// Party dimension a rule is restricted to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "for", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicableFor {
    Customer(String),
    CustomerGroup(String),
    Territory(String),
    Supplier(String),
    SupplierGroup(String),
    Campaign(String),
    SalesPartner(String),
}

impl ApplicableFor {
    pub fn value(&self) -> &str {
        match self {
            Self::Customer(v)
            | Self::CustomerGroup(v)
            | Self::Territory(v)
            | Self::Supplier(v)
            | Self::SupplierGroup(v)
            | Self::Campaign(v)
            | Self::SalesPartner(v) => v,
        }
    }
}

/// Party fields matched by equality (blank on the rule = wildcard)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyField {
    Company,
    Customer,
    Supplier,
    Campaign,
    SalesPartner,
}

impl PartyField {
    pub const ALL: [PartyField; 5] = [
        PartyField::Company,
        PartyField::Customer,
        PartyField::Supplier,
        PartyField::Campaign,
        PartyField::SalesPartner,
    ];
}

/// Price or free-goods outcome
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    #[default]
    Price,
    Product,
}

/// Which price field a Price rule sets
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateOrDiscount {
    Rate,
    #[default]
    DiscountPercentage,
    DiscountAmount,
}

/// Margin type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginType {
    Percentage,
    Amount,
}

/// Document total a transaction-level discount is taken from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyDiscountOn {
    GrandTotal,
    NetTotal,
}

/// Pricing rule entity
///
/// Immutable snapshot at resolution time. Thresholds of `0.0` are unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingRule {
    pub name: String,
    pub title: String,
    pub disable: bool,
    pub apply_on: ApplyOnScope,
    pub direction: TransactionDirection,
    pub applicable_for: Option<ApplicableFor>,

    // === Scope filters ===
    pub company: Option<String>,
    pub currency: Option<String>,
    pub warehouse: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_upto: Option<NaiveDate>,
    pub for_price_list: Option<String>,

    // === Thresholds ===
    pub min_qty: f64,
    pub max_qty: f64,
    pub min_amt: f64,
    pub max_amt: f64,

    // === Mode flags ===
    pub mixed_conditions: bool,
    pub is_cumulative: bool,
    pub apply_multiple_pricing_rules: bool,
    pub apply_discount_on_rate: bool,

    // === Price effect ===
    pub price_or_product_discount: DiscountKind,
    pub rate_or_discount: RateOrDiscount,
    pub rate: f64,
    /// Percentage (17.5 = 17.5%)
    pub discount_percentage: f64,
    pub discount_amount: f64,
    pub margin_type: Option<MarginType>,
    pub margin_rate_or_amount: f64,

    // === Product effect ===
    pub same_item: bool,
    pub free_item: Option<String>,
    pub free_qty: f64,
    pub free_item_rate: f64,
    pub free_item_uom: Option<String>,
    pub is_recursive: bool,
    pub recurse_for: f64,
    pub apply_recursion_over: f64,
    pub round_free_qty: bool,

    // === Cross-item triggering ===
    pub apply_rule_on_other: Option<ApplyOnKind>,
    pub other_item_code: Option<String>,
    pub other_item_group: Option<String>,
    pub other_brand: Option<String>,

    // === Control ===
    pub priority: Option<i32>,
    pub threshold_percentage: f64,
    /// Boolean expression over document fields
    pub condition: Option<String>,
    pub coupon_code_based: bool,
    pub validate_applied_rule: bool,
    pub apply_discount_on: Option<ApplyDiscountOn>,
}

impl PricingRule {
    /// Priority used for ordering (unset = 0)
    pub fn priority_value(&self) -> i32 {
        self.priority.unwrap_or(0)
    }

    /// Value stored for an equality-matched party field
    pub fn party_value(&self, field: PartyField) -> Option<&str> {
        let value = match (field, &self.applicable_for) {
            (PartyField::Company, _) => self.company.as_deref(),
            (PartyField::Customer, Some(ApplicableFor::Customer(v)))
            | (PartyField::Supplier, Some(ApplicableFor::Supplier(v)))
            | (PartyField::Campaign, Some(ApplicableFor::Campaign(v)))
            | (PartyField::SalesPartner, Some(ApplicableFor::SalesPartner(v))) => Some(v.as_str()),
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }

    /// `other_<kind>` value for cross-item triggering
    pub fn other_value(&self, kind: ApplyOnKind) -> Option<&str> {
        let value = match kind {
            ApplyOnKind::ItemCode => self.other_item_code.as_deref(),
            ApplyOnKind::ItemGroup => self.other_item_group.as_deref(),
            ApplyOnKind::Brand => self.other_brand.as_deref(),
            ApplyOnKind::Transaction => None,
        };
        value.filter(|v| !v.is_empty())
    }

    /// Price effect value matching `rate_or_discount`
    pub fn price_value(&self) -> f64 {
        match self.rate_or_discount {
            RateOrDiscount::Rate => self.rate,
            RateOrDiscount::DiscountPercentage => self.discount_percentage,
            RateOrDiscount::DiscountAmount => self.discount_amount,
        }
    }

    /// Rule-save validation
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.name.trim().is_empty() {
            return Err(RuleValidationError::NameMissing);
        }

        let kind = self.apply_on.kind();
        if kind != ApplyOnKind::Transaction
            && self.apply_on.entries().iter().all(|e| e.value.is_empty())
        {
            return Err(RuleValidationError::ScopeEntriesMissing(kind.label()));
        }

        if let Some(applicable_for) = &self.applicable_for
            && applicable_for.value().trim().is_empty()
        {
            return Err(RuleValidationError::ApplicableForValueMissing);
        }

        for (field, min, max) in [
            ("qty", self.min_qty, self.max_qty),
            ("amount", self.min_amt, self.max_amt),
        ] {
            if min < 0.0 || max < 0.0 || (max > 0.0 && min > max) {
                return Err(RuleValidationError::InvalidThreshold(field));
            }
        }

        if let (Some(from), Some(upto)) = (self.valid_from, self.valid_upto)
            && from > upto
        {
            return Err(RuleValidationError::InvalidValidity);
        }

        if self.is_cumulative && (self.valid_from.is_none() || self.valid_upto.is_none()) {
            return Err(RuleValidationError::CumulativeValidityMissing);
        }

        if self.price_or_product_discount == DiscountKind::Product
            && self.is_recursive
            && self.recurse_for <= 0.0
        {
            return Err(RuleValidationError::RecurseForMissing);
        }

        if !(0.0..=100.0).contains(&self.discount_percentage) {
            return Err(RuleValidationError::InvalidDiscountPercentage);
        }

        if self.apply_rule_on_other == Some(ApplyOnKind::Transaction) {
            return Err(RuleValidationError::InvalidApplyRuleOnOther);
        }

        Ok(())
    }
}

/// Configuration errors raised at rule-save time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleValidationError {
    #[error("Pricing rule name is required")]
    NameMissing,

    #[error("At least one {0} entry is required")]
    ScopeEntriesMissing(&'static str),

    #[error("Applicable for value is required")]
    ApplicableForValueMissing,

    #[error("Min {0} can not be greater than max {0}")]
    InvalidThreshold(&'static str),

    #[error("Valid from date must be less than valid upto date")]
    InvalidValidity,

    #[error("Valid from and valid upto fields are mandatory for the cumulative")]
    CumulativeValidityMissing,

    #[error("Recurse for is required for recursive free item rules")]
    RecurseForMissing,

    #[error("Discount percentage must be between 0 and 100")]
    InvalidDiscountPercentage,

    #[error("Apply rule on other can not be Transaction")]
    InvalidApplyRuleOnOther,
}

impl RuleValidationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NameMissing | Self::CumulativeValidityMissing => ErrorCode::RequiredField,
            Self::ScopeEntriesMissing(_) => ErrorCode::ScopeEntriesMissing,
            Self::ApplicableForValueMissing => ErrorCode::ApplicableForValueMissing,
            Self::InvalidThreshold(_) => ErrorCode::InvalidThreshold,
            Self::InvalidValidity => ErrorCode::InvalidValidity,
            Self::RecurseForMissing => ErrorCode::RecurseForMissing,
            Self::InvalidDiscountPercentage => ErrorCode::InvalidDiscountPercentage,
            Self::InvalidApplyRuleOnOther => ErrorCode::ValidationFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_rule() -> PricingRule {
        PricingRule {
            name: "PRLE-0001".to_string(),
            title: "Ten off".to_string(),
            apply_on: ApplyOnScope::ItemCode(vec![ScopeEntry::new("_Test Item")]),
            discount_percentage: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_direction_for_doctype() {
        assert_eq!(
            TransactionDirection::for_doctype("Sales Invoice"),
            TransactionDirection::Selling
        );
        assert_eq!(
            TransactionDirection::for_doctype("Quotation Item"),
            TransactionDirection::Selling
        );
        assert_eq!(
            TransactionDirection::for_doctype("Purchase Order"),
            TransactionDirection::Buying
        );
        assert_eq!(
            TransactionDirection::for_doctype("Material Request"),
            TransactionDirection::Buying
        );
    }

    #[test]
    fn test_party_value_follows_applicable_for() {
        let mut rule = item_rule();
        rule.company = Some("_Test Company".to_string());
        rule.applicable_for = Some(ApplicableFor::Campaign("X".to_string()));

        assert_eq!(rule.party_value(PartyField::Company), Some("_Test Company"));
        assert_eq!(rule.party_value(PartyField::Campaign), Some("X"));
        assert_eq!(rule.party_value(PartyField::Customer), None);
    }

    #[test]
    fn test_validate_accepts_well_formed_rule() {
        assert_eq!(item_rule().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_missing_scope_entries() {
        let mut rule = item_rule();
        rule.apply_on = ApplyOnScope::ItemGroup(vec![]);
        let err = rule.validate().unwrap_err();
        assert_eq!(err, RuleValidationError::ScopeEntriesMissing("Item Group"));
        assert_eq!(err.code(), ErrorCode::ScopeEntriesMissing);

        rule.apply_on = ApplyOnScope::Transaction;
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut rule = item_rule();
        rule.min_qty = 10.0;
        rule.max_qty = 5.0;
        assert_eq!(
            rule.validate(),
            Err(RuleValidationError::InvalidThreshold("qty"))
        );

        rule.max_qty = 0.0;
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_cumulative_needs_window() {
        let mut rule = item_rule();
        rule.is_cumulative = true;
        assert_eq!(
            rule.validate(),
            Err(RuleValidationError::CumulativeValidityMissing)
        );
    }

    #[test]
    fn test_scope_serde_shape() {
        let scope = ApplyOnScope::Brand(vec![ScopeEntry::with_uom("Acme", "Box")]);
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json["kind"], "BRAND");
        assert_eq!(json["entries"][0]["uom"], "Box");
    }
}

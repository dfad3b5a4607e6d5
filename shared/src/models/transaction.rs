//! Transaction documents (quotations, orders, invoices) as seen by pricing

use super::pricing_rule::{ApplyDiscountOn, MarginType, TransactionDirection};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document lifecycle status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

/// Transaction line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionLine {
    pub item_code: String,
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub item_group: Option<String>,
    pub brand: Option<String>,
    pub warehouse: Option<String>,
    pub uom: Option<String>,
    pub stock_uom: Option<String>,
    pub qty: f64,
    pub stock_qty: f64,
    pub conversion_factor: f64,

    // === Pricing ===
    pub price_list_rate: f64,
    pub rate: f64,
    pub discount_percentage: f64,
    pub discount_amount: f64,
    pub margin_type: Option<MarginType>,
    pub margin_rate_or_amount: f64,
    pub rate_with_margin: f64,
    pub amount: f64,

    /// Names of pricing rules applied to this line
    pub pricing_rules: Vec<String>,
    pub is_free_item: bool,

    pub delivery_date: Option<NaiveDate>,
    pub schedule_date: Option<NaiveDate>,
}

impl TransactionLine {
    pub fn new(item_code: impl Into<String>, qty: f64, price_list_rate: f64) -> Self {
        Self {
            item_code: item_code.into(),
            qty,
            stock_qty: qty,
            conversion_factor: 1.0,
            price_list_rate,
            ..Default::default()
        }
    }

    /// Stock qty, derived from qty when not yet computed
    pub fn effective_stock_qty(&self) -> f64 {
        if self.stock_qty != 0.0 {
            self.stock_qty
        } else {
            let cf = if self.conversion_factor != 0.0 {
                self.conversion_factor
            } else {
                1.0
            };
            self.qty * cf
        }
    }

    /// Whether `rule` is among the rules applied to this line
    pub fn has_rule(&self, rule: &str) -> bool {
        self.pricing_rules.iter().any(|r| r == rule)
    }
}

/// Transaction document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionDocument {
    pub doctype: String,
    pub name: String,
    pub docstatus: DocStatus,
    pub company: Option<String>,
    pub currency: Option<String>,

    // === Parties ===
    pub customer: Option<String>,
    pub customer_group: Option<String>,
    pub territory: Option<String>,
    pub supplier: Option<String>,
    pub supplier_group: Option<String>,
    pub campaign: Option<String>,
    pub sales_partner: Option<String>,

    // === Dates ===
    pub transaction_date: Option<NaiveDate>,
    pub posting_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub schedule_date: Option<NaiveDate>,

    pub price_list: Option<String>,
    pub coupon_code: Option<String>,
    pub ignore_pricing_rule: bool,
    pub is_return: bool,

    pub items: Vec<TransactionLine>,

    // === Totals ===
    pub total_qty: f64,
    pub total: f64,
    pub apply_discount_on: Option<ApplyDiscountOn>,
    pub additional_discount_percentage: f64,
    pub discount_amount: f64,
    pub net_total: f64,
    pub grand_total: f64,

    /// Custom fields visible to rule conditions
    pub extra: Map<String, Value>,
}

impl TransactionDocument {
    pub fn new(doctype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            doctype: doctype.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn direction(&self) -> TransactionDirection {
        TransactionDirection::for_doctype(&self.doctype)
    }

    /// Date used for rule validity (transaction date, else posting date)
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.transaction_date.or(self.posting_date)
    }

    /// Flat field map used by rule conditions
    ///
    /// Custom fields in `extra` are merged at the top level and never
    /// shadow built-in fields.
    pub fn as_field_map(&self) -> Map<String, Value> {
        let mut map = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(Value::Object(extra)) = map.remove("extra") {
            for (key, value) in extra {
                map.entry(key).or_insert(value);
            }
        }
        map
    }

    pub fn free_lines(&self) -> impl Iterator<Item = &TransactionLine> {
        self.items.iter().filter(|l| l.is_free_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_map_flattens_extra() {
        let mut doc = TransactionDocument::new("Sales Order", "SO-0001");
        doc.customer = Some("_Test Customer".to_string());
        doc.extra
            .insert("channel".to_string(), Value::String("web".to_string()));
        doc.extra
            .insert("customer".to_string(), Value::String("shadow".to_string()));

        let map = doc.as_field_map();
        assert_eq!(map["customer"], "_Test Customer");
        assert_eq!(map["channel"], "web");
        assert_eq!(map["doctype"], "Sales Order");
        assert!(!map.contains_key("extra"));
    }

    #[test]
    fn test_effective_stock_qty() {
        let mut line = TransactionLine::new("_Test Item", 3.0, 100.0);
        line.stock_qty = 0.0;
        line.conversion_factor = 12.0;
        assert_eq!(line.effective_stock_qty(), 36.0);
    }
}

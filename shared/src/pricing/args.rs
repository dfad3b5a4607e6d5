//! Per-call resolution input

use crate::models::{TransactionDirection, TransactionDocument, TransactionLine};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Input for one line resolution
///
/// Built fresh per call, usually from a document line with
/// [`ResolutionArgs::from_line`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionArgs {
    /// Document type of the owning transaction ("Sales Invoice", ...)
    pub doctype: String,
    /// Owning document name
    pub parent: Option<String>,

    // === Item ===
    pub item_code: String,
    pub item_group: Option<String>,
    pub brand: Option<String>,
    /// Template item code, looked up from the catalog when unset
    pub variant_of: Option<String>,
    pub uom: Option<String>,
    pub stock_uom: Option<String>,
    pub warehouse: Option<String>,

    // === Parties ===
    pub company: Option<String>,
    pub currency: Option<String>,
    pub customer: Option<String>,
    pub customer_group: Option<String>,
    pub territory: Option<String>,
    pub supplier: Option<String>,
    pub supplier_group: Option<String>,
    pub campaign: Option<String>,
    pub sales_partner: Option<String>,

    // === Quantities and prices ===
    pub qty: f64,
    pub stock_qty: f64,
    pub conversion_factor: f64,
    pub price_list_rate: f64,
    pub rate: f64,
    pub margin_type: Option<crate::models::MarginType>,
    pub margin_rate_or_amount: f64,

    pub transaction_date: Option<NaiveDate>,
    pub price_list: Option<String>,
    pub coupon_code: Option<String>,
    /// Rules previously applied to the line
    pub pricing_rules: Vec<String>,
    pub ignore_pricing_rule: bool,
    pub is_free_item: bool,
    pub for_shopping_cart: bool,
}

impl ResolutionArgs {
    /// Arguments for `line` of `doc`
    pub fn from_line(doc: &TransactionDocument, line: &TransactionLine) -> Self {
        Self {
            doctype: doc.doctype.clone(),
            parent: Some(doc.name.clone()),
            item_code: line.item_code.clone(),
            item_group: line.item_group.clone(),
            brand: line.brand.clone(),
            variant_of: None,
            uom: line.uom.clone(),
            stock_uom: line.stock_uom.clone(),
            warehouse: line.warehouse.clone(),
            company: doc.company.clone(),
            currency: doc.currency.clone(),
            customer: doc.customer.clone(),
            customer_group: doc.customer_group.clone(),
            territory: doc.territory.clone(),
            supplier: doc.supplier.clone(),
            supplier_group: doc.supplier_group.clone(),
            campaign: doc.campaign.clone(),
            sales_partner: doc.sales_partner.clone(),
            qty: line.qty,
            stock_qty: line.effective_stock_qty(),
            conversion_factor: if line.conversion_factor != 0.0 {
                line.conversion_factor
            } else {
                1.0
            },
            price_list_rate: line.price_list_rate,
            rate: line.rate,
            margin_type: line.margin_type,
            margin_rate_or_amount: line.margin_rate_or_amount,
            transaction_date: doc.effective_date(),
            price_list: doc.price_list.clone(),
            coupon_code: doc.coupon_code.clone(),
            pricing_rules: line.pricing_rules.clone(),
            ignore_pricing_rule: doc.ignore_pricing_rule,
            is_free_item: line.is_free_item,
            for_shopping_cart: false,
        }
    }

    /// Arguments for a whole-document (transaction-level) resolution
    pub fn from_document(doc: &TransactionDocument) -> Self {
        Self {
            doctype: doc.doctype.clone(),
            parent: Some(doc.name.clone()),
            company: doc.company.clone(),
            currency: doc.currency.clone(),
            customer: doc.customer.clone(),
            customer_group: doc.customer_group.clone(),
            territory: doc.territory.clone(),
            supplier: doc.supplier.clone(),
            supplier_group: doc.supplier_group.clone(),
            campaign: doc.campaign.clone(),
            sales_partner: doc.sales_partner.clone(),
            qty: doc.total_qty,
            stock_qty: doc.total_qty,
            conversion_factor: 1.0,
            transaction_date: doc.effective_date(),
            price_list: doc.price_list.clone(),
            coupon_code: doc.coupon_code.clone(),
            ignore_pricing_rule: doc.ignore_pricing_rule,
            ..Default::default()
        }
    }

    pub fn direction(&self) -> TransactionDirection {
        TransactionDirection::for_doctype(&self.doctype)
    }
}

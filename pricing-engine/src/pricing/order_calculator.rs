//! Document-Level Calculator
//!
//! Document totals and the effect of transaction-level Price rules:
//! - Totals: total qty, total, additional discount, net and grand total
//! - Transaction discounts (percentage or amount) honouring coupon links
//!   and already-applied manual discounts
//!
//! Uses functions from item_calculator for money conversion.

use super::item_calculator::{to_decimal, to_f64};
use rust_decimal::prelude::*;
use shared::models::{PricingRule, TransactionDocument};

/// Recompute document totals from its lines
///
/// An additional discount percentage overrides `discount_amount`.
pub fn calculate_totals(doc: &mut TransactionDocument) {
    let mut total_qty = Decimal::ZERO;
    let mut total = Decimal::ZERO;
    for line in &doc.items {
        total_qty += to_decimal(line.qty);
        total += to_decimal(line.amount);
    }

    if doc.additional_discount_percentage > 0.0 {
        doc.discount_amount =
            to_f64(total * to_decimal(doc.additional_discount_percentage) / Decimal::ONE_HUNDRED);
    }

    let net_total = total - to_decimal(doc.discount_amount);
    doc.total_qty = to_f64(total_qty);
    doc.total = to_f64(total);
    doc.net_total = to_f64(net_total);
    doc.grand_total = to_f64(net_total);
}

/// Notice for a rule the document's manual discount keeps from applying
pub fn not_applied_notice(doc: &TransactionDocument) -> String {
    format!("User has not applied rule on the invoice {}", doc.name)
}

/// Apply a transaction-level Price rule to the document discount fields
///
/// `coupon_rule` is the rule linked to the document's coupon. A coupon-based
/// rule discounts only when it is that rule; otherwise its fields are
/// zeroed. Returns notices for fields kept because
/// `validate_applied_rule` found a lower manual discount.
pub fn apply_transaction_price_rule(
    doc: &mut TransactionDocument,
    rule: &PricingRule,
    coupon_rule: Option<&str>,
) -> Vec<String> {
    let mut notices = Vec::new();
    if rule.apply_discount_on.is_some() {
        doc.apply_discount_on = rule.apply_discount_on;
    }

    let linked = doc.coupon_code.is_some() && coupon_rule == Some(rule.name.as_str());
    let fields: [(f64, &mut f64); 2] = [
        (rule.discount_percentage, &mut doc.additional_discount_percentage),
        (rule.discount_amount, &mut doc.discount_amount),
    ];
    let mut not_applied = false;
    for (rule_value, doc_value) in fields {
        if rule_value == 0.0 {
            continue;
        }
        if rule.validate_applied_rule && *doc_value < rule_value {
            not_applied = true;
        } else if !rule.coupon_code_based || linked {
            *doc_value = rule_value;
        } else {
            *doc_value = 0.0;
        }
    }

    if not_applied {
        let notice = not_applied_notice(doc);
        tracing::info!(doc = %doc.name, rule = %rule.name, "{}", notice);
        notices.push(notice);
    } else {
        tracing::info!(
            doc = %doc.name,
            rule = %rule.name,
            additional_discount_percentage = doc.additional_discount_percentage,
            discount_amount = doc.discount_amount,
            "Transaction rule applied"
        );
    }
    notices
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ApplyDiscountOn, ApplyOnScope, TransactionLine};

    fn doc() -> TransactionDocument {
        let mut doc = TransactionDocument::new("Sales Invoice", "SINV-0001");
        for (item, qty, rate) in [("_Test Item", 5.0, 100.0), ("_Test Item 2", 3.0, 50.0)] {
            let mut line = TransactionLine::new(item, qty, rate);
            line.rate = rate;
            line.amount = qty * rate;
            doc.items.push(line);
        }
        doc
    }

    fn transaction_rule(pct: f64) -> PricingRule {
        PricingRule {
            name: "PRLE-0001".to_string(),
            apply_on: ApplyOnScope::Transaction,
            discount_percentage: pct,
            apply_discount_on: Some(ApplyDiscountOn::GrandTotal),
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_with_additional_discount() {
        let mut doc = doc();
        doc.additional_discount_percentage = 10.0;
        calculate_totals(&mut doc);
        assert_eq!(doc.total_qty, 8.0);
        assert_eq!(doc.total, 650.0);
        assert_eq!(doc.discount_amount, 65.0);
        assert_eq!(doc.net_total, 585.0);
        assert_eq!(doc.grand_total, 585.0);
    }

    #[test]
    fn test_totals_with_flat_discount() {
        let mut doc = doc();
        doc.discount_amount = 50.0;
        calculate_totals(&mut doc);
        assert_eq!(doc.net_total, 600.0);
    }

    #[test]
    fn test_transaction_rule_sets_discount() {
        let mut doc = doc();
        let notices = apply_transaction_price_rule(&mut doc, &transaction_rule(10.0), None);
        assert!(notices.is_empty());
        assert_eq!(doc.additional_discount_percentage, 10.0);
        assert_eq!(doc.apply_discount_on, Some(ApplyDiscountOn::GrandTotal));
    }

    #[test]
    fn test_validate_applied_rule_keeps_lower_manual_discount() {
        let mut doc = doc();
        doc.additional_discount_percentage = 5.0;
        let mut rule = transaction_rule(10.0);
        rule.validate_applied_rule = true;

        let notices = apply_transaction_price_rule(&mut doc, &rule, None);
        assert_eq!(notices, vec!["User has not applied rule on the invoice SINV-0001"]);
        assert_eq!(doc.additional_discount_percentage, 5.0);
    }

    #[test]
    fn test_coupon_based_rule_needs_linked_coupon() {
        let mut rule = transaction_rule(10.0);
        rule.coupon_code_based = true;

        let mut doc = doc();
        doc.additional_discount_percentage = 7.0;
        apply_transaction_price_rule(&mut doc, &rule, None);
        assert_eq!(doc.additional_discount_percentage, 0.0);

        doc.coupon_code = Some("SAVE10".to_string());
        doc.additional_discount_percentage = 7.0;
        apply_transaction_price_rule(&mut doc, &rule, Some("PRLE-0099"));
        assert_eq!(doc.additional_discount_percentage, 0.0);

        apply_transaction_price_rule(&mut doc, &rule, Some("PRLE-0001"));
        assert_eq!(doc.additional_discount_percentage, 10.0);
    }

    #[test]
    fn test_coupon_for_other_rule_zeroes_discount_amount() {
        let rule = PricingRule {
            coupon_code_based: true,
            discount_amount: 30.0,
            ..transaction_rule(0.0)
        };

        let mut doc = doc();
        doc.coupon_code = Some("OTHER".to_string());
        doc.discount_amount = 30.0;
        let notices = apply_transaction_price_rule(&mut doc, &rule, Some("PRLE-0002"));
        assert!(notices.is_empty());
        assert_eq!(doc.discount_amount, 0.0);

        calculate_totals(&mut doc);
        assert_eq!(doc.net_total, 650.0);
    }
}

//! Free-Good Generator
//!
//! Free line specs for Product rules, and merging them into a document.

use super::context::ResolutionContext;
use super::error::{PricingError, PricingResult};
use super::item_calculator::{to_decimal, to_f64};
use rust_decimal::prelude::*;
use shared::models::{ApplyOnKind, PricingRule, TransactionDocument, TransactionLine};
use shared::pricing::FreeItemSpec;
use std::collections::HashSet;

/// Free quantity for a rule and the triggering quantity
///
/// Recursive rules grant `free_qty` per `recurse_for` units above
/// `apply_recursion_over`, rounded half to even when `round_free_qty` is set.
pub fn free_qty(rule: &PricingRule, trigger_qty: f64) -> f64 {
    let base = if rule.free_qty != 0.0 { rule.free_qty } else { 1.0 };
    if !rule.is_recursive || rule.recurse_for <= 0.0 {
        return base;
    }

    let transaction_qty = to_decimal(trigger_qty) - to_decimal(rule.apply_recursion_over);
    if transaction_qty <= Decimal::ZERO {
        return base;
    }
    let qty = transaction_qty * to_decimal(base) / to_decimal(rule.recurse_for);
    let qty = if rule.round_free_qty {
        qty.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
    } else {
        qty
    };
    qty.to_f64().unwrap_or(base)
}

/// Free line spec granted by a Product rule
///
/// `trigger_item` is the line item (absent for transaction rules);
/// `trigger_qty` is the line qty or the document total qty.
pub fn product_discount(
    ctx: &ResolutionContext<'_>,
    rule: &PricingRule,
    trigger_item: Option<&str>,
    trigger_qty: f64,
    doctype: &str,
    doc: Option<&TransactionDocument>,
) -> PricingResult<FreeItemSpec> {
    let same_item = rule.same_item && rule.apply_on.kind() != ApplyOnKind::Transaction;
    let free_item = if same_item {
        trigger_item
    } else {
        rule.free_item.as_deref()
    };
    let Some(free_item) = free_item.filter(|i| !i.is_empty()) else {
        return Err(PricingError::FreeItemNotSet {
            rule: rule.name.clone(),
        });
    };

    let mut spec = FreeItemSpec {
        item_code: free_item.to_string(),
        qty: free_qty(rule, trigger_qty),
        rate: rule.free_item_rate,
        price_list_rate: rule.free_item_rate,
        pricing_rule: rule.name.clone(),
        conversion_factor: 1.0,
        ..Default::default()
    };

    match ctx.catalog.item_meta(free_item) {
        Some(item) => {
            spec.item_name = Some(item.item_name);
            spec.description = item.description;
            spec.stock_uom = item.stock_uom;
        }
        None => {
            tracing::warn!(item_code = free_item, rule = %rule.name, "Free item not found in catalog");
        }
    }
    spec.uom = rule
        .free_item_uom
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| spec.stock_uom.clone());
    if !spec.uom.is_empty() {
        spec.conversion_factor = ctx.catalog.conversion_factor(free_item, &spec.uom);
    }

    let parent = doctype.strip_suffix(" Item").unwrap_or(doctype);
    let today = || chrono::Local::now().date_naive();
    match parent {
        "Purchase Order" => {
            spec.schedule_date = Some(doc.and_then(|d| d.schedule_date).unwrap_or_else(today));
        }
        "Sales Order" => {
            spec.delivery_date = Some(doc.and_then(|d| d.delivery_date).unwrap_or_else(today));
        }
        _ => {}
    }

    Ok(spec)
}

/// (item code, granting rule) key of a free line
fn free_key(line: &TransactionLine) -> (String, String) {
    (
        line.item_code.clone(),
        line.pricing_rules.first().cloned().unwrap_or_default(),
    )
}

fn free_line(spec: &FreeItemSpec) -> TransactionLine {
    let mut line = TransactionLine::new(spec.item_code.clone(), spec.qty, spec.price_list_rate);
    line.item_name = spec.item_name.clone();
    line.description = spec.description.clone();
    line.is_free_item = true;
    line.pricing_rules = vec![spec.pricing_rule.clone()];
    update_free_line(&mut line, spec);
    line
}

fn update_free_line(line: &mut TransactionLine, spec: &FreeItemSpec) {
    line.qty = spec.qty;
    line.rate = spec.rate;
    line.price_list_rate = spec.price_list_rate;
    line.uom = Some(spec.uom.clone()).filter(|u| !u.is_empty());
    line.stock_uom = Some(spec.stock_uom.clone()).filter(|u| !u.is_empty());
    line.conversion_factor = spec.conversion_factor;
    line.stock_qty = spec.qty * spec.conversion_factor;
    line.amount = to_f64(to_decimal(spec.rate) * to_decimal(spec.qty));
    line.delivery_date = spec.delivery_date.or(line.delivery_date);
    line.schedule_date = spec.schedule_date.or(line.schedule_date);
}

/// Merge free line specs into the document
///
/// Free lines are keyed by (item code, granting rule). Matching lines are
/// updated in place, new specs appended, and free lines granted by a rule in
/// `owned_rules` without a matching spec are removed.
pub fn merge_free_items(doc: &mut TransactionDocument, specs: &[FreeItemSpec], owned_rules: &HashSet<String>) {
    let before = doc.items.len();
    doc.items.retain(|line| {
        if !line.is_free_item {
            return true;
        }
        let (item_code, rule) = free_key(line);
        !owned_rules.contains(&rule)
            || specs
                .iter()
                .any(|s| s.item_code == item_code && s.pricing_rule == rule)
    });
    let removed = before - doc.items.len();

    let mut appended = 0;
    for spec in specs {
        let existing = doc
            .items
            .iter_mut()
            .find(|l| l.is_free_item && free_key(l) == (spec.item_code.clone(), spec.pricing_rule.clone()));
        match existing {
            Some(line) => update_free_line(line, spec),
            None => {
                doc.items.push(free_line(spec));
                appended += 1;
            }
        }
    }

    if removed + appended > 0 {
        tracing::info!(doc = %doc.name, appended, removed, "Free lines merged");
    }
}

/// Remove every free line from the document
pub fn remove_free_items(doc: &mut TransactionDocument) {
    doc.items.retain(|l| !l.is_free_item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ApplyOnScope, DiscountKind, ScopeEntry};

    fn recursive_rule() -> PricingRule {
        PricingRule {
            name: "PRLE-0001".to_string(),
            apply_on: ApplyOnScope::ItemCode(vec![ScopeEntry::new("_Test Item")]),
            price_or_product_discount: DiscountKind::Product,
            same_item: true,
            free_qty: 1.0,
            is_recursive: true,
            recurse_for: 2.0,
            round_free_qty: true,
            ..Default::default()
        }
    }

    fn spec(item: &str, rule: &str, qty: f64) -> FreeItemSpec {
        FreeItemSpec {
            item_code: item.to_string(),
            qty,
            pricing_rule: rule.to_string(),
            conversion_factor: 1.0,
            uom: "Nos".to_string(),
            stock_uom: "Nos".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_recursive_free_qty_rounds_half_even() {
        let rule = recursive_rule();
        assert_eq!(free_qty(&rule, 5.0), 2.0);
        assert_eq!(free_qty(&rule, 7.0), 4.0);

        let mut unrounded = rule.clone();
        unrounded.round_free_qty = false;
        assert_eq!(free_qty(&unrounded, 5.0), 2.5);

        let mut over = rule;
        over.apply_recursion_over = 10.0;
        assert_eq!(free_qty(&over, 5.0), 1.0);
    }

    #[test]
    fn test_merge_updates_appends_and_removes() {
        let mut doc = TransactionDocument::new("Sales Order", "SO-0001");
        doc.items.push(TransactionLine::new("_Test Item", 5.0, 100.0));
        doc.items.push(free_line(&spec("_Test Item", "PRLE-0001", 1.0)));
        doc.items.push(free_line(&spec("_Test Gift", "PRLE-0002", 1.0)));
        doc.items.push(free_line(&spec("_Test Bonus", "PRLE-0009", 1.0)));

        let owned: HashSet<String> = ["PRLE-0001", "PRLE-0002", "PRLE-0003"]
            .into_iter()
            .map(String::from)
            .collect();
        merge_free_items(
            &mut doc,
            &[spec("_Test Item", "PRLE-0001", 2.0), spec("_Test Pen", "PRLE-0003", 3.0)],
            &owned,
        );

        let free: Vec<_> = doc.free_lines().map(|l| (l.item_code.as_str(), l.qty)).collect();
        assert_eq!(free, vec![("_Test Item", 2.0), ("_Test Bonus", 1.0), ("_Test Pen", 3.0)]);
        assert_eq!(doc.items.len(), 4);
    }

    #[test]
    fn test_remove_free_items() {
        let mut doc = TransactionDocument::new("Sales Order", "SO-0001");
        doc.items.push(TransactionLine::new("_Test Item", 5.0, 100.0));
        doc.items.push(free_line(&spec("_Test Item", "PRLE-0001", 1.0)));
        remove_free_items(&mut doc);
        assert_eq!(doc.items.len(), 1);
    }
}

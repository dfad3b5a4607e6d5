//! Rule Selector (Conflict Resolver)
//!
//! Narrows filtered candidates to the rule (or stacked rules) that apply:
//! qty/amount thresholds, cross-item triggering, currency, priority and
//! price-list disambiguation.

use super::aggregator::{QtyAmountBasis, rule_basis, scope_items};
use super::condition::filter_by_condition;
use super::context::{ResolutionContext, args_value};
use super::error::{PricingError, PricingResult};
use super::matcher::RuleCandidate;
use super::suggestion::suggestion_message;
use shared::models::{ApplyOnKind, RateOrDiscount, TransactionDocument};
use shared::pricing::ResolutionArgs;
use std::collections::BTreeMap;

/// Outcome of resolving one candidate set
#[derive(Debug, Clone)]
pub enum RuleResolution {
    Applied(RuleCandidate),
    /// Nothing qualified but a rule was narrowly missed
    Suggestion { item_code: String, message: String },
}

impl RuleResolution {
    pub fn candidate(&self) -> Option<&RuleCandidate> {
        match self {
            Self::Applied(c) => Some(c),
            Self::Suggestion { .. } => None,
        }
    }
}

// ==================== Qty/Amount Filter ====================

/// Transaction UOM a threshold is measured in
#[derive(Debug, Clone, Copy)]
pub struct UomContext<'a> {
    pub item_code: &'a str,
    pub uom: Option<&'a str>,
    pub price_list: Option<&'a str>,
}

fn within(value: f64, min: f64, max: f64, factor: f64) -> bool {
    value >= min * factor && (max == 0.0 || value <= max * factor)
}

/// Keep candidates whose thresholds hold for `basis`
///
/// Thresholds of a UOM-qualified scope entry are scaled by that UOM's
/// conversion factor. The amount factor resets to 1 when the transaction
/// is in the rule's UOM or a price exists for the transaction UOM.
pub fn filter_by_qty_amount(
    ctx: &ResolutionContext<'_>,
    candidates: Vec<RuleCandidate>,
    basis: QtyAmountBasis,
    uom_ctx: Option<UomContext<'_>>,
) -> Vec<RuleCandidate> {
    candidates
        .into_iter()
        .filter(|c| {
            let rule = &c.rule;
            let mut factor = 1.0;
            if let Some(rule_uom) = c.matched_uom() {
                if c.kind() == ApplyOnKind::ItemCode
                    && let Some(entry) = &c.matched_entry
                {
                    factor = ctx.catalog.conversion_factor(&entry.value, rule_uom);
                }
            }
            if !within(basis.stock_qty, rule.min_qty, rule.max_qty, factor) {
                return false;
            }

            if let (Some(rule_uom), Some(uc)) = (c.matched_uom(), uom_ctx) {
                let dedicated_price = uc
                    .uom
                    .is_some_and(|u| ctx.catalog.has_item_price(uc.item_code, u, uc.price_list));
                if uc.uom == Some(rule_uom) || dedicated_price {
                    factor = 1.0;
                }
            }
            within(basis.amount, rule.min_amt, rule.max_amt, factor)
        })
        .collect()
}

// ==================== Cross-item ====================

/// First document line in the rule's own scope that meets the thresholds
///
/// The winning rule is annotated with the item it applies on.
fn filter_for_other_item(
    ctx: &ResolutionContext<'_>,
    candidates: Vec<RuleCandidate>,
    doc: &TransactionDocument,
) -> Vec<RuleCandidate> {
    let Some(first) = candidates.first() else {
        return candidates;
    };
    let rule = first.rule.clone();
    let kind = rule.apply_on.kind();
    let items = scope_items(ctx, &rule);
    let other_items: Vec<String> = rule
        .apply_rule_on_other
        .and_then(|other| rule.other_value(other))
        .map(str::to_string)
        .into_iter()
        .collect();

    for row in &doc.items {
        if row.qty == 0.0 || !ctx.line_value(row, kind).is_some_and(|v| items.contains(&v)) {
            continue;
        }
        let cf = if row.conversion_factor != 0.0 {
            row.conversion_factor
        } else {
            1.0
        };
        let stock_qty = row.qty * cf;
        let rate = if row.price_list_rate != 0.0 {
            row.price_list_rate
        } else {
            row.rate
        };
        let basis = QtyAmountBasis {
            stock_qty,
            amount: stock_qty * rate,
        };
        let uom_ctx = UomContext {
            item_code: &row.item_code,
            uom: row.uom.as_deref(),
            price_list: doc.price_list.as_deref(),
        };

        let mut matched = filter_by_qty_amount(ctx, candidates.clone(), basis, Some(uom_ctx));
        if let Some(winner) = matched.first_mut() {
            winner.apply_rule_on_other_items = other_items;
            return matched;
        }
    }
    Vec::new()
}

// ==================== Single Rule ====================

/// Resolve one candidate set to a single rule, a suggestion or nothing
///
/// Fails with `MultiplePricingRuleConflict` when more than one rule
/// survives every narrowing step (except in shopping-cart contexts, which
/// take the first).
pub fn filter_pricing_rules(
    ctx: &ResolutionContext<'_>,
    candidates: Vec<RuleCandidate>,
    args: &ResolutionArgs,
    doc: Option<&TransactionDocument>,
) -> PricingResult<Option<RuleResolution>> {
    let Some(first) = candidates.first() else {
        return Ok(None);
    };
    let first_rule = first.rule.clone();
    let original = candidates.clone();
    let mut candidates = candidates;

    if let Some(other) = first_rule.apply_rule_on_other
        && first_rule.other_value(other) != args_value(args, other)
    {
        return Ok(None);
    }

    let (basis, mixed_items) = rule_basis(ctx, &first_rule, args, doc)?;
    if let Some(items) = mixed_items {
        for c in candidates.iter_mut() {
            c.apply_rule_on_other_items = items.clone();
        }
    }

    candidates = match doc {
        Some(doc) if first_rule.apply_rule_on_other.is_some() && !first_rule.mixed_conditions => {
            filter_for_other_item(ctx, candidates, doc)
        }
        _ => {
            let uom_ctx = UomContext {
                item_code: &args.item_code,
                uom: args.uom.as_deref(),
                price_list: args.price_list.as_deref(),
            };
            filter_by_qty_amount(ctx, candidates, basis, Some(uom_ctx))
        }
    };

    if candidates.is_empty() {
        for c in &original {
            if let Some(message) = suggestion_message(
                &c.rule,
                basis.stock_qty,
                basis.amount,
                &args.item_code,
                args.direction(),
            ) {
                return Ok(Some(RuleResolution::Suggestion {
                    item_code: args.item_code.clone(),
                    message,
                }));
            }
        }
        return Ok(None);
    }

    for c in candidates.iter_mut() {
        c.variant_of = match (c.kind(), &args.variant_of) {
            (ApplyOnKind::ItemCode, Some(template)) => Some(template.clone()),
            _ => None,
        };
    }

    if candidates.len() > 1 {
        let same_currency: Vec<_> = candidates
            .iter()
            .filter(|c| c.rule.currency == args.currency)
            .cloned()
            .collect();
        if !same_currency.is_empty() {
            candidates = same_currency;
        }
    }

    let max_priority = candidates
        .iter()
        .map(|c| c.rule.priority_value())
        .max()
        .unwrap_or_default();
    if max_priority != 0 {
        candidates.retain(|c| c.rule.priority_value() == max_priority);
    }

    if candidates.len() > 1
        && candidates
            .iter()
            .all(|c| c.rule.rate_or_discount == RateOrDiscount::DiscountPercentage)
    {
        let same_price_list: Vec<_> = candidates
            .iter()
            .filter(|c| c.rule.for_price_list == args.price_list)
            .cloned()
            .collect();
        if !same_price_list.is_empty() {
            candidates = same_price_list;
        }
    }

    if candidates.len() > 1 && !args.for_shopping_cart {
        let rules: Vec<String> = candidates.iter().map(|c| c.name().to_string()).collect();
        tracing::debug!(item_code = %args.item_code, ?rules, "Pricing rule conflict");
        return Err(PricingError::MultiplePricingRuleConflict { rules });
    }

    Ok(candidates.into_iter().next().map(RuleResolution::Applied))
}

// ==================== Resolution ====================

/// Resolve filtered candidates for a line
///
/// Stacking rules are resolved one by one and returned lowest priority
/// first; otherwise at most one resolution is returned.
pub fn resolve(
    ctx: &ResolutionContext<'_>,
    candidates: Vec<RuleCandidate>,
    args: &ResolutionArgs,
    doc: Option<&TransactionDocument>,
) -> PricingResult<Vec<RuleResolution>> {
    let candidates = filter_by_condition(candidates, doc);
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    if !candidates.iter().any(|c| c.rule.apply_multiple_pricing_rules) {
        return Ok(filter_pricing_rules(ctx, candidates, args, doc)?
            .into_iter()
            .collect());
    }

    let mut buckets: BTreeMap<i32, Vec<RuleResolution>> = BTreeMap::new();
    for candidate in candidates {
        let Some(resolution) = filter_pricing_rules(ctx, vec![candidate], args, doc)? else {
            continue;
        };
        let Some(applied) = resolution.candidate() else {
            continue;
        };
        if !applied.rule.apply_multiple_pricing_rules {
            continue;
        }
        let priority = match applied.rule.priority_value() {
            0 => ctx.config.default_priority,
            p => p,
        };
        buckets.entry(priority).or_default().push(resolution);
    }
    Ok(buckets.into_values().flatten().collect())
}

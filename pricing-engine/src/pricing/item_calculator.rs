//! Item Price Calculator
//!
//! Line-level price arithmetic:
//! - Price effects of resolved rules (rate override, stacked discounts, margin)
//! - Line values: rate from price list, discount and margin; amount
//!
//! Uses rust_decimal for precision calculations.

use super::matcher::RuleCandidate;
use rust_decimal::prelude::*;
use shared::models::{MarginType, PricingRule, RateOrDiscount, TransactionLine};
use shared::pricing::{ItemPricingDetails, PriceEffect, ResolutionArgs};
use std::sync::Arc;

/// Rounding strategy for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// ==================== Conversion Helpers ====================

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// `value × (1 − pct/100)`
fn discounted(value: Decimal, pct: Decimal) -> Decimal {
    value * (Decimal::ONE - pct / HUNDRED)
}

// ==================== Price Effects ====================

/// Whether a rule's margin is taken for the transaction currency
pub fn margin_applies(rule: &PricingRule, currency: Option<&str>) -> bool {
    match rule.margin_type {
        Some(MarginType::Percentage) => true,
        Some(MarginType::Amount) => currency_matches(rule, currency),
        None => false,
    }
}

/// Unset rule currency matches any transaction currency
pub fn currency_matches(rule: &PricingRule, currency: Option<&str>) -> bool {
    rule.currency.is_none() || rule.currency.as_deref() == currency
}

/// Apply a Price rule's effect onto the accumulated line details
///
/// Discounts accumulate across stacked rules. A Discount Percentage rule
/// with `apply_discount_on_rate` compounds on the discount already
/// accumulated (20% then 10% on rate = 28%).
pub fn apply_price_discount_rule(
    candidate: &RuleCandidate,
    details: &mut ItemPricingDetails,
    args: &ResolutionArgs,
) -> PriceEffect {
    let rule = &candidate.rule;

    if margin_applies(rule, args.currency.as_deref()) {
        details.margin_type = rule.margin_type;
        details.has_margin = true;
        details.margin_rate_or_amount = if rule.apply_multiple_pricing_rules {
            to_f64(to_decimal(details.margin_rate_or_amount) + to_decimal(rule.margin_rate_or_amount))
        } else {
            rule.margin_rate_or_amount
        };
    }

    match rule.rate_or_discount {
        RateOrDiscount::Rate => {
            if currency_matches(rule, args.currency.as_deref()) && rule.rate != 0.0 {
                let factor = if candidate.matched_uom() != args.uom.as_deref() {
                    to_decimal(args.conversion_factor)
                } else {
                    Decimal::ONE
                };
                details.price_list_rate = Some(to_f64(to_decimal(rule.rate) * factor));
            }
            details.discount_percentage = 0.0;
        }
        RateOrDiscount::DiscountPercentage => {
            let current = to_decimal(details.discount_percentage);
            let value = to_decimal(rule.discount_percentage);
            let next = if rule.apply_discount_on_rate && current > Decimal::ZERO {
                current + (HUNDRED - current) * value / HUNDRED
            } else {
                current + value
            };
            details.discount_percentage = to_f64(next);
        }
        RateOrDiscount::DiscountAmount => {
            details.discount_amount =
                to_f64(to_decimal(details.discount_amount) + to_decimal(rule.discount_amount));
        }
    }

    tracing::debug!(
        rule = %rule.name,
        item_code = %args.item_code,
        discount_percentage = details.discount_percentage,
        discount_amount = details.discount_amount,
        "Price rule applied"
    );

    PriceEffect {
        pricing_rule: rule.name.clone(),
        rate_or_discount: rule.rate_or_discount,
        rate: rule.rate,
        discount_percentage: rule.discount_percentage,
        discount_amount: rule.discount_amount,
        margin_type: rule.margin_type,
        margin_rate_or_amount: rule.margin_rate_or_amount,
        for_price_list: rule.for_price_list.clone(),
    }
}

// ==================== Line Values ====================

/// Margin for a line; returns the rate with margin (0 = no margin)
///
/// With applied rules, the margin is re-derived from those rules. Without
/// rules, a manual rate above the list price is recorded as an Amount
/// margin.
pub fn calculate_margin(
    line: &mut TransactionLine,
    applied: &[Arc<PricingRule>],
    currency: Option<&str>,
    ignore_pricing_rule: bool,
) -> f64 {
    if line.price_list_rate == 0.0 {
        return 0.0;
    }

    if !line.pricing_rules.is_empty() && !ignore_pricing_rule {
        let mut has_margin = false;
        for rule in applied {
            if rule.margin_rate_or_amount != 0.0 && margin_applies(rule, currency) {
                line.margin_type = rule.margin_type;
                line.margin_rate_or_amount = rule.margin_rate_or_amount;
                has_margin = true;
            }
        }
        if !has_margin {
            line.margin_type = None;
            line.margin_rate_or_amount = 0.0;
        }
    }

    if line.pricing_rules.is_empty() && line.rate > line.price_list_rate {
        line.margin_type = Some(MarginType::Amount);
        line.margin_rate_or_amount = to_f64(to_decimal(line.rate) - to_decimal(line.price_list_rate));
        line.rate_with_margin = line.rate;
        return 0.0;
    }

    match line.margin_type {
        Some(margin_type) if line.margin_rate_or_amount != 0.0 => {
            let plr = to_decimal(line.price_list_rate);
            let margin = to_decimal(line.margin_rate_or_amount);
            let value = match margin_type {
                MarginType::Amount => margin,
                MarginType::Percentage => plr * margin / HUNDRED,
            };
            to_f64(plr + value)
        }
        _ => 0.0,
    }
}

/// Recompute rate, discount amount, margin and amount of a line
///
/// `applied` holds the rules named by `line.pricing_rules`.
pub fn calculate_line_values(
    line: &mut TransactionLine,
    applied: &[Arc<PricingRule>],
    currency: Option<&str>,
    ignore_pricing_rule: bool,
) {
    let plr = to_decimal(line.price_list_rate);
    let pct = to_decimal(line.discount_percentage);
    let has_rules = !line.pricing_rules.is_empty();

    if line.discount_percentage == 100.0 {
        line.rate = 0.0;
    } else if line.price_list_rate != 0.0 {
        if line.rate == 0.0 || (has_rules && line.discount_percentage > 0.0) {
            line.rate = to_f64(discounted(plr, pct));
            line.discount_amount = to_f64(plr * pct / HUNDRED);
        } else if line.discount_amount != 0.0 && has_rules {
            line.rate = to_f64(plr - to_decimal(line.discount_amount));
        }
    }

    let rate_with_margin = calculate_margin(line, applied, currency, ignore_pricing_rule);
    if rate_with_margin > 0.0 {
        line.rate_with_margin = rate_with_margin;
        let rwm = to_decimal(rate_with_margin);
        line.rate = to_f64(discounted(rwm, pct));
        if line.discount_amount != 0.0 && line.discount_percentage == 0.0 {
            line.rate = to_f64(rwm - to_decimal(line.discount_amount));
        } else {
            line.discount_amount = to_f64(rwm - to_decimal(line.rate));
        }
    } else if line.price_list_rate > 0.0 {
        line.discount_amount = to_f64(plr - to_decimal(line.rate));
    }

    line.stock_qty = line.effective_stock_qty();
    line.amount = to_f64(to_decimal(line.rate) * to_decimal(line.qty));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ApplyOnScope, ScopeEntry};

    fn candidate(rule: PricingRule) -> RuleCandidate {
        RuleCandidate::new(Arc::new(rule), Some(ScopeEntry::new("_Test Item")))
    }

    fn pct_rule(name: &str, pct: f64, on_rate: bool) -> PricingRule {
        PricingRule {
            name: name.to_string(),
            apply_on: ApplyOnScope::ItemCode(vec![ScopeEntry::new("_Test Item")]),
            discount_percentage: pct,
            apply_discount_on_rate: on_rate,
            apply_multiple_pricing_rules: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_to_f64_rounds_half_away_from_zero() {
        assert_eq!(to_f64(Decimal::new(12345, 3)), 12.35);
        assert_eq!(to_f64(Decimal::new(-12345, 3)), -12.35);
    }

    #[test]
    fn test_discount_on_rate_compounds() {
        let args = ResolutionArgs::default();
        let mut details = ItemPricingDetails::new("_Test Item");
        apply_price_discount_rule(&candidate(pct_rule("A", 20.0, false)), &mut details, &args);
        apply_price_discount_rule(&candidate(pct_rule("B", 10.0, true)), &mut details, &args);
        assert_eq!(details.discount_percentage, 28.0);

        let mut details = ItemPricingDetails::new("_Test Item");
        apply_price_discount_rule(&candidate(pct_rule("A", 20.0, false)), &mut details, &args);
        apply_price_discount_rule(&candidate(pct_rule("B", 10.0, false)), &mut details, &args);
        assert_eq!(details.discount_percentage, 30.0);
    }

    #[test]
    fn test_rate_rule_uses_conversion_factor_for_other_uom() {
        let rule = PricingRule {
            name: "Rate".to_string(),
            rate_or_discount: RateOrDiscount::Rate,
            rate: 10.0,
            currency: Some("USD".to_string()),
            ..Default::default()
        };
        let args = ResolutionArgs {
            currency: Some("USD".to_string()),
            uom: Some("Box".to_string()),
            conversion_factor: 12.0,
            ..Default::default()
        };
        let mut details = ItemPricingDetails::new("_Test Item");
        details.discount_percentage = 5.0;

        let effect = apply_price_discount_rule(&candidate(rule.clone()), &mut details, &args);
        assert_eq!(details.price_list_rate, Some(120.0));
        assert_eq!(details.discount_percentage, 0.0);
        assert_eq!(effect.rate, 10.0);

        let mut inr = args.clone();
        inr.currency = Some("INR".to_string());
        let mut details = ItemPricingDetails::new("_Test Item");
        apply_price_discount_rule(&candidate(rule), &mut details, &inr);
        assert_eq!(details.price_list_rate, None);
    }

    #[test]
    fn test_line_values_with_rule_discount() {
        let mut line = TransactionLine::new("_Test Item", 5.0, 100.0);
        line.pricing_rules = vec!["PRLE-0001".to_string()];
        line.discount_percentage = 17.5;

        calculate_line_values(&mut line, &[], None, false);
        assert_eq!(line.rate, 82.5);
        assert_eq!(line.discount_amount, 17.5);
        assert_eq!(line.amount, 412.5);
    }

    #[test]
    fn test_line_values_with_margin() {
        let rule = Arc::new(PricingRule {
            name: "PRLE-0001".to_string(),
            margin_type: Some(MarginType::Percentage),
            margin_rate_or_amount: 10.0,
            discount_percentage: 10.0,
            ..Default::default()
        });
        let mut line = TransactionLine::new("_Test Item", 1.0, 1000.0);
        line.pricing_rules = vec![rule.name.clone()];
        line.discount_percentage = 10.0;

        calculate_line_values(&mut line, &[rule], Some("INR"), false);
        assert_eq!(line.rate_with_margin, 1100.0);
        assert_eq!(line.rate, 990.0);
        assert_eq!(line.discount_amount, 110.0);
    }

    #[test]
    fn test_manual_rate_above_list_becomes_margin() {
        let mut line = TransactionLine::new("_Test Item", 1.0, 100.0);
        line.rate = 120.0;

        calculate_line_values(&mut line, &[], None, false);
        assert_eq!(line.margin_type, Some(MarginType::Amount));
        assert_eq!(line.margin_rate_or_amount, 20.0);
        assert_eq!(line.rate, 120.0);
        assert_eq!(line.discount_amount, -20.0);
    }

    #[test]
    fn test_full_discount_zeroes_rate() {
        let mut line = TransactionLine::new("_Test Item", 2.0, 100.0);
        line.discount_percentage = 100.0;
        calculate_line_values(&mut line, &[], None, false);
        assert_eq!(line.rate, 0.0);
        assert_eq!(line.amount, 0.0);
    }
}

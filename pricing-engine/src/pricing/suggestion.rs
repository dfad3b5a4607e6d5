//! "Almost qualified" advisory messages

use super::item_calculator::to_decimal;
use rust_decimal::prelude::*;
use shared::models::{PricingRule, TransactionDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Threshold {
    MinQty,
    MinAmt,
    MaxQty,
    MaxAmt,
}

fn tolerance(bound: f64, pct: f64) -> f64 {
    (bound * pct / 100.0).trunc()
}

/// Message for a rule the basis narrowly missed, if within its threshold
///
/// Min bounds are checked before max bounds and amount after quantity; the
/// last threshold hit names the message.
pub fn suggestion_message(
    rule: &PricingRule,
    qty: f64,
    amount: f64,
    item_code: &str,
    direction: TransactionDirection,
) -> Option<String> {
    let pct = rule.threshold_percentage;
    if pct <= 0.0 {
        return None;
    }

    let mut hit = None;
    for (threshold, bound, value) in [
        (Threshold::MinQty, rule.min_qty, qty),
        (Threshold::MinAmt, rule.min_amt, amount),
    ] {
        if bound != 0.0 && value < bound && bound - tolerance(bound, pct) <= value {
            hit = Some((threshold, bound));
        }
    }
    for (threshold, bound, value) in [
        (Threshold::MaxQty, rule.max_qty, qty),
        (Threshold::MaxAmt, rule.max_amt, amount),
    ] {
        if bound != 0.0 && value > bound && bound + tolerance(bound, pct) >= value {
            hit = Some((threshold, bound));
        }
    }

    let (threshold, bound) = hit?;
    let verb = direction.verb();
    let message = match threshold {
        Threshold::MinQty | Threshold::MaxQty => format!(
            "If you {} {} quantities of the item {}, the scheme {} will be applied on the item.",
            verb,
            format_qty(bound),
            item_code,
            rule.title
        ),
        Threshold::MinAmt | Threshold::MaxAmt => format!(
            "If you {} {} worth item {}, the scheme {} will be applied on the item.",
            verb,
            format_money(bound, rule.currency.as_deref()),
            item_code,
            rule.title
        ),
    };
    tracing::info!(rule = %rule.name, item_code, "{}", message);
    Some(message)
}

/// Quantity without trailing zeros (5, 2.5)
pub fn format_qty(value: f64) -> String {
    to_decimal(value).normalize().to_string()
}

/// Currency-formatted amount: `USD 1,000.00`
pub fn format_money(value: f64, currency: Option<&str>) -> String {
    let rounded = to_decimal(value).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    match currency {
        Some(c) if !c.is_empty() => format!("{c} {sign}{grouped}.{frac_part}"),
        _ => format!("{sign}{grouped}.{frac_part}"),
    }
}

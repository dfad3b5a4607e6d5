//! Quantity/Amount Aggregator
//!
//! Basis for threshold checks: the line itself, the document lines inside
//! a mixed-conditions rule's scope, or historical postings for cumulative
//! rules.

use super::context::{ResolutionContext, args_value};
use super::error::PricingResult;
use super::item_calculator::{to_decimal, to_f64};
use crate::services::{HierarchyKind, HistoryQuery};
use rust_decimal::Decimal;
use shared::models::{ApplyOnKind, PricingRule, TransactionDocument};
use shared::pricing::ResolutionArgs;

/// Quantity and amount compared against rule thresholds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QtyAmountBasis {
    pub stock_qty: f64,
    pub amount: f64,
}

impl QtyAmountBasis {
    /// Simple line basis
    pub fn from_args(args: &ResolutionArgs) -> Self {
        Self {
            stock_qty: args.stock_qty,
            amount: to_f64(to_decimal(args.price_list_rate) * to_decimal(args.qty)),
        }
    }

    fn add(&mut self, other: QtyAmountBasis) {
        self.stock_qty = to_f64(to_decimal(self.stock_qty) + to_decimal(other.stock_qty));
        self.amount = to_f64(to_decimal(self.amount) + to_decimal(other.amount));
    }
}

/// Basis of a whole document
///
/// Free lines are excluded, so free goods a document already carries never
/// count toward the thresholds of the rules that grant them.
pub fn document_basis(doc: &TransactionDocument) -> QtyAmountBasis {
    let mut basis = QtyAmountBasis::default();
    for line in doc.items.iter().filter(|l| !l.is_free_item) {
        basis.add(QtyAmountBasis {
            stock_qty: line.qty,
            amount: line.amount,
        });
    }
    basis
}

/// Values a rule's scope covers, item groups expanded to their descendants
pub fn scope_items(ctx: &ResolutionContext<'_>, rule: &PricingRule) -> Vec<String> {
    let kind = rule.apply_on.kind();
    let mut items: Vec<String> = Vec::new();
    for entry in rule.apply_on.entries() {
        if entry.value.is_empty() {
            continue;
        }
        let expanded = match kind {
            ApplyOnKind::ItemGroup => ctx
                .descendants(HierarchyKind::ItemGroup, &entry.value)
                .to_vec(),
            _ => vec![entry.value.clone()],
        };
        for value in expanded {
            if !items.contains(&value) {
                items.push(value);
            }
        }
    }
    items
}

/// Basis summed over the document lines in the rule's scope
///
/// The scope is always the rule's own entries, item groups expanded, even
/// when the rule is triggered through `other_<kind>`.
/// The line being resolved contributes `args.qty × args.price_list_rate`,
/// other lines `qty × (price_list_rate or args.rate)`. Returns the items
/// the rule spans along with the basis.
pub fn mixed_conditions_basis(
    ctx: &ResolutionContext<'_>,
    rule: &PricingRule,
    args: &ResolutionArgs,
    doc: &TransactionDocument,
) -> PricingResult<(QtyAmountBasis, Vec<String>)> {
    let kind = rule.apply_on.kind();
    let items = scope_items(ctx, rule);
    let mut qty = Decimal::ZERO;
    let mut amount = Decimal::ZERO;

    if !items.is_empty() {
        for row in &doc.items {
            let value = ctx
                .line_value(row, kind)
                .or_else(|| args_value(args, kind).map(str::to_string));
            if !value.is_some_and(|v| items.contains(&v)) {
                continue;
            }

            let row_amount = if row.item_code != args.item_code {
                let rate = if row.price_list_rate != 0.0 {
                    row.price_list_rate
                } else {
                    args.rate
                };
                to_decimal(row.qty) * to_decimal(rate)
            } else {
                to_decimal(args.qty) * to_decimal(args.price_list_rate)
            };
            let row_qty = [row.stock_qty, args.stock_qty, args.qty]
                .into_iter()
                .find(|q| *q != 0.0)
                .unwrap_or_default();

            qty += to_decimal(row_qty);
            amount += row_amount;
        }
    }

    let mut basis = QtyAmountBasis {
        stock_qty: to_f64(qty),
        amount: to_f64(amount),
    };
    if rule.is_cumulative && !items.is_empty() {
        let history = cumulative_basis(ctx, rule, &doc.doctype, kind, items.clone())?;
        if history.stock_qty != 0.0 {
            basis.add(history);
        }
    }
    Ok((basis, items))
}

/// Basis booked by submitted documents inside the rule's validity window
pub fn cumulative_basis(
    ctx: &ResolutionContext<'_>,
    rule: &PricingRule,
    doctype: &str,
    kind: ApplyOnKind,
    values: Vec<String>,
) -> PricingResult<QtyAmountBasis> {
    let warehouses = rule
        .warehouse
        .as_deref()
        .filter(|w| !w.is_empty())
        .map(|w| ctx.descendants(HierarchyKind::Warehouse, w).to_vec());

    let query = HistoryQuery {
        doctype: doctype.to_string(),
        from: rule.valid_from.unwrap_or(ctx.config.open_valid_from),
        upto: rule.valid_upto.unwrap_or(ctx.config.open_valid_upto),
        scope: kind,
        values,
        warehouses,
    };

    let mut basis = QtyAmountBasis::default();
    for row in ctx.history.postings(&query)? {
        basis.add(QtyAmountBasis {
            stock_qty: row.stock_qty,
            amount: row.amount,
        });
    }
    tracing::debug!(
        rule = %rule.name,
        doctype,
        stock_qty = basis.stock_qty,
        amount = basis.amount,
        "Cumulative postings aggregated"
    );
    Ok(basis)
}

/// Basis for the first candidate of a line
///
/// Mixed-conditions rules aggregate the document (when one is supplied);
/// cumulative rules add history to the line basis. The second value is the
/// item set a mixed-conditions rule spans.
pub fn rule_basis(
    ctx: &ResolutionContext<'_>,
    rule: &PricingRule,
    args: &ResolutionArgs,
    doc: Option<&TransactionDocument>,
) -> PricingResult<(QtyAmountBasis, Option<Vec<String>>)> {
    let mut basis = QtyAmountBasis::from_args(args);

    if rule.mixed_conditions
        && let Some(doc) = doc
    {
        let (mixed, items) = mixed_conditions_basis(ctx, rule, args, doc)?;
        return Ok((mixed, Some(items)));
    }

    if rule.is_cumulative {
        let kind = rule.apply_on.kind();
        let values: Vec<String> = args_value(args, kind).map(str::to_string).into_iter().collect();
        let history = cumulative_basis(ctx, rule, &args.doctype, kind, values)?;
        basis.add(history);
    }
    Ok((basis, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use crate::services::{
        CatalogService, HierarchyClosureCache, InMemoryPostingHistory,
    };
    use shared::models::{ApplyOnScope, DocStatus, GroupNode, ScopeEntry, TransactionLine};

    struct Fixture {
        catalog: CatalogService,
        history: InMemoryPostingHistory,
        closures: HierarchyClosureCache,
        config: EngineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = CatalogService::new();
            catalog
                .add_group(HierarchyKind::ItemGroup, GroupNode::root("All Item Groups"))
                .unwrap();
            catalog
                .add_group(
                    HierarchyKind::ItemGroup,
                    GroupNode::child("Products", "All Item Groups", true),
                )
                .unwrap();
            catalog
                .add_group(
                    HierarchyKind::ItemGroup,
                    GroupNode::child("Laptops", "Products", false),
                )
                .unwrap();
            Self {
                catalog,
                history: InMemoryPostingHistory::new(),
                closures: HierarchyClosureCache::new(),
                config: EngineConfig::default(),
            }
        }

        fn ctx(&self) -> ResolutionContext<'_> {
            ResolutionContext {
                catalog: &self.catalog,
                history: &self.history,
                closures: &self.closures,
                config: &self.config,
            }
        }
    }

    fn line(item: &str, group: &str, qty: f64, rate: f64) -> TransactionLine {
        let mut line = TransactionLine::new(item, qty, rate);
        line.item_group = Some(group.to_string());
        line
    }

    #[test]
    fn test_scope_items_expand_groups() {
        let fx = Fixture::new();
        let rule = PricingRule {
            apply_on: ApplyOnScope::ItemGroup(vec![
                ScopeEntry::new("Products"),
                ScopeEntry::new("Laptops"),
            ]),
            ..Default::default()
        };
        assert_eq!(scope_items(&fx.ctx(), &rule), vec!["Products", "Laptops"]);
    }

    #[test]
    fn test_mixed_basis_uses_args_for_current_line() {
        let fx = Fixture::new();
        let rule = PricingRule {
            apply_on: ApplyOnScope::ItemGroup(vec![ScopeEntry::new("Products")]),
            mixed_conditions: true,
            ..Default::default()
        };
        let mut doc = TransactionDocument::new("Sales Order", "SO-0001");
        doc.items.push(line("_Test Item 1", "Laptops", 3.0, 100.0));
        doc.items.push(line("_Test Item 2", "Products", 2.0, 50.0));
        doc.items.push(line("_Test Service", "Services", 9.0, 10.0));

        let args = ResolutionArgs {
            doctype: "Sales Order".to_string(),
            item_code: "_Test Item 1".to_string(),
            item_group: Some("Laptops".to_string()),
            qty: 4.0,
            stock_qty: 4.0,
            price_list_rate: 100.0,
            ..Default::default()
        };

        let (basis, items) = mixed_conditions_basis(&fx.ctx(), &rule, &args, &doc).unwrap();
        assert_eq!(basis.stock_qty, 5.0);
        assert_eq!(basis.amount, 500.0);
        assert_eq!(items, vec!["Products", "Laptops"]);
    }

    #[test]
    fn test_cumulative_adds_history() {
        let fx = Fixture::new();
        let mut posted = TransactionDocument::new("Sales Invoice", "SINV-0001");
        posted.docstatus = DocStatus::Submitted;
        posted.posting_date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1);
        let mut booked = line("_Test Item", "Products", 6.0, 100.0);
        booked.amount = 600.0;
        posted.items.push(booked);
        fx.history.record(posted);

        let rule = PricingRule {
            apply_on: ApplyOnScope::ItemCode(vec![ScopeEntry::new("_Test Item")]),
            is_cumulative: true,
            valid_from: chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
            valid_upto: chrono::NaiveDate::from_ymd_opt(2024, 12, 31),
            ..Default::default()
        };
        let args = ResolutionArgs {
            doctype: "Sales Invoice".to_string(),
            item_code: "_Test Item".to_string(),
            qty: 2.0,
            stock_qty: 2.0,
            price_list_rate: 100.0,
            ..Default::default()
        };

        let (basis, items) = rule_basis(&fx.ctx(), &rule, &args, None).unwrap();
        assert!(items.is_none());
        assert_eq!(basis.stock_qty, 8.0);
        assert_eq!(basis.amount, 800.0);
    }
}

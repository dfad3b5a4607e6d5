//! Pricing Rule Matcher
//!
//! Candidate lookup for a line: scope matching per kind (item code, item
//! group, brand), then party, hierarchy, date, price list and direction
//! filters.

use super::context::{ResolutionContext, args_value};
use super::error::PricingResult;
use crate::db::repository::PricingRuleStore;
use crate::services::HierarchyKind;
use shared::models::{ApplicableFor, ApplyOnKind, PartyField, PricingRule, ScopeEntry};
use shared::pricing::ResolutionArgs;
use std::sync::Arc;

/// A rule that matched a line, with the scope entry it matched through
#[derive(Debug, Clone)]
pub struct RuleCandidate {
    pub rule: Arc<PricingRule>,
    /// First matching scope entry; `None` for transaction rules
    pub matched_entry: Option<ScopeEntry>,
    /// Template code, tagged when matched by item code on a variant
    pub variant_of: Option<String>,
    /// Items the effect is applied on (mixed / cross-item rules)
    pub apply_rule_on_other_items: Vec<String>,
}

impl RuleCandidate {
    pub fn new(rule: Arc<PricingRule>, matched_entry: Option<ScopeEntry>) -> Self {
        Self {
            rule,
            matched_entry,
            variant_of: None,
            apply_rule_on_other_items: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.rule.name
    }

    pub fn kind(&self) -> ApplyOnKind {
        self.rule.apply_on.kind()
    }

    /// UOM of the matched scope entry
    pub fn matched_uom(&self) -> Option<&str> {
        self.matched_entry
            .as_ref()
            .and_then(|e| e.uom.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Priority descending, then name descending
pub fn sort_candidates(candidates: &mut [RuleCandidate]) {
    candidates.sort_by(|a, b| {
        b.rule
            .priority_value()
            .cmp(&a.rule.priority_value())
            .then_with(|| b.rule.name.cmp(&a.rule.name))
    });
}

// ==================== Scope Matching ====================

fn matches_scope_entry(
    entry: &ScopeEntry,
    kind: ApplyOnKind,
    value: &str,
    args: &ResolutionArgs,
    item_groups: Option<&[String]>,
) -> bool {
    match kind {
        ApplyOnKind::ItemCode => {
            let uom_ok = match (args.uom.as_deref(), entry.uom.as_deref()) {
                (Some(uom), Some(entry_uom)) if !entry_uom.is_empty() => uom == entry_uom,
                _ => true,
            };
            (entry.value == value && uom_ok)
                || args.variant_of.as_deref().is_some_and(|t| entry.value == t)
        }
        ApplyOnKind::ItemGroup => {
            !entry.value.is_empty() && item_groups.is_some_and(|g| g.contains(&entry.value))
        }
        ApplyOnKind::Brand => entry.value == value,
        ApplyOnKind::Transaction => false,
    }
}

/// Entry a rule matches `value` through, if any
fn match_rule(
    rule: &PricingRule,
    kind: ApplyOnKind,
    value: &str,
    args: &ResolutionArgs,
    item_groups: Option<&[String]>,
) -> Option<ScopeEntry> {
    let entries = rule.apply_on.entries();
    if let Some(entry) = entries
        .iter()
        .find(|e| matches_scope_entry(e, kind, value, args, item_groups))
    {
        return Some(entry.clone());
    }

    // Cross-item trigger: the rule names this line through `other_<kind>`
    if rule.apply_rule_on_other.is_some() && rule.other_value(kind) == Some(value) {
        return entries.first().cloned();
    }
    None
}

// ==================== Filters ====================

fn args_party(args: &ResolutionArgs, field: PartyField) -> Option<&str> {
    let value = match field {
        PartyField::Company => args.company.as_deref(),
        PartyField::Customer => args.customer.as_deref(),
        PartyField::Supplier => args.supplier.as_deref(),
        PartyField::Campaign => args.campaign.as_deref(),
        PartyField::SalesPartner => args.sales_partner.as_deref(),
    };
    value.filter(|v| !v.is_empty())
}

fn rule_tree_value(rule: &PricingRule, kind: HierarchyKind) -> Option<&str> {
    let value = match (kind, &rule.applicable_for) {
        (HierarchyKind::CustomerGroup, Some(ApplicableFor::CustomerGroup(v)))
        | (HierarchyKind::Territory, Some(ApplicableFor::Territory(v)))
        | (HierarchyKind::SupplierGroup, Some(ApplicableFor::SupplierGroup(v))) => Some(v.as_str()),
        (HierarchyKind::Warehouse, _) => rule.warehouse.as_deref(),
        _ => None,
    };
    value.filter(|v| !v.is_empty())
}

fn args_tree_value(args: &ResolutionArgs, kind: HierarchyKind) -> Option<&str> {
    let value = match kind {
        HierarchyKind::CustomerGroup => args.customer_group.as_deref(),
        HierarchyKind::Territory => args.territory.as_deref(),
        HierarchyKind::SupplierGroup => args.supplier_group.as_deref(),
        HierarchyKind::Warehouse => args.warehouse.as_deref(),
        HierarchyKind::ItemGroup => args.item_group.as_deref(),
    };
    value.filter(|v| !v.is_empty())
}

/// Party equality: a set rule value must equal the args value
fn passes_party_filters(rule: &PricingRule, args: &ResolutionArgs) -> bool {
    PartyField::ALL
        .iter()
        .all(|field| match (rule.party_value(*field), args_party(args, *field)) {
            (None, _) => true,
            (Some(r), Some(a)) => r == a,
            (Some(_), None) => false,
        })
}

/// Hierarchy containment, applied only when args carry the field
fn passes_tree_filter(
    ctx: &ResolutionContext<'_>,
    rule: &PricingRule,
    args: &ResolutionArgs,
    kind: HierarchyKind,
) -> PricingResult<bool> {
    let (Some(value), Some(rule_value)) = (args_tree_value(args, kind), rule_tree_value(rule, kind))
    else {
        return Ok(true);
    };
    let groups = ctx.matching_groups(kind, value)?;
    Ok(groups.iter().any(|g| g == rule_value))
}

/// Filters shared by line and transaction queries
fn passes_common_filters(
    ctx: &ResolutionContext<'_>,
    rule: &PricingRule,
    args: &ResolutionArgs,
) -> PricingResult<bool> {
    if rule.disable || rule.direction != args.direction() || !passes_party_filters(rule, args) {
        return Ok(false);
    }
    if let Some(date) = args.transaction_date
        && !ctx.config.within_validity(date, rule.valid_from, rule.valid_upto)
    {
        return Ok(false);
    }
    for kind in [
        HierarchyKind::CustomerGroup,
        HierarchyKind::Territory,
        HierarchyKind::SupplierGroup,
    ] {
        if !passes_tree_filter(ctx, rule, args, kind)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn passes_line_filters(
    ctx: &ResolutionContext<'_>,
    rule: &PricingRule,
    args: &ResolutionArgs,
) -> PricingResult<bool> {
    if !passes_common_filters(ctx, rule, args)? {
        return Ok(false);
    }
    if rule.for_price_list.is_some() && rule.for_price_list != args.price_list {
        return Ok(false);
    }
    passes_tree_filter(ctx, rule, args, HierarchyKind::Warehouse)
}

// ==================== Queries ====================

/// Candidate rules for a line, in query order
///
/// Scope kinds are queried item code first, then item group, then brand.
/// Querying stops after the first kind that yields rules unless one of the
/// rules found so far stacks (`apply_multiple_pricing_rules`).
pub fn find_candidate_rules(
    store: &dyn PricingRuleStore,
    ctx: &ResolutionContext<'_>,
    args: &ResolutionArgs,
) -> PricingResult<Vec<RuleCandidate>> {
    if !store.has_enabled_rules(args.direction())? {
        return Ok(Vec::new());
    }

    let mut found: Vec<RuleCandidate> = Vec::new();
    for kind in ApplyOnKind::LINE_SCOPES {
        let Some(value) = args_value(args, kind) else {
            continue;
        };
        let item_groups = match kind {
            ApplyOnKind::ItemGroup => Some(ctx.matching_groups(HierarchyKind::ItemGroup, value)?),
            _ => None,
        };

        let mut matched = Vec::new();
        for rule in store.find_by_scope(kind)? {
            if found.iter().any(|c| c.rule.name == rule.name) {
                continue;
            }
            let Some(entry) = match_rule(&rule, kind, value, args, item_groups.as_deref().map(|g| g.as_slice()))
            else {
                continue;
            };
            if passes_line_filters(ctx, &rule, args)? {
                matched.push(RuleCandidate::new(rule, Some(entry)));
            }
        }
        sort_candidates(&mut matched);

        tracing::debug!(
            item_code = %args.item_code,
            scope = kind.label(),
            matched = matched.len(),
            "Pricing rules queried"
        );
        found.extend(matched);
        if !found.is_empty() && !found.iter().any(|c| c.rule.apply_multiple_pricing_rules) {
            break;
        }
    }
    Ok(found)
}

/// Transaction-level rules matching the document context
///
/// Price list and warehouse are not considered at document level.
pub fn find_transaction_rules(
    store: &dyn PricingRuleStore,
    ctx: &ResolutionContext<'_>,
    args: &ResolutionArgs,
) -> PricingResult<Vec<RuleCandidate>> {
    let mut matched = Vec::new();
    for rule in store.find_transaction_rules()? {
        if passes_common_filters(ctx, &rule, args)? {
            matched.push(RuleCandidate::new(rule, None));
        }
    }
    sort_candidates(&mut matched);
    Ok(matched)
}

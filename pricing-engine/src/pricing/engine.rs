//! Pricing Engine
//!
//! Entry points used by transaction documents: per-line resolution, rule
//! removal, transaction-level rules and the save-time driver.

use super::aggregator::{document_basis, scope_items};
use super::context::ResolutionContext;
use super::error::{PricingError, PricingResult};
use super::free_item::{merge_free_items, product_discount, remove_free_items};
use super::item_calculator::{apply_price_discount_rule, calculate_line_values, to_decimal, to_f64};
use super::matcher::{find_candidate_rules, find_transaction_rules};
use super::order_calculator::{apply_transaction_price_rule, calculate_totals};
use super::selector::{RuleResolution, filter_by_qty_amount, resolve};
use crate::core::EngineConfig;
use crate::db::repository::PricingRuleStore;
use crate::services::{CatalogLookup, CouponLedger, HierarchyClosureCache, PostingHistory};
use rust_decimal::Decimal;
use shared::models::{
    DiscountKind, PricingRule, RateOrDiscount, TransactionDirection, TransactionDocument,
    TransactionLine,
};
use shared::pricing::{AppliedPricingRule, ItemPricingDetails, ResolutionArgs, ResolvedEffect};
use std::collections::HashSet;
use std::sync::Arc;

/// Advisories collected while pricing a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingReport {
    /// "Almost qualified" messages
    pub suggestions: Vec<String>,
    /// Transaction rules held back by a lower manual discount
    pub notices: Vec<String>,
}

/// Pricing Engine - resolves pricing rules for transaction documents
#[derive(Clone)]
pub struct PricingEngine {
    rules: Arc<dyn PricingRuleStore>,
    catalog: Arc<dyn CatalogLookup>,
    history: Arc<dyn PostingHistory>,
    coupons: CouponLedger,
    config: EngineConfig,
}

impl std::fmt::Debug for PricingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingEngine")
            .field("rules", &"<PricingRuleStore>")
            .field("catalog", &"<CatalogLookup>")
            .field("history", &"<PostingHistory>")
            .field("coupons", &self.coupons)
            .field("config", &self.config)
            .finish()
    }
}

impl PricingEngine {
    pub fn new(
        rules: Arc<dyn PricingRuleStore>,
        catalog: Arc<dyn CatalogLookup>,
        history: Arc<dyn PostingHistory>,
        coupons: CouponLedger,
        config: EngineConfig,
    ) -> Self {
        Self {
            rules,
            catalog,
            history,
            coupons,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn coupons(&self) -> &CouponLedger {
        &self.coupons
    }

    fn context<'a>(&'a self, closures: &'a HierarchyClosureCache) -> ResolutionContext<'a> {
        ResolutionContext {
            catalog: self.catalog.as_ref(),
            history: self.history.as_ref(),
            closures,
            config: &self.config,
        }
    }

    // ==================== Line Resolution ====================

    /// Rules that apply to a line, lowest priority first when stacking
    ///
    /// `args` are used as given; item metadata is not filled in.
    pub fn get_pricing_rules(
        &self,
        args: &ResolutionArgs,
        doc: Option<&TransactionDocument>,
    ) -> PricingResult<Vec<RuleResolution>> {
        let closures = HierarchyClosureCache::new();
        self.resolve_rules(&self.context(&closures), args, doc)
    }

    fn resolve_rules(
        &self,
        ctx: &ResolutionContext<'_>,
        args: &ResolutionArgs,
        doc: Option<&TransactionDocument>,
    ) -> PricingResult<Vec<RuleResolution>> {
        let candidates = find_candidate_rules(self.rules.as_ref(), ctx, args)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let resolutions = resolve(ctx, candidates, args, doc)?;
        tracing::debug!(
            item_code = %args.item_code,
            resolved = resolutions.len(),
            "Pricing rules resolved"
        );
        Ok(resolutions)
    }

    /// Pricing details for one line
    ///
    /// Fills item metadata into `args`, resolves the applicable rules and
    /// accumulates their effects. When no rule applies any longer, the
    /// previously applied rules are removed instead.
    pub fn get_pricing_rule_for_item(
        &self,
        args: &ResolutionArgs,
        doc: Option<&TransactionDocument>,
    ) -> PricingResult<ItemPricingDetails> {
        let closures = HierarchyClosureCache::new();
        self.pricing_for_item(&self.context(&closures), args, doc)
    }

    fn pricing_for_item(
        &self,
        ctx: &ResolutionContext<'_>,
        args: &ResolutionArgs,
        doc: Option<&TransactionDocument>,
    ) -> PricingResult<ItemPricingDetails> {
        let mut details = ItemPricingDetails::new(args.item_code.clone());
        let parent = args.doctype.strip_suffix(" Item").unwrap_or(&args.doctype);
        if args.is_free_item || parent == "Material Request" {
            return Ok(details);
        }

        if args.ignore_pricing_rule || args.item_code.is_empty() {
            if !args.pricing_rules.is_empty() {
                return self.remove_rules(ctx, &args.pricing_rules, &args.item_code, None);
            }
            return Ok(details);
        }

        let mut args = args.clone();
        self.update_args(&mut args)?;
        let resolutions = self.resolve_rules(ctx, &args, doc)?;

        let coupon_rule = match args.coupon_code.as_deref() {
            Some(code) => self.coupons.find(code)?.map(|c| c.pricing_rule),
            None => None,
        };

        let mut applied: Vec<AppliedPricingRule> = Vec::new();
        for resolution in resolutions {
            let candidate = match resolution {
                RuleResolution::Applied(candidate) => candidate,
                RuleResolution::Suggestion { message, .. } => {
                    details.suggestion = Some(message);
                    continue;
                }
            };
            let rule = candidate.rule.clone();
            details.validate_applied_rule = rule.validate_applied_rule;
            details.price_or_product_discount = Some(rule.price_or_product_discount);

            let mut record = AppliedPricingRule::from_rule(&rule, args.item_code.clone());
            record.variant_of = candidate.variant_of.clone();
            record.apply_rule_on_other_items = candidate.apply_rule_on_other_items.clone();
            applied.push(record);

            if rule.mixed_conditions || rule.apply_rule_on_other.is_some() {
                details.apply_rule_on = Some(rule.apply_rule_on_other.unwrap_or(rule.apply_on.kind()));
                if !candidate.apply_rule_on_other_items.is_empty() {
                    details.apply_rule_on_other_items = candidate.apply_rule_on_other_items.clone();
                }
            }

            if rule.coupon_code_based {
                if args.coupon_code.is_none() {
                    tracing::debug!(rule = %rule.name, "Coupon-based rule without coupon");
                    if args.pricing_rules.is_empty() {
                        return Ok(details);
                    }
                    let suggestion = details.suggestion.take();
                    let mut removed = self.remove_rules(
                        ctx,
                        &args.pricing_rules,
                        &args.item_code,
                        Some(args.price_list_rate),
                    )?;
                    removed.suggestion = suggestion;
                    return Ok(removed);
                }
                if coupon_rule.as_deref() != Some(rule.name.as_str()) {
                    continue;
                }
            }
            if rule.validate_applied_rule {
                continue;
            }

            match rule.price_or_product_discount {
                DiscountKind::Price => {
                    let effect = apply_price_discount_rule(&candidate, &mut details, &args);
                    details.effects.push(ResolvedEffect::Price(effect));
                }
                DiscountKind::Product => {
                    let spec = product_discount(
                        ctx,
                        &rule,
                        Some(&args.item_code),
                        args.qty,
                        &args.doctype,
                        doc,
                    )?;
                    details.free_item_data.push(spec.clone());
                    details.effects.push(ResolvedEffect::Product(spec));
                }
            }
        }

        if applied.is_empty() {
            if !args.pricing_rules.is_empty() {
                let suggestion = details.suggestion.take();
                let mut removed = self.remove_rules(
                    ctx,
                    &args.pricing_rules,
                    &args.item_code,
                    Some(args.price_list_rate),
                )?;
                removed.suggestion = suggestion;
                return Ok(removed);
            }
            return Ok(details);
        }

        if !details.has_margin {
            details.margin_type = None;
            details.margin_rate_or_amount = 0.0;
        }
        details.has_pricing_rule = true;
        details.pricing_rules = applied.iter().map(|r| r.pricing_rule.clone()).collect();
        details.applied_rules = applied;

        tracing::info!(
            item_code = %args.item_code,
            rules = ?details.pricing_rules,
            "Pricing rules applied"
        );
        Ok(details)
    }

    /// Complete `args` from the item master and drop the other side's parties
    fn update_args(&self, args: &mut ResolutionArgs) -> PricingResult<()> {
        if let Some(item) = self.catalog.item_meta(&args.item_code) {
            if args.item_group.as_deref().is_none_or(str::is_empty) && !item.item_group.is_empty() {
                args.item_group = Some(item.item_group);
            }
            if args.brand.is_none() {
                args.brand = item.brand;
            }
            if args.variant_of.is_none() {
                args.variant_of = item.variant_of;
            }
            if args.stock_uom.is_none() && !item.stock_uom.is_empty() {
                args.stock_uom = Some(item.stock_uom);
            }
        }
        if args.item_group.as_deref().is_none_or(str::is_empty) {
            return Err(PricingError::ItemGroupMissing {
                item_code: args.item_code.clone(),
            });
        }

        if args.conversion_factor == 0.0 {
            args.conversion_factor = 1.0;
        }
        if args.stock_qty == 0.0 {
            args.stock_qty = to_f64(to_decimal(args.qty) * to_decimal(args.conversion_factor));
        }

        match args.direction() {
            TransactionDirection::Selling => {
                args.supplier = None;
                args.supplier_group = None;
            }
            TransactionDirection::Buying => {
                args.customer = None;
                args.customer_group = None;
                args.territory = None;
            }
        }
        Ok(())
    }

    // ==================== Rule Removal ====================

    /// Undo the effects of `rule_names` on a line
    ///
    /// Discount Percentage rules reset the rate to `rate` (0 when unset, so
    /// the line rate is recomputed from the list price). Product rules
    /// report the free item to strip.
    pub fn remove_pricing_rule_for_item(
        &self,
        rule_names: &[String],
        item_code: &str,
        rate: Option<f64>,
    ) -> PricingResult<ItemPricingDetails> {
        let closures = HierarchyClosureCache::new();
        self.remove_rules(&self.context(&closures), rule_names, item_code, rate)
    }

    fn remove_rules(
        &self,
        ctx: &ResolutionContext<'_>,
        rule_names: &[String],
        item_code: &str,
        rate: Option<f64>,
    ) -> PricingResult<ItemPricingDetails> {
        let mut details = ItemPricingDetails::new(item_code);

        for name in rule_names {
            let Some(rule) = self.rules.find_by_name(name)? else {
                continue;
            };
            match rule.price_or_product_discount {
                DiscountKind::Price => {
                    match rule.rate_or_discount {
                        RateOrDiscount::DiscountPercentage => {
                            details.discount_percentage = 0.0;
                            details.discount_amount = 0.0;
                            details.rate = Some(rate.unwrap_or_default());
                        }
                        RateOrDiscount::DiscountAmount => details.discount_amount = 0.0,
                        RateOrDiscount::Rate => {}
                    }
                    if rule.margin_type.is_some() {
                        details.margin_type = None;
                        details.margin_rate_or_amount = 0.0;
                    }
                }
                DiscountKind::Product => {
                    details.remove_free_item = if rule.same_item {
                        Some(item_code.to_string())
                    } else {
                        rule.free_item.clone()
                    };
                }
            }

            if rule.mixed_conditions || rule.apply_rule_on_other.is_some() {
                details.apply_rule_on = Some(rule.apply_rule_on_other.unwrap_or(rule.apply_on.kind()));
                details.apply_rule_on_other_items =
                    match rule.apply_rule_on_other.and_then(|other| rule.other_value(other)) {
                        Some(value) => vec![value.to_string()],
                        None => scope_items(ctx, &rule),
                    };
            }
        }

        details.pricing_rules.clear();
        details.pricing_rule_removed = true;
        tracing::info!(item_code, rules = ?rule_names, "Pricing rules removed");
        Ok(details)
    }

    // ==================== Transaction Rules ====================

    /// Apply Transaction-scoped rules to the whole document
    ///
    /// Returns notices for rules held back by `validate_applied_rule`.
    pub fn apply_pricing_rule_on_transaction(
        &self,
        doc: &mut TransactionDocument,
    ) -> PricingResult<Vec<String>> {
        let closures = HierarchyClosureCache::new();
        self.transaction_rules(&self.context(&closures), doc)
    }

    fn transaction_rules(
        &self,
        ctx: &ResolutionContext<'_>,
        doc: &mut TransactionDocument,
    ) -> PricingResult<Vec<String>> {
        let mut notices = Vec::new();
        let args = ResolutionArgs::from_document(doc);
        let candidates = find_transaction_rules(self.rules.as_ref(), ctx, &args)?;
        if candidates.is_empty() {
            return Ok(notices);
        }

        let owned: HashSet<String> = candidates.iter().map(|c| c.name().to_string()).collect();
        let basis = document_basis(doc);
        let qualifying = filter_by_qty_amount(ctx, candidates, basis, None);
        if qualifying.is_empty() {
            remove_free_items(doc);
            calculate_totals(doc);
            return Ok(notices);
        }

        let coupon_rule = match doc.coupon_code.as_deref() {
            Some(code) => self.coupons.find(code)?.map(|c| c.pricing_rule),
            None => None,
        };

        let mut specs = Vec::new();
        for candidate in &qualifying {
            let rule = &candidate.rule;
            match rule.price_or_product_discount {
                DiscountKind::Price => {
                    notices.extend(apply_transaction_price_rule(doc, rule, coupon_rule.as_deref()));
                    calculate_totals(doc);
                }
                DiscountKind::Product => {
                    let spec =
                        product_discount(ctx, rule, None, basis.stock_qty, &doc.doctype, Some(&*doc))?;
                    specs.push(spec);
                }
            }
        }

        merge_free_items(doc, &specs, &owned);
        calculate_totals(doc);
        Ok(notices)
    }

    // ==================== Document Save ====================

    /// Price every line of a document, then apply transaction rules
    ///
    /// Validates the document's coupon, applies line effects, merges free
    /// lines, recomputes line values and totals. One hierarchy cache is
    /// shared by the whole pass.
    pub fn set_pricing_rules(&self, doc: &mut TransactionDocument) -> PricingResult<PricingReport> {
        let closures = HierarchyClosureCache::new();
        let ctx = self.context(&closures);
        let mut report = PricingReport::default();

        if let Some(code) = doc.coupon_code.as_deref() {
            self.coupons
                .validate_coupon_code(code, chrono::Local::now().date_naive())?;
        }

        let snapshot = doc.clone();
        let mut owned: HashSet<String> = HashSet::new();
        let mut specs = Vec::new();
        for (idx, line) in snapshot.items.iter().enumerate() {
            if line.is_free_item {
                continue;
            }
            owned.extend(line.pricing_rules.iter().cloned());

            let args = ResolutionArgs::from_line(&snapshot, line);
            let details = self.pricing_for_item(&ctx, &args, Some(&snapshot))?;
            if let Some(suggestion) = &details.suggestion {
                report.suggestions.push(suggestion.clone());
            }
            owned.extend(details.pricing_rules.iter().cloned());
            specs.extend(details.free_item_data.iter().cloned());

            if let Some(target) = doc.items.get_mut(idx) {
                apply_details(target, &details);
            }
        }
        merge_free_items(doc, &specs, &owned);

        let currency = doc.currency.clone();
        let ignore = doc.ignore_pricing_rule;
        for line in doc.items.iter_mut() {
            let applied = self.applied_rules(&line.pricing_rules)?;
            calculate_line_values(line, &applied, currency.as_deref(), ignore);
        }
        calculate_totals(doc);

        if !doc.ignore_pricing_rule {
            report.notices = self.transaction_rules(&ctx, doc)?;
        }

        tracing::info!(
            doc = %doc.name,
            lines = doc.items.len(),
            net_total = doc.net_total,
            "Document priced"
        );
        Ok(report)
    }

    fn applied_rules(&self, names: &[String]) -> PricingResult<Vec<Arc<PricingRule>>> {
        let mut rules = Vec::with_capacity(names.len());
        for name in names {
            if let Some(rule) = self.rules.find_by_name(name)? {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    // ==================== Coupon Usage ====================

    /// Count the document's coupon as used
    pub fn on_submit(&self, doc: &TransactionDocument) -> PricingResult<()> {
        if let Some(code) = doc.coupon_code.as_deref() {
            self.coupons.record_use(code)?;
        }
        Ok(())
    }

    /// Release the document's coupon use
    pub fn on_cancel(&self, doc: &TransactionDocument) -> PricingResult<()> {
        if let Some(code) = doc.coupon_code.as_deref() {
            self.coupons.record_cancel(code)?;
        }
        Ok(())
    }
}

/// Copy resolved line details onto a document line
fn apply_details(line: &mut TransactionLine, details: &ItemPricingDetails) {
    if details.pricing_rule_removed {
        line.discount_percentage = details.discount_percentage;
        line.discount_amount = details.discount_amount;
        line.margin_type = None;
        line.margin_rate_or_amount = 0.0;
        line.rate_with_margin = 0.0;
        line.rate = details.rate.unwrap_or_default();
        line.pricing_rules.clear();
        return;
    }
    if !details.has_pricing_rule {
        return;
    }

    if let Some(price_list_rate) = details.price_list_rate {
        line.price_list_rate = price_list_rate;
    }
    line.discount_percentage = details.discount_percentage;
    line.discount_amount = details.discount_amount;
    line.margin_type = details.margin_type;
    line.margin_rate_or_amount = details.margin_rate_or_amount;
    line.pricing_rules = details.pricing_rules.clone();

    let plr = to_decimal(line.price_list_rate);
    line.rate = if details.discount_percentage > 0.0 {
        let pct = to_decimal(details.discount_percentage);
        to_f64(plr * (Decimal::ONE - pct / Decimal::ONE_HUNDRED))
    } else {
        to_f64(plr - to_decimal(details.discount_amount))
    };
}

use super::*;
use crate::core::EngineConfig;
use crate::db::repository::{CouponCodeRepository, PricingRuleRepository};
use crate::services::{CatalogService, CouponLedger, HierarchyKind, InMemoryPostingHistory};
use chrono::NaiveDate;
use shared::models::{
    ApplicableFor, ApplyOnKind, ApplyOnScope, CouponCode, DiscountKind, DocStatus, GroupNode,
    Item, MarginType, PricingRule, RateOrDiscount, ScopeEntry, TransactionDocument,
    TransactionLine, UomConversion,
};
use shared::pricing::ResolutionArgs;
use std::sync::Arc;

struct TestEnv {
    engine: PricingEngine,
    rules: PricingRuleRepository,
    coupons: CouponCodeRepository,
    history: InMemoryPostingHistory,
}

impl TestEnv {
    fn add_rule(&self, rule: PricingRule) -> Arc<PricingRule> {
        self.rules.create(rule).unwrap()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_tree(catalog: &CatalogService, kind: HierarchyKind, root: &str, children: &[(&str, &str, bool)]) {
    catalog.add_group(kind, GroupNode::root(root)).unwrap();
    for (name, parent, is_group) in children {
        catalog
            .add_group(kind, GroupNode::child(*name, *parent, *is_group))
            .unwrap();
    }
}

fn create_catalog() -> CatalogService {
    let catalog = CatalogService::new();
    seed_tree(
        &catalog,
        HierarchyKind::ItemGroup,
        "All Item Groups",
        &[
            ("Products", "All Item Groups", true),
            ("_Test Item Group", "Products", false),
            ("Laptops", "Products", false),
            ("Services", "All Item Groups", false),
        ],
    );
    seed_tree(
        &catalog,
        HierarchyKind::CustomerGroup,
        "All Customer Groups",
        &[
            ("Commercial", "All Customer Groups", false),
            ("Individual", "All Customer Groups", false),
        ],
    );
    seed_tree(
        &catalog,
        HierarchyKind::Territory,
        "All Territories",
        &[
            ("India", "All Territories", false),
            ("Rest Of The World", "All Territories", false),
        ],
    );

    let mut test_item = Item::new("_Test Item", "_Test Item Group");
    test_item.uoms.push(UomConversion {
        uom: "Box".to_string(),
        conversion_factor: 10.0,
    });
    catalog.upsert_item(test_item).unwrap();
    catalog
        .upsert_item(Item::new("_Test Item 2", "_Test Item Group"))
        .unwrap();
    catalog
        .upsert_item(Item::new("_Test Variant Item", "_Test Item Group"))
        .unwrap();
    let mut variant = Item::new("_Test Variant Item-S", "_Test Item Group");
    variant.variant_of = Some("_Test Variant Item".to_string());
    catalog.upsert_item(variant).unwrap();
    catalog.upsert_item(Item::new("_Test Laptop 1", "Laptops")).unwrap();
    catalog.upsert_item(Item::new("_Test Laptop 2", "Laptops")).unwrap();
    catalog.upsert_item(Item::new("_Test Free Item", "Products")).unwrap();
    catalog
}

fn create_test_env() -> TestEnv {
    let rules = PricingRuleRepository::new();
    let coupons = CouponCodeRepository::new();
    let history = InMemoryPostingHistory::new();
    let engine = PricingEngine::new(
        Arc::new(rules.clone()),
        Arc::new(create_catalog()),
        Arc::new(history.clone()),
        CouponLedger::new(Arc::new(coupons.clone())),
        EngineConfig::default(),
    );
    TestEnv {
        engine,
        rules,
        coupons,
        history,
    }
}

// ========================================================================
// Rule builders
// ========================================================================

fn item_rule(name: &str, item_code: &str, discount_percentage: f64) -> PricingRule {
    PricingRule {
        name: name.to_string(),
        title: name.to_string(),
        apply_on: ApplyOnScope::ItemCode(vec![ScopeEntry::new(item_code)]),
        rate_or_discount: RateOrDiscount::DiscountPercentage,
        discount_percentage,
        ..Default::default()
    }
}

fn stacking_rule(name: &str, priority: Option<i32>, discount_percentage: f64) -> PricingRule {
    PricingRule {
        priority,
        apply_multiple_pricing_rules: true,
        ..item_rule(name, "_Test Item", discount_percentage)
    }
}

fn free_item_rule(name: &str, item_code: &str) -> PricingRule {
    PricingRule {
        price_or_product_discount: DiscountKind::Product,
        same_item: true,
        free_qty: 1.0,
        ..item_rule(name, item_code, 0.0)
    }
}

fn transaction_rule(name: &str) -> PricingRule {
    PricingRule {
        name: name.to_string(),
        title: name.to_string(),
        apply_on: ApplyOnScope::Transaction,
        ..Default::default()
    }
}

// ========================================================================
// Document builders
// ========================================================================

fn sales_args(item_code: &str, qty: f64, price_list_rate: f64) -> ResolutionArgs {
    ResolutionArgs {
        doctype: "Sales Order".to_string(),
        item_code: item_code.to_string(),
        company: Some("_Test Company".to_string()),
        currency: Some("USD".to_string()),
        customer: Some("_Test Customer".to_string()),
        customer_group: Some("Commercial".to_string()),
        territory: Some("India".to_string()),
        price_list: Some("Standard Selling".to_string()),
        transaction_date: Some(date(2024, 6, 1)),
        qty,
        stock_qty: qty,
        conversion_factor: 1.0,
        price_list_rate,
        ..Default::default()
    }
}

fn sales_order(lines: &[(&str, f64, f64)]) -> TransactionDocument {
    let mut doc = TransactionDocument::new("Sales Order", "SO-0001");
    doc.company = Some("_Test Company".to_string());
    doc.currency = Some("USD".to_string());
    doc.customer = Some("_Test Customer".to_string());
    doc.customer_group = Some("Commercial".to_string());
    doc.territory = Some("India".to_string());
    doc.price_list = Some("Standard Selling".to_string());
    doc.transaction_date = Some(date(2024, 6, 1));
    for (item_code, qty, price_list_rate) in lines {
        doc.items
            .push(TransactionLine::new(*item_code, *qty, *price_list_rate));
    }
    doc
}

fn paid_lines(doc: &TransactionDocument) -> Vec<&TransactionLine> {
    doc.items.iter().filter(|l| !l.is_free_item).collect()
}

mod test_document;

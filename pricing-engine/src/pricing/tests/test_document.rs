use super::*;

// ========================================================================
// Line pricing on save
// ========================================================================

#[test]
fn test_save_applies_threshold_discount() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        min_qty: 5.0,
        max_qty: 7.0,
        ..item_rule("PRLE-0001", "_Test Item", 17.5)
    });

    let mut doc = sales_order(&[("_Test Item", 5.0, 100.0), ("_Test Item 2", 1.0, 40.0)]);
    let report = env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(report, PricingReport::default());

    let line = &doc.items[0];
    assert_eq!(line.rate, 82.5);
    assert_eq!(line.discount_amount, 17.5);
    assert_eq!(line.amount, 412.5);
    assert_eq!(doc.items[1].rate, 40.0);
    assert_eq!(doc.total, 452.5);
    assert_eq!(doc.net_total, 452.5);
}

#[test]
fn test_ignore_pricing_rule_restores_list_price() {
    let env = create_test_env();
    env.add_rule(item_rule("PRLE-0001", "_Test Item", 10.0));

    let mut doc = sales_order(&[("_Test Item", 1.0, 100.0)]);
    env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(doc.items[0].rate, 90.0);
    assert_eq!(doc.items[0].pricing_rules, vec!["PRLE-0001"]);

    doc.ignore_pricing_rule = true;
    env.engine.set_pricing_rules(&mut doc).unwrap();
    let line = &doc.items[0];
    assert_eq!(line.discount_percentage, 0.0);
    assert_eq!(line.discount_amount, 0.0);
    assert_eq!(line.rate, 100.0);
    assert!(line.pricing_rules.is_empty());
}

#[test]
fn test_remove_pricing_rule_for_item() {
    let env = create_test_env();
    env.add_rule(item_rule("PRLE-0001", "_Test Item", 10.0));
    env.add_rule(free_item_rule("PRLE-0002", "_Test Item 2"));

    let names = vec!["PRLE-0001".to_string(), "PRLE-0002".to_string(), "PRLE-9999".to_string()];
    let details = env
        .engine
        .remove_pricing_rule_for_item(&names, "_Test Item", Some(100.0))
        .unwrap();
    assert!(details.pricing_rule_removed);
    assert!(details.pricing_rules.is_empty());
    assert_eq!(details.discount_percentage, 0.0);
    assert_eq!(details.rate, Some(100.0));
    assert_eq!(details.remove_free_item.as_deref(), Some("_Test Item"));
}

#[test]
fn test_suggestions_collected_in_report() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        title: "Bulk Deal".to_string(),
        min_qty: 10.0,
        threshold_percentage: 20.0,
        ..item_rule("PRLE-0001", "_Test Item", 10.0)
    });

    let mut doc = sales_order(&[("_Test Item", 9.0, 100.0)]);
    let report = env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(report.suggestions.len(), 1);
    assert!(report.suggestions[0].contains("Bulk Deal"));
    assert_eq!(doc.items[0].rate, 100.0);
}

// ========================================================================
// Mixed conditions, cumulative and cross-item rules
// ========================================================================

#[test]
fn test_mixed_conditions_aggregate_group_lines() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        apply_on: ApplyOnScope::ItemGroup(vec![ScopeEntry::new("Laptops")]),
        mixed_conditions: true,
        min_qty: 10.0,
        ..item_rule("PRLE-0001", "_Test Laptop 1", 10.0)
    });

    let mut doc = sales_order(&[("_Test Laptop 1", 6.0, 100.0), ("_Test Laptop 2", 5.0, 100.0)]);
    env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(doc.items[0].rate, 90.0);
    assert_eq!(doc.items[1].rate, 90.0);

    let mut doc = sales_order(&[("_Test Laptop 1", 6.0, 100.0)]);
    env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(doc.items[0].rate, 100.0);
    assert!(doc.items[0].pricing_rules.is_empty());
}

#[test]
fn test_mixed_conditions_details_name_scope() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        apply_on: ApplyOnScope::ItemGroup(vec![ScopeEntry::new("Laptops")]),
        mixed_conditions: true,
        min_qty: 10.0,
        ..item_rule("PRLE-0001", "_Test Laptop 1", 10.0)
    });

    let doc = sales_order(&[("_Test Laptop 1", 6.0, 100.0), ("_Test Laptop 2", 5.0, 100.0)]);
    let details = env
        .engine
        .get_pricing_rule_for_item(&sales_args("_Test Laptop 1", 6.0, 100.0), Some(&doc))
        .unwrap();
    assert_eq!(details.apply_rule_on, Some(ApplyOnKind::ItemGroup));
    assert_eq!(details.apply_rule_on_other_items, vec!["Laptops"]);
}

#[test]
fn test_mixed_conditions_with_other_item_count_own_scope() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        apply_on: ApplyOnScope::ItemGroup(vec![ScopeEntry::new("Laptops")]),
        mixed_conditions: true,
        min_qty: 10.0,
        apply_rule_on_other: Some(ApplyOnKind::ItemCode),
        other_item_code: Some("_Test Item".to_string()),
        ..item_rule("PRLE-0001", "_Test Laptop 1", 10.0)
    });

    let doc = sales_order(&[
        ("_Test Laptop 1", 6.0, 100.0),
        ("_Test Laptop 2", 5.0, 100.0),
        ("_Test Item", 1.0, 100.0),
    ]);
    let details = env
        .engine
        .get_pricing_rule_for_item(&sales_args("_Test Item", 1.0, 100.0), Some(&doc))
        .unwrap();
    assert_eq!(details.discount_percentage, 10.0);
    assert_eq!(details.pricing_rules, vec!["PRLE-0001"]);

    let doc = sales_order(&[("_Test Laptop 1", 6.0, 100.0), ("_Test Item", 20.0, 100.0)]);
    let details = env
        .engine
        .get_pricing_rule_for_item(&sales_args("_Test Item", 20.0, 100.0), Some(&doc))
        .unwrap();
    assert_eq!(details.discount_percentage, 0.0);
}

#[test]
fn test_cumulative_rule_counts_submitted_history() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        is_cumulative: true,
        min_qty: 10.0,
        valid_from: Some(date(2024, 1, 1)),
        valid_upto: Some(date(2024, 12, 31)),
        ..item_rule("PRLE-0001", "_Test Item", 5.0)
    });

    let mut posted = sales_order(&[("_Test Item", 8.0, 100.0)]);
    posted.name = "SO-0000".to_string();
    posted.docstatus = DocStatus::Submitted;
    posted.transaction_date = Some(date(2024, 3, 1));
    posted.items[0].amount = 800.0;
    env.history.record(posted);

    let details = env
        .engine
        .get_pricing_rule_for_item(&sales_args("_Test Item", 2.0, 100.0), None)
        .unwrap();
    assert_eq!(details.discount_percentage, 5.0);

    let details = env
        .engine
        .get_pricing_rule_for_item(&sales_args("_Test Item", 1.0, 100.0), None)
        .unwrap();
    assert_eq!(details.discount_percentage, 0.0);
}

#[test]
fn test_cumulative_rule_ignores_draft_history() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        is_cumulative: true,
        min_qty: 10.0,
        valid_from: Some(date(2024, 1, 1)),
        valid_upto: Some(date(2024, 12, 31)),
        ..item_rule("PRLE-0001", "_Test Item", 5.0)
    });
    env.history.record(sales_order(&[("_Test Item", 8.0, 100.0)]));

    let details = env
        .engine
        .get_pricing_rule_for_item(&sales_args("_Test Item", 3.0, 100.0), None)
        .unwrap();
    assert_eq!(details.discount_percentage, 0.0);
}

#[test]
fn test_rule_on_other_item() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        min_qty: 5.0,
        apply_rule_on_other: Some(ApplyOnKind::ItemCode),
        other_item_code: Some("_Test Item 2".to_string()),
        ..item_rule("PRLE-0001", "_Test Item", 10.0)
    });

    let mut doc = sales_order(&[("_Test Item", 5.0, 100.0), ("_Test Item 2", 1.0, 200.0)]);
    env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(doc.items[0].rate, 100.0);
    assert!(doc.items[0].pricing_rules.is_empty());
    assert_eq!(doc.items[1].rate, 180.0);
    assert_eq!(doc.items[1].pricing_rules, vec!["PRLE-0001"]);

    let mut doc = sales_order(&[("_Test Item", 4.0, 100.0), ("_Test Item 2", 1.0, 200.0)]);
    env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(doc.items[1].rate, 200.0);
}

// ========================================================================
// Transaction rules
// ========================================================================

#[test]
fn test_transaction_discount_percentage() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        discount_percentage: 10.0,
        ..transaction_rule("PRLE-0001")
    });

    let mut doc = sales_order(&[("_Test Item", 5.0, 100.0)]);
    let report = env.engine.set_pricing_rules(&mut doc).unwrap();
    assert!(report.notices.is_empty());
    assert_eq!(doc.total, 500.0);
    assert_eq!(doc.additional_discount_percentage, 10.0);
    assert_eq!(doc.discount_amount, 50.0);
    assert_eq!(doc.net_total, 450.0);
    assert_eq!(doc.grand_total, 450.0);
}

#[test]
fn test_transaction_rule_below_min_amount_skipped() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        discount_percentage: 10.0,
        min_amt: 1000.0,
        ..transaction_rule("PRLE-0001")
    });

    let mut doc = sales_order(&[("_Test Item", 5.0, 100.0)]);
    env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(doc.additional_discount_percentage, 0.0);
    assert_eq!(doc.net_total, 500.0);
}

#[test]
fn test_manual_discount_kept_when_validated() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        discount_percentage: 10.0,
        validate_applied_rule: true,
        ..transaction_rule("PRLE-0001")
    });

    let mut doc = sales_order(&[("_Test Item", 5.0, 100.0)]);
    doc.additional_discount_percentage = 5.0;
    let report = env.engine.set_pricing_rules(&mut doc).unwrap();
    assert_eq!(
        report.notices,
        vec!["User has not applied rule on the invoice SO-0001".to_string()]
    );
    assert_eq!(doc.additional_discount_percentage, 5.0);
    assert_eq!(doc.net_total, 475.0);
}

#[test]
fn test_apply_pricing_rule_on_transaction_directly() {
    let env = create_test_env();
    env.add_rule(PricingRule {
        rate_or_discount: RateOrDiscount::DiscountAmount,
        discount_amount: 30.0,
        ..transaction_rule("PRLE-0001")
    });

    let mut doc = sales_order(&[("_Test Item", 5.0, 100.0)]);
    doc.items[0].rate = 100.0;
    doc.items[0].amount = 500.0;
    let notices = env.engine.apply_pricing_rule_on_transaction(&mut doc).unwrap();
    assert!(notices.is_empty());
    assert_eq!(doc.discount_amount, 30.0);
    assert_eq!(doc.net_total, 470.0);
}

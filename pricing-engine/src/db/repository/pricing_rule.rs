//! Pricing Rule Repository

use super::{RepoError, RepoResult};
use parking_lot::RwLock;
use shared::models::{ApplyOnKind, PricingRule, TransactionDirection};
use std::collections::HashMap;
use std::sync::Arc;

/// Naming series prefix for rules created without a name
const NAME_PREFIX: &str = "PRLE-";

/// Read access to configured pricing rules
///
/// Returned rules are snapshots; resolution never mutates them.
pub trait PricingRuleStore: Send + Sync {
    /// Whether any enabled rule exists for the direction (fast path)
    fn has_enabled_rules(&self, direction: TransactionDirection) -> RepoResult<bool>;

    /// Enabled rules scoped by `kind`, or triggered through `other_<kind>`
    fn find_by_scope(&self, kind: ApplyOnKind) -> RepoResult<Vec<Arc<PricingRule>>>;

    /// Enabled rules applied on the whole transaction
    fn find_transaction_rules(&self) -> RepoResult<Vec<Arc<PricingRule>>>;

    /// Rule by name, enabled or not
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Arc<PricingRule>>>;
}

/// In-memory pricing rule store
#[derive(Clone, Default)]
pub struct PricingRuleRepository {
    rules: Arc<RwLock<HashMap<String, Arc<PricingRule>>>>,
    series: Arc<RwLock<u32>>,
}

impl std::fmt::Debug for PricingRuleRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingRuleRepository")
            .field("rules", &self.rules.read().len())
            .finish()
    }
}

impl PricingRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rules, enabled or not, sorted by name
    pub fn find_all(&self) -> Vec<Arc<PricingRule>> {
        let mut rules: Vec<_> = self.rules.read().values().cloned().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    fn next_name(&self) -> String {
        let rules = self.rules.read();
        let mut series = self.series.write();
        loop {
            *series += 1;
            let name = format!("{}{:04}", NAME_PREFIX, *series);
            if !rules.contains_key(&name) {
                return name;
            }
        }
    }

    /// Create a new pricing rule
    ///
    /// Rules without a name get the next `PRLE-####` name. The rule is
    /// validated before it is stored.
    pub fn create(&self, mut rule: PricingRule) -> RepoResult<Arc<PricingRule>> {
        if rule.name.trim().is_empty() {
            rule.name = self.next_name();
        }
        if rule.title.trim().is_empty() {
            rule.title = rule.name.clone();
        }
        rule.validate()?;

        let mut rules = self.rules.write();
        if rules.contains_key(&rule.name) {
            return Err(RepoError::Duplicate(format!(
                "Pricing rule '{}' already exists",
                rule.name
            )));
        }

        let rule = Arc::new(rule);
        rules.insert(rule.name.clone(), rule.clone());
        tracing::debug!(rule = %rule.name, apply_on = ?rule.apply_on.kind(), "Pricing rule created");
        Ok(rule)
    }

    /// Replace an existing pricing rule
    pub fn update(&self, name: &str, rule: PricingRule) -> RepoResult<Arc<PricingRule>> {
        rule.validate()?;

        let mut rules = self.rules.write();
        if !rules.contains_key(name) {
            return Err(RepoError::NotFound(format!("Pricing rule {} not found", name)));
        }

        // Check duplicate name if changing
        if rule.name != name && rules.contains_key(&rule.name) {
            return Err(RepoError::Duplicate(format!(
                "Pricing rule '{}' already exists",
                rule.name
            )));
        }

        rules.remove(name);
        let rule = Arc::new(rule);
        rules.insert(rule.name.clone(), rule.clone());
        Ok(rule)
    }

    /// Disable a rule without deleting it
    pub fn disable(&self, name: &str) -> RepoResult<Arc<PricingRule>> {
        let mut rules = self.rules.write();
        let existing = rules
            .get(name)
            .ok_or_else(|| RepoError::NotFound(format!("Pricing rule {} not found", name)))?;

        let mut rule = PricingRule::clone(existing);
        rule.disable = true;
        let rule = Arc::new(rule);
        rules.insert(name.to_string(), rule.clone());
        Ok(rule)
    }

    /// Hard delete a pricing rule
    pub fn delete(&self, name: &str) -> RepoResult<bool> {
        Ok(self.rules.write().remove(name).is_some())
    }

    fn enabled_where(&self, pred: impl Fn(&PricingRule) -> bool) -> Vec<Arc<PricingRule>> {
        let mut rules: Vec<_> = self
            .rules
            .read()
            .values()
            .filter(|r| !r.disable && pred(r))
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }
}

impl PricingRuleStore for PricingRuleRepository {
    fn has_enabled_rules(&self, direction: TransactionDirection) -> RepoResult<bool> {
        Ok(self
            .rules
            .read()
            .values()
            .any(|r| !r.disable && r.direction == direction))
    }

    fn find_by_scope(&self, kind: ApplyOnKind) -> RepoResult<Vec<Arc<PricingRule>>> {
        Ok(self.enabled_where(|r| {
            r.apply_on.kind() == kind
                || (r.apply_rule_on_other == Some(kind) && r.other_value(kind).is_some())
        }))
    }

    fn find_transaction_rules(&self) -> RepoResult<Vec<Arc<PricingRule>>> {
        Ok(self.enabled_where(|r| r.apply_on.kind() == ApplyOnKind::Transaction))
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Arc<PricingRule>>> {
        Ok(self.rules.read().get(name).cloned())
    }
}

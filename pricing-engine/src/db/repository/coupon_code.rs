//! Coupon Code Repository

use super::{RepoError, RepoResult};
use parking_lot::RwLock;
use shared::models::CouponCode;
use std::collections::HashMap;
use std::sync::Arc;

/// Coupon code persistence used by the coupon ledger
pub trait CouponStore: Send + Sync {
    fn find_by_name(&self, name: &str) -> RepoResult<Option<CouponCode>>;

    /// Coupon linked to a pricing rule
    fn find_by_pricing_rule(&self, pricing_rule: &str) -> RepoResult<Option<CouponCode>>;

    /// Persist an existing coupon (usage count changes)
    fn save(&self, coupon: CouponCode) -> RepoResult<()>;
}

/// In-memory coupon store
#[derive(Debug, Clone, Default)]
pub struct CouponCodeRepository {
    coupons: Arc<RwLock<HashMap<String, CouponCode>>>,
}

impl CouponCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new coupon code
    pub fn create(&self, mut coupon: CouponCode) -> RepoResult<CouponCode> {
        if coupon.name.trim().is_empty() {
            coupon.name = coupon.coupon_code.clone();
        }
        if coupon.name.trim().is_empty() {
            return Err(RepoError::Validation("Coupon name is required".to_string()));
        }
        if coupon.pricing_rule.trim().is_empty() {
            return Err(RepoError::Validation(format!(
                "Coupon {} must be linked to a pricing rule",
                coupon.name
            )));
        }

        let mut coupons = self.coupons.write();
        if coupons.contains_key(&coupon.name) {
            return Err(RepoError::Duplicate(format!(
                "Coupon code '{}' already exists",
                coupon.name
            )));
        }
        coupons.insert(coupon.name.clone(), coupon.clone());
        Ok(coupon)
    }
}

impl CouponStore for CouponCodeRepository {
    fn find_by_name(&self, name: &str) -> RepoResult<Option<CouponCode>> {
        Ok(self.coupons.read().get(name).cloned())
    }

    fn find_by_pricing_rule(&self, pricing_rule: &str) -> RepoResult<Option<CouponCode>> {
        let coupons = self.coupons.read();
        let mut linked: Vec<&CouponCode> = coupons
            .values()
            .filter(|c| c.pricing_rule == pricing_rule)
            .collect();
        linked.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(linked.first().map(|c| (*c).clone()))
    }

    fn save(&self, coupon: CouponCode) -> RepoResult<()> {
        let mut coupons = self.coupons.write();
        if !coupons.contains_key(&coupon.name) {
            return Err(RepoError::NotFound(format!(
                "Coupon code {} not found",
                coupon.name
            )));
        }
        coupons.insert(coupon.name.clone(), coupon);
        Ok(())
    }
}

//! Coupon usage ledger
//!
//! Validity checks and usage counting for coupon codes. Usage changes go
//! through [`CouponLedger::record_use`] / [`CouponLedger::record_cancel`];
//! nothing else mutates a coupon.

use crate::db::repository::{CouponStore, RepoError};
use chrono::NaiveDate;
use shared::error::{AppError, ErrorCode};
use shared::models::CouponCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CouponError {
    #[error("Coupon code {0} not found")]
    NotFound(String),

    #[error("Sorry, this coupon code's validity has not started")]
    NotStarted,

    #[error("Sorry, this coupon code's validity has expired")]
    Expired,

    #[error("Sorry, this coupon code is no longer valid")]
    NoLongerValid,

    #[error("{coupon_code} Coupon used are {used}. Allowed quantity is exhausted")]
    Exhausted { coupon_code: String, used: u32 },

    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl CouponError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::CouponNotFound,
            Self::NotStarted => ErrorCode::CouponNotStarted,
            Self::Expired => ErrorCode::CouponExpired,
            Self::NoLongerValid | Self::Exhausted { .. } => ErrorCode::CouponExhausted,
            Self::Repository(_) => ErrorCode::StorageError,
        }
    }
}

impl From<CouponError> for AppError {
    fn from(err: CouponError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}

pub type CouponResult<T> = Result<T, CouponError>;

/// Coupon validation and usage counting
#[derive(Clone)]
pub struct CouponLedger {
    store: Arc<dyn CouponStore>,
}

impl std::fmt::Debug for CouponLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponLedger")
            .field("store", &"<CouponStore>")
            .finish()
    }
}

impl CouponLedger {
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        Self { store }
    }

    fn load(&self, name: &str) -> CouponResult<CouponCode> {
        self.store
            .find_by_name(name)?
            .ok_or_else(|| CouponError::NotFound(name.to_string()))
    }

    /// Coupon linked to a pricing rule, if any
    pub fn coupon_for_rule(&self, pricing_rule: &str) -> CouponResult<Option<CouponCode>> {
        Ok(self.store.find_by_pricing_rule(pricing_rule)?)
    }

    pub fn find(&self, name: &str) -> CouponResult<Option<CouponCode>> {
        Ok(self.store.find_by_name(name)?)
    }

    /// Check that the coupon can be redeemed on `on`
    pub fn validate_coupon_code(&self, name: &str, on: NaiveDate) -> CouponResult<CouponCode> {
        let coupon = self.load(name)?;

        if coupon.valid_from.is_some_and(|from| from > on) {
            return Err(CouponError::NotStarted);
        }
        if coupon.valid_upto.is_some_and(|upto| upto < on) {
            return Err(CouponError::Expired);
        }
        if coupon.is_exhausted() {
            return Err(CouponError::NoLongerValid);
        }
        Ok(coupon)
    }

    /// Count one redemption (document submit)
    pub fn record_use(&self, name: &str) -> CouponResult<CouponCode> {
        let mut coupon = self.load(name)?;
        if coupon.is_exhausted() {
            return Err(CouponError::Exhausted {
                coupon_code: coupon.coupon_code,
                used: coupon.used,
            });
        }
        coupon.used += 1;
        self.store.save(coupon.clone())?;
        tracing::info!(coupon = %coupon.name, used = coupon.used, "Coupon usage recorded");
        Ok(coupon)
    }

    /// Undo one redemption (document cancel)
    pub fn record_cancel(&self, name: &str) -> CouponResult<CouponCode> {
        let mut coupon = self.load(name)?;
        if coupon.used > 0 {
            coupon.used -= 1;
            self.store.save(coupon.clone())?;
            tracing::info!(coupon = %coupon.name, used = coupon.used, "Coupon usage cancelled");
        }
        Ok(coupon)
    }
}

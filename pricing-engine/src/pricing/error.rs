//! Resolution errors

use crate::db::repository::RepoError;
use crate::services::{CouponError, HierarchyKind};
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error(
        "Multiple Price Rules exists with same criteria, please resolve conflict by assigning priority. Price Rules: {}",
        .rules.join(", ")
    )]
    MultiplePricingRuleConflict { rules: Vec<String> },

    #[error("Free item not set in the pricing rule {rule}")]
    FreeItemNotSet { rule: String },

    #[error("Invalid {kind} {name}")]
    InvalidGroup { kind: HierarchyKind, name: String },

    #[error("Item Group not mentioned in item master for item {item_code}")]
    ItemGroupMissing { item_code: String },

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Repository(#[from] RepoError),
}

pub type PricingResult<T> = Result<T, PricingError>;

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        let message = err.to_string();
        match err {
            PricingError::MultiplePricingRuleConflict { rules } => {
                AppError::with_message(ErrorCode::PricingRuleConflict, message)
                    .with_detail("rules", rules)
            }
            PricingError::FreeItemNotSet { rule } => {
                AppError::with_message(ErrorCode::FreeItemNotSet, message).with_detail("rule", rule)
            }
            PricingError::InvalidGroup { kind, name } => {
                AppError::with_message(ErrorCode::InvalidGroup, message)
                    .with_detail("kind", kind.label())
                    .with_detail("name", name)
            }
            PricingError::ItemGroupMissing { item_code } => {
                AppError::with_message(ErrorCode::RequiredField, message)
                    .with_detail("item_code", item_code)
            }
            PricingError::Coupon(e) => e.into(),
            PricingError::Repository(e) => e.into(),
        }
    }
}

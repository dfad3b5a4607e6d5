//! Repository Module
//!
//! In-memory stores for pricing rules and coupon codes, behind the traits
//! the engine consumes. Hosts with their own persistence implement the
//! traits directly.

pub mod coupon_code;
pub mod pricing_rule;

// Re-exports
pub use coupon_code::{CouponCodeRepository, CouponStore};
pub use pricing_rule::{PricingRuleRepository, PricingRuleStore};

use shared::error::{AppError, ErrorCode};
use shared::models::RuleValidationError;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Rule(#[from] RuleValidationError),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            RepoError::Storage(msg) => AppError::with_message(ErrorCode::StorageError, msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Rule(e) => AppError::with_message(e.code(), e.to_string()),
        }
    }
}

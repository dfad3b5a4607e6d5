//! Unified error system
//!
//! - [`ErrorCode`]: Standardized error codes
//! - [`AppError`]: Rich error type with codes, messages, and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Rule configuration errors
//! - 2xxx: Resolution errors
//! - 3xxx: Coupon errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::PricingRuleConflict)
//!     .with_detail("rules", vec!["PRLE-0001", "PRLE-0002"]);
//! assert_eq!(err.code.code(), 2001);
//! ```

mod codes;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};

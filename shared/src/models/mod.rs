//! Data models
//!
//! Master data (pricing rules, coupons, items) and the transaction
//! documents pricing operates on.

pub mod coupon_code;
pub mod item;
pub mod pricing_rule;
pub mod transaction;

// Re-exports
pub use coupon_code::*;
pub use item::*;
pub use pricing_rule::*;
pub use transaction::*;

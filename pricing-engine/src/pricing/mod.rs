//! Pricing Rule Resolution Module
//!
//! Resolves which pricing rules apply to a transaction line or document and
//! computes their effects: discounts, rate overrides, margins and free
//! lines. Resolution is synchronous and reads rules, catalog and history
//! through the traits in `db::repository` and `services`.

mod aggregator;
pub mod condition;
mod context;
mod engine;
mod error;
mod free_item;
mod item_calculator;
pub mod matcher;
mod order_calculator;
pub mod selector;
mod suggestion;

pub use aggregator::*;
pub use condition::{Condition, ConditionError, ConditionResult, evaluate_condition, filter_by_condition};
pub use context::*;
pub use engine::*;
pub use error::*;
pub use free_item::*;
pub use item_calculator::*;
pub use matcher::*;
pub use order_calculator::*;
pub use selector::*;
pub use suggestion::*;

#[cfg(test)]
mod tests;

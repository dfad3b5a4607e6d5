//! Pricing contracts: resolution input and output

pub mod applied_rule;
pub mod args;
pub mod effect;

pub use applied_rule::AppliedPricingRule;
pub use args::ResolutionArgs;
pub use effect::{FreeItemSpec, ItemPricingDetails, PriceEffect, ResolvedEffect};

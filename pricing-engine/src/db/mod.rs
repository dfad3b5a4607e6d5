//! Storage Module
//!
//! Rule and coupon stores consumed by the engine

pub mod repository;

pub use repository::{
    CouponCodeRepository, CouponStore, PricingRuleRepository, PricingRuleStore, RepoError,
    RepoResult,
};

//! Pricing Engine - pricing rule resolution for transaction documents
//!
//! # Overview
//!
//! Given a transaction line (or a whole document), finds the pricing rules
//! that apply, picks among them by priority and thresholds, and computes
//! their effects: rate overrides, discounts, margins and free lines.
//!
//! # Module layout
//!
//! ```text
//! pricing-engine/src/
//! ├── core/          # EngineConfig
//! ├── db/            # Rule and coupon stores
//! ├── services/      # Catalog, hierarchies, posting history, coupon ledger
//! ├── pricing/       # Matcher, selector, calculators, engine
//! └── utils/         # Logger
//! ```

pub mod core;
pub mod db;
pub mod pricing;
pub mod services;
pub mod utils;

// Re-export public types
pub use core::EngineConfig;
pub use db::{CouponCodeRepository, PricingRuleRepository};
pub use pricing::{PricingEngine, PricingError, PricingReport, PricingResult};
pub use services::{CatalogService, CouponLedger, InMemoryPostingHistory};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_from_config};

//! Services - catalog and ledger collaborators of the pricing engine
//!
//! # Services
//!
//! - [`CatalogService`] - items, prices and hierarchies (in-memory cache)
//! - [`HierarchyClosureCache`] - per-request memo of group closures
//! - [`InMemoryPostingHistory`] - submitted postings for cumulative rules
//! - [`CouponLedger`] - coupon validation and usage counting

pub mod catalog_service;
pub mod coupon_ledger;
pub mod hierarchy;
pub mod history;

pub use catalog_service::{CatalogLookup, CatalogService, HierarchyKind};
pub use coupon_ledger::{CouponError, CouponLedger, CouponResult};
pub use hierarchy::{GroupTree, HierarchyClosureCache};
pub use history::{DateField, HistoryQuery, InMemoryPostingHistory, PostingHistory, PostingRow};

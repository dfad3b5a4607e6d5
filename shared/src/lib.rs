//! Shared types for the pricing engine
//!
//! Data contracts used by the engine and its callers: master data models,
//! transaction documents, resolution input/output and the error system.

pub mod error;
pub mod models;
pub mod pricing;

// Re-exports
pub use serde::{Deserialize, Serialize};
